//! partwise server entry point.
//!
//! Parse, dispatch, report, exit. All setup lives in the cli module.

use partwise::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
