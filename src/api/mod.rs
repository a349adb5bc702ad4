//! HTTP surface: router, request/response shapes, error mapping.

pub mod errors;
pub mod request;
pub mod response;
pub mod server;

pub use errors::{ApiError, ApiResult};
pub use server::{router, serve, AppState};
