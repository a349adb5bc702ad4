//! Lifecycle services sitting between the API surface and the store.

pub mod episodes;
pub mod parts;

pub use episodes::EpisodeService;
pub use parts::{NewPart, PartService, PartUpdate};
