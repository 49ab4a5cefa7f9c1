//! Repository layer for database access.

pub mod record;
pub mod status_event;

pub use record::*;
pub use status_event::*;
