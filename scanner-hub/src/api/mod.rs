//! Operational HTTP surface.
//!
//! Status queries, forced reconnects and recent history for each scanner.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, ApiServerConfig, AppState};
