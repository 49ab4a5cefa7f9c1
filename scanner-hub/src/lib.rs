//! scanner-hub library crate.
//!
//! Supervises persistent TCP links to industrial scanners, decodes their
//! line-oriented telemetry and stores records and connection history in SQLite.

pub mod api;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod supervisor;

pub use error::{Error, Result};
