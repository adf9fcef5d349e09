//! drivelog - runtime logging and diagnostics for a vehicle-control platform
//!
//! Named channels with level control, rotated log files, rate-limited
//! emission, and a live log overlay.

pub mod config;
pub mod error;
pub mod logging;
pub mod overlay;

pub use error::{Error, Result};
