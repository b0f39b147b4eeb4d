//! Core configuration and utilities for the Tea Taster client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_DATA_SERVICE_URL, DEFAULT_LOCK_AFTER_MS, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
