//! Skycast Core Library
//!
//! Shared utilities for the forecaster and daemon services:
//! - Config file discovery and loading
//! - File system utilities
//! - Configured locations
//! - Fitted scaler transforms shared by the forecast models and the cluster assignment

mod config;
pub mod fs;
mod locations;
pub mod scaler;

pub use config::{load_config, ConfigSource};
pub use fs::{create_dir_all, dated_dir, ensure_dir_exists};
pub use locations::{default_location_names, default_locations, Location};
pub use scaler::{Scaler, ScalerError, Transform};

/// Directory name under the XDG config home and /etc
pub const APP_NAME: &str = "skycast";

/// Default forecaster port
pub const DEFAULT_FORECASTER_PORT: u16 = 9800;

/// Default daemon fetch interval (1 hour)
pub const DEFAULT_FETCH_INTERVAL: u64 = 3600;
