//! Configuration system for threadloom.
//!
//! A single YAML document with four sections: scoring weights, progress clamp
//! ranges, selection settings, and storage.

use eyre::Result;
use std::path::PathBuf;

pub use self::global::{SchedulerConfig, SelectionConfig, StorageBackend, StorageConfig};

mod global;

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = ".threadloom.yml";

/// Default number of candidates in a shortlist.
pub const DEFAULT_SHORTLIST_SIZE: usize = 3;

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. .threadloom.yml in current directory (project config)
/// 3. ~/.config/threadloom/threadloom.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<SchedulerConfig> {
    SchedulerConfig::load(explicit_path)
}
