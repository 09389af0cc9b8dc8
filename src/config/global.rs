//! Scheduler configuration.
//!
//! Loaded from .threadloom.yml or ~/.config/threadloom/threadloom.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::{ProgressLimits, ScoringConfig};

/// Top-level configuration for threadloom.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Urgency scoring weights.
    pub scoring: ScoringConfig,

    /// Clamp ranges for step outcomes.
    pub progress: ProgressLimits,

    /// Shortlist, oracle and synthesis settings.
    pub selection: SelectionConfig,

    /// Persistence settings.
    pub storage: StorageConfig,
}

impl SchedulerConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .threadloom.yml in current directory
    /// 3. ~/.config/threadloom/threadloom.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(crate::config::PROJECT_CONFIG_FILE);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from {}", project_config.display());
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", project_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("threadloom").join("threadloom.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        for (name, value) in [
            ("scoring.importance-weight", s.importance_weight),
            ("scoring.staleness-per-step", s.staleness_per_step),
            ("scoring.staleness-cap", s.staleness_cap),
            ("scoring.fresh-bonus", s.fresh_bonus),
            ("scoring.remaining-weight", s.remaining_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                eyre::bail!("{} must be a finite value >= 0", name);
            }
        }

        let p = &self.progress;
        if !(1..=100).contains(&p.advance_min) || !(1..=100).contains(&p.advance_max) {
            eyre::bail!("progress.advance-min and advance-max must be within 1..=100");
        }
        if p.advance_min > p.advance_max {
            eyre::bail!("progress.advance-min must be <= advance-max");
        }
        if !(1..=100).contains(&p.backslide_min) || !(1..=100).contains(&p.backslide_max) {
            eyre::bail!("progress.backslide-min and backslide-max must be within 1..=100");
        }
        if p.backslide_min > p.backslide_max {
            eyre::bail!("progress.backslide-min must be <= backslide-max");
        }

        let sel = &self.selection;
        if sel.shortlist_size == 0 {
            eyre::bail!("selection.shortlist-size must be > 0");
        }
        if sel.oracle_timeout_ms == 0 {
            eyre::bail!("selection.oracle-timeout-ms must be > 0");
        }
        if !(1..=10).contains(&sel.synthesized_importance) {
            eyre::bail!("selection.synthesized-importance must be within 1..=10");
        }
        Ok(())
    }
}

/// Shortlist, oracle and synthesis settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Default number of candidates handed to the oracle.
    #[serde(rename = "shortlist-size")]
    pub shortlist_size: usize,

    /// How long to wait on the oracle before falling back.
    #[serde(rename = "oracle-timeout-ms")]
    pub oracle_timeout_ms: u64,

    /// Importance given to threads synthesized when nothing is eligible.
    #[serde(rename = "synthesized-importance")]
    pub synthesized_importance: u8,

    /// Description given to synthesized threads.
    #[serde(rename = "synthesized-description")]
    pub synthesized_description: String,

    /// Payoff summary given to synthesized threads.
    #[serde(rename = "synthesized-payoff")]
    pub synthesized_payoff: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            shortlist_size: crate::config::DEFAULT_SHORTLIST_SIZE,
            oracle_timeout_ms: 30_000,
            synthesized_importance: 5,
            synthesized_description: "An unforeseen complication demands attention".to_string(),
            synthesized_payoff: "Resolve the complication or fold it into an existing arc".to_string(),
        }
    }
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Nothing persisted
    #[default]
    Memory,
    /// Append-only JSON lines file
    Jsonl,
    /// SQLite table
    Sqlite,
}

/// Storage settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind.
    pub backend: StorageBackend,

    /// Root directory for persisted ledgers.
    pub dir: PathBuf,

    /// Keep one ledger per project directory under `dir`.
    #[serde(rename = "per-project")]
    pub per_project: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("threadloom"),
            per_project: true,
        }
    }
}
