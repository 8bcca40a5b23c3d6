//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub next_up: NextUpConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.next_up.max_limit == 0 {
            warnings.push("next_up.max_limit is 0; every next-up page will be empty".into());
        }
        if self.next_up.default_limit == 0 {
            warnings.push("next_up.default_limit is 0".into());
        }
        if self.next_up.default_limit > self.next_up.max_limit {
            warnings.push(format!(
                "next_up.default_limit ({}) exceeds next_up.max_limit ({}); it will be clamped",
                self.next_up.default_limit, self.next_up.max_limit
            ));
        }
        if let Some(days) = self.next_up.max_age_days {
            if days < 0 {
                warnings.push(format!("next_up.max_age_days is negative ({days})"));
            } else if self.next_up.date_cutoff(Utc::now()).is_none() {
                warnings.push(format!(
                    "next_up.max_age_days ({days}) is out of range; no cutoff will apply"
                ));
            }
        }
        if self.database.path.as_os_str().is_empty() {
            warnings.push("database.path is empty".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Library presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Interleave season-0 specials between regular episodes according to
    /// their airs-before / airs-after markers.
    pub display_specials_within_seasons: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            display_specials_within_seasons: true,
        }
    }
}

/// Next-up listing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NextUpConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Series last watched longer ago than this are not surfaced.
    pub max_age_days: Option<i64>,
}

fn default_limit() -> usize {
    20
}
fn default_max_limit() -> usize {
    100
}

impl Default for NextUpConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_age_days: None,
        }
    }
}

impl NextUpConfig {
    /// Apply the configured default and ceiling to a requested page size.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }

    /// The oldest last-watched date still surfaced, measured back from
    /// `now`. Negative ages, and ages reaching past the representable date
    /// range, are ignored.
    pub fn date_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = self.max_age_days.filter(|days| *days >= 0)?;
        Duration::try_days(days).and_then(|age| now.checked_sub_signed(age))
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./marquee.db"),
        }
    }
}
