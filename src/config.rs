//! Engine configuration.
//!
//! Tunables of the suggestion and statistics passes. Every field has a
//! default, so a configuration file only lists what it changes:
//!
//! ```toml
//! telechat_lead_days = 3
//! unreviewable_streams = ["ise", "irtf"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, ReviewResult};

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days between a review deadline and the agenda date it prepares.
    pub telechat_lead_days: i64,
    /// Number of upcoming agenda dates scanned for suggestions.
    pub upcoming_agenda_dates: usize,
    /// Look-back window of the workload shown next to suggestions.
    pub stats_window_days: i64,
    /// Requester recorded on suggested requests and system events.
    pub system_person: String,
    /// Streams whose documents are never suggested for review.
    pub unreviewable_streams: Vec<String>,
    /// How long ended unavailability periods stay listed.
    pub unavailable_list_past_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            telechat_lead_days: 2,
            upcoming_agenda_dates: 4,
            stats_window_days: 365,
            system_person: "(System)".to_string(),
            unreviewable_streams: vec!["ise".to_string()],
            unavailable_list_past_days: 14,
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Config`] if the TOML is invalid.
    pub fn from_toml_str(content: &str) -> ReviewResult<Self> {
        toml::from_str(content).map_err(|e| ReviewError::Config(e.to_string()))
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> ReviewResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReviewError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Config`] if serialization fails.
    pub fn to_toml(&self) -> ReviewResult<String> {
        toml::to_string_pretty(self).map_err(|e| ReviewError::Config(e.to_string()))
    }
}
