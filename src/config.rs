//! Model Configuration
//!
//! Tuning for the editing session and generated text, read from a
//! `flowdoc.toml` file.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`FLOWDOC_DEBOUNCE_MS`, `FLOWDOC_INDENT`)
//! 2. Config file
//! 3. Defaults (300 ms quiescence window, 2-space indent)

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FlowdocError, Result};

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_INDENT: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Quiescence window before a text reparse
    pub debounce_ms: u64,
    /// Indent unit for generated text when the document has none yet
    pub indent: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            indent: DEFAULT_INDENT,
        }
    }
}

impl ModelConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| FlowdocError::Config {
            reason: format!("Failed to parse config: {}", e),
        })?;
        config.validate()
    }

    /// Load from a file; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| FlowdocError::Config {
            reason: format!("Failed to read config file: {}", e),
        })?;
        Self::from_toml(&content)
    }

    /// Apply environment overrides
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(
            std::env::var("FLOWDOC_DEBOUNCE_MS").ok().as_deref(),
            std::env::var("FLOWDOC_INDENT").ok().as_deref(),
        )
    }

    fn with_overrides(mut self, debounce_ms: Option<&str>, indent: Option<&str>) -> Result<Self> {
        if let Some(raw) = debounce_ms {
            self.debounce_ms = raw.trim().parse().map_err(|_| FlowdocError::Config {
                reason: format!("FLOWDOC_DEBOUNCE_MS is not a number: '{}'", raw),
            })?;
        }
        if let Some(raw) = indent {
            self.indent = raw.trim().parse().map_err(|_| FlowdocError::Config {
                reason: format!("FLOWDOC_INDENT is not a number: '{}'", raw),
            })?;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.indent == 0 || self.indent > 8 {
            return Err(FlowdocError::Config {
                reason: format!("indent must be between 1 and 8, got {}", self.indent),
            });
        }
        Ok(self)
    }
}
