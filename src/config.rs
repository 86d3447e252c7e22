//! Options accepted when constructing a duplex.
//!
//! Options are plain serde data so they can be embedded in a host's TOML
//! configuration. Keys are camelCase; unknown keys are retained in
//! [`DuplexOptions::extra`] and exposed through `Duplex::options()`.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default buffer threshold, counted in chunks.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16;

/// Errors raised while loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read options file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid options: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Construction options for [`crate::Duplex`] and [`crate::DuplexCore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DuplexOptions {
    /// Re-raise sink/source error events on the duplex itself.
    pub bubble_errors: bool,
    /// Buffered chunks at which reads stop pulling and push sources are paused.
    ///
    /// `validate` rejects 0. Options built in code skip validation, so a
    /// duplex constructed with 0 treats it as 1 and logs a warning.
    pub high_water_mark: usize,
    /// Unrecognised keys, retained as parsed. Nothing in this crate reads them.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for DuplexOptions {
    fn default() -> Self {
        Self {
            bubble_errors: true,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            extra: toml::Table::new(),
        }
    }
}

impl DuplexOptions {
    pub fn bubble_errors(mut self, enabled: bool) -> Self {
        self.bubble_errors = enabled;
        self
    }

    pub fn high_water_mark(mut self, chunks: usize) -> Self {
        self.high_water_mark = chunks;
        self
    }

    /// Parse and validate options from a TOML document.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let options: Self = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Read, parse and validate options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// High water mark used at construction, never below 1.
    pub(crate) fn effective_high_water_mark(&self) -> usize {
        if self.high_water_mark == 0 {
            warn!(
                target: "duplexer::config",
                "highWaterMark of 0 is invalid, using 1"
            );
            return 1;
        }
        self.high_water_mark
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.high_water_mark == 0 {
            return Err(ConfigError::Invalid(
                "highWaterMark must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
