//! Engine configuration, validated once at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::latin::{Construction, MAX_SAMPLED_SIZE, OrderMatrix, SquareError};

/// Square dimension used by every deployment so far.
pub const DEFAULT_SQUARE_SIZE: usize = 9;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Square(#[from] SquareError),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// How long resolved orders stay in the in-process read cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Every read goes to the durable store.
    Disabled,
    /// Entries never expire; safe because stored orders are write-once.
    Unbounded,
    /// Entries are dropped `secs` seconds after they were cached.
    Ttl { secs: u64 },
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Ttl {
            secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CachePolicy {
    /// `0` disables caching.
    pub fn from_ttl_secs(secs: u64) -> Self {
        if secs == 0 {
            Self::Disabled
        } else {
            Self::Ttl { secs }
        }
    }

    /// `Ttl { secs: 0 }` would cache entries that can never be served, so it
    /// becomes `Disabled`.
    pub fn normalized(self) -> Self {
        match self {
            Self::Ttl { secs: 0 } => Self::Disabled,
            other => other,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::Ttl { secs } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub square_size: usize,
    pub construction: Construction,
    pub cache: CachePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            square_size: DEFAULT_SQUARE_SIZE,
            construction: Construction::default(),
            cache: CachePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(s)?;
        config.cache = config.cache.normalized();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.square_size == 0 {
            return Err(SquareError::InvalidSize { n: 0 }.into());
        }
        if self.construction == Construction::Sampled && self.square_size > MAX_SAMPLED_SIZE {
            return Err(SquareError::TooLarge {
                n: self.square_size,
                max: MAX_SAMPLED_SIZE,
            }
            .into());
        }
        Ok(())
    }

    /// Build the order matrix this configuration describes.
    pub fn matrix(&self) -> Result<OrderMatrix, ConfigError> {
        self.validate()?;
        Ok(OrderMatrix::build(self.construction, self.square_size)?)
    }
}
