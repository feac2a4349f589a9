//! Client configuration.
//!
//! Values come from code, from a deserialized document (`serde`), or from
//! `COURIER_*` environment variables.

use std::env;
use std::ops::RangeInclusive;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable names.
pub mod vars {
    pub const BASE_URL: &str = "COURIER_BASE_URL";
    pub const MAX_ATTEMPTS: &str = "COURIER_MAX_ATTEMPTS";
    pub const ACCEPTABLE_STATUS: &str = "COURIER_ACCEPTABLE_STATUS";
}

/// Inclusive range of statuses treated as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatusRange {
    pub min: u16,
    pub max: u16,
}

impl Default for StatusRange {
    fn default() -> Self {
        Self { min: 200, max: 299 }
    }
}

impl From<StatusRange> for RangeInclusive<u16> {
    fn from(range: StatusRange) -> Self {
        range.min..=range.max
    }
}

impl std::str::FromStr for StatusRange {
    type Err = String;

    /// Parses `min-max`, e.g. `200-299`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| format!("expected `min-max`, got {s:?}"))?;
        let min: u16 = min.trim().parse().map_err(|e| format!("bad minimum: {e}"))?;
        let max: u16 = max.trim().parse().map_err(|e| format!("bad maximum: {e}"))?;
        if min > max {
            return Err(format!("minimum {min} exceeds maximum {max}"));
        }
        Ok(Self { min, max })
    }
}

fn default_max_attempts() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub acceptable_status: StatusRange,
    /// Total attempts per call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            acceptable_status: StatusRange::default(),
            max_attempts: default_max_attempts(),
        }
    }

    /// Read configuration from `COURIER_*` variables. Only the base URL is
    /// required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(vars::BASE_URL).ok_or_else(|| ConfigError::MissingVar {
            var: vars::BASE_URL.to_string(),
        })?;
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup(vars::MAX_ATTEMPTS) {
            config.max_attempts = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                var: vars::MAX_ATTEMPTS.to_string(),
                message: format!("{e}"),
            })?;
        }
        if let Some(raw) = lookup(vars::ACCEPTABLE_STATUS) {
            config.acceptable_status = raw.parse().map_err(|message| ConfigError::InvalidValue {
                var: vars::ACCEPTABLE_STATUS.to_string(),
                message,
            })?;
        }
        Ok(config)
    }
}
