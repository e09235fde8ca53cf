use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{env_bool, env_u64, env_usize, env_value};

pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_ESCAPE_TIMEOUT_MS: u64 = 20;
pub const DEFAULT_DOUBLE_ESCAPE_MS: u64 = 1000;
pub const DEFAULT_ANIMATION_MS: u64 = 150;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub prompt: String,
    pub max_length: Option<usize>,
    pub min_length: usize,
    pub cancelable: bool,
    pub escape_timeout_ms: u64,
    pub double_escape_ms: u64,
    pub animation_ms: u64,
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_length: None,
            min_length: 0,
            cancelable: false,
            escape_timeout_ms: DEFAULT_ESCAPE_TIMEOUT_MS,
            double_escape_ms: DEFAULT_DOUBLE_ESCAPE_MS,
            animation_ms: DEFAULT_ANIMATION_MS,
            log_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            prompt: std::env::var("VEXLINE_PROMPT").unwrap_or(defaults.prompt),
            max_length: env_usize("VEXLINE_MAX_LENGTH"),
            min_length: env_usize("VEXLINE_MIN_LENGTH").unwrap_or(defaults.min_length),
            cancelable: env_bool("VEXLINE_CANCELABLE").unwrap_or(defaults.cancelable),
            escape_timeout_ms: env_u64("VEXLINE_ESCAPE_TIMEOUT_MS")
                .unwrap_or(defaults.escape_timeout_ms),
            double_escape_ms: env_u64("VEXLINE_DOUBLE_ESCAPE_MS")
                .unwrap_or(defaults.double_escape_ms),
            animation_ms: env_u64("VEXLINE_ANIMATION_MS").unwrap_or(defaults.animation_ms),
            log_path: env_value("VEXLINE_LOG_PATH").map(PathBuf::from),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_length {
            if max == 0 {
                bail!("VEXLINE_MAX_LENGTH must be greater than zero");
            }
            if self.min_length > max {
                bail!(
                    "VEXLINE_MIN_LENGTH ({}) exceeds VEXLINE_MAX_LENGTH ({max})",
                    self.min_length
                );
            }
        }

        if self.prompt.contains('\n') {
            bail!("VEXLINE_PROMPT must fit on a single line");
        }

        if self.escape_timeout_ms == 0 || self.escape_timeout_ms > 500 {
            bail!(
                "Invalid VEXLINE_ESCAPE_TIMEOUT_MS '{}': expected 1..=500",
                self.escape_timeout_ms
            );
        }

        if self.double_escape_ms <= self.escape_timeout_ms {
            bail!(
                "VEXLINE_DOUBLE_ESCAPE_MS ({}) must be longer than the escape timeout ({})",
                self.double_escape_ms,
                self.escape_timeout_ms
            );
        }

        if self.animation_ms == 0 {
            bail!("VEXLINE_ANIMATION_MS must be greater than zero");
        }

        Ok(())
    }

    pub fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.escape_timeout_ms)
    }

    pub fn double_escape_window(&self) -> Duration {
        Duration::from_millis(self.double_escape_ms)
    }

    pub fn animation_interval(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }
}
