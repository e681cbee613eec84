use std::time::Duration;

use crate::error::{Error, ErrorKind};

/// Tunable executor parameters. The defaults reproduce the constants documented alongside
/// [`crate::executor::Executor`] and [`crate::executable::STARTING_DEADLINE_TICKS`]; everything
/// here only lets a host retune them without recompiling, it does not change what they mean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub tick_period: Duration,
    pub starting_deadline_ticks: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(10),
            starting_deadline_ticks: crate::executable::STARTING_DEADLINE_TICKS,
        }
    }
}

#[cfg(feature = "config_toml")]
#[derive(serde::Deserialize, Default)]
#[serde(default)]
struct RawExecutorConfig {
    tick_period_ms: Option<u64>,
    starting_deadline_ticks: Option<u32>,
}

impl ExecutorConfig {
    /// Loads a config, applying three layers in increasing priority: built-in defaults, an
    /// optional TOML file (present only when compiled with the `config_toml` feature), then the
    /// `VAF_TICK_PERIOD_MS` / `VAF_STARTING_DEADLINE_TICKS` environment variables.
    #[cfg(feature = "config_toml")]
    pub fn load(toml_path: Option<&std::path::Path>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(path) = toml_path {
            let text = std::fs::read_to_string(path).map_err(|e| {
                Error::new(
                    ErrorKind::DefaultError,
                    format!("failed to read config file {}: {e}", path.display()),
                )
            })?;
            let raw: RawExecutorConfig = toml::from_str(&text).map_err(|e| {
                Error::new(
                    ErrorKind::DefaultError,
                    format!("failed to parse config file {}: {e}", path.display()),
                )
            })?;
            if let Some(ms) = raw.tick_period_ms {
                config.tick_period = Duration::from_millis(ms);
            }
            if let Some(ticks) = raw.starting_deadline_ticks {
                config.starting_deadline_ticks = ticks;
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    #[cfg(not(feature = "config_toml"))]
    pub fn load() -> Result<Self, Error> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), Error> {
        if let Ok(value) = std::env::var("VAF_TICK_PERIOD_MS") {
            let ms: u64 = value.parse().map_err(|_| {
                Error::new(
                    ErrorKind::DefaultError,
                    format!("VAF_TICK_PERIOD_MS is not a valid integer: '{value}'"),
                )
            })?;
            self.tick_period = Duration::from_millis(ms);
        }
        if let Ok(value) = std::env::var("VAF_STARTING_DEADLINE_TICKS") {
            let ticks: u32 = value.parse().map_err(|_| {
                Error::new(
                    ErrorKind::DefaultError,
                    format!("VAF_STARTING_DEADLINE_TICKS is not a valid integer: '{value}'"),
                )
            })?;
            self.starting_deadline_ticks = ticks;
        }
        Ok(())
    }
}
