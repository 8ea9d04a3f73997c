use lvb_core::slack_of_prod_ratio;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest slack the benchmark builds a buffer with, about a million slots.
pub const MAX_BENCH_SLACK: usize = 1 << 20;

/// Settings for the periodic producer/consumer benchmark.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::slack")]
    pub slack: usize,
    /// Derive the slack from the period ratio instead of using `slack`.
    #[serde(default)]
    pub auto_slack: bool,
    #[serde(default = "defaults::period_ns")]
    pub prod_period_ns: u64,
    #[serde(default = "defaults::period_ns")]
    pub cons_period_ns: u64,
    #[serde(default = "defaults::duration_ms")]
    pub duration_ms: u64,
    /// Delay before the producer's first tick.
    #[serde(default = "defaults::start_delay_ns")]
    pub start_delay_ns: u64,
    /// Extra delay of the consumer's first tick relative to the producer's.
    #[serde(default = "defaults::consumer_offset_ns")]
    pub consumer_offset_ns: u64,
    /// Where to write the report as JSON, if anywhere.
    #[serde(default)]
    pub json_report: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn slack() -> usize {
        4
    }

    pub fn period_ns() -> u64 {
        100_000 // 10 kHz
    }

    pub fn duration_ms() -> u64 {
        4_000
    }

    pub fn start_delay_ns() -> u64 {
        1_000_000
    }

    pub fn consumer_offset_ns() -> u64 {
        10_000
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            slack: defaults::slack(),
            auto_slack: false,
            prod_period_ns: defaults::period_ns(),
            cons_period_ns: defaults::period_ns(),
            duration_ms: defaults::duration_ms(),
            start_delay_ns: defaults::start_delay_ns(),
            consumer_offset_ns: defaults::consumer_offset_ns(),
            json_report: None,
        }
    }
}

impl BenchConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&toml_to_str)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BenchConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prod_period_ns == 0 {
            return Err(ConfigError::Invalid {
                field: "prod_period_ns",
                reason: "must be positive",
            });
        }
        if self.cons_period_ns == 0 {
            return Err(ConfigError::Invalid {
                field: "cons_period_ns",
                reason: "must be positive",
            });
        }
        if self.duration_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "duration_ms",
                reason: "must be positive",
            });
        }
        if !self.auto_slack && self.slack == 0 {
            return Err(ConfigError::Invalid {
                field: "slack",
                reason: "must be at least 1",
            });
        }
        if self.effective_slack() > MAX_BENCH_SLACK {
            return Err(if self.auto_slack {
                ConfigError::Invalid {
                    field: "cons_period_ns",
                    reason: "period ratio gives a slack above 1048576",
                }
            } else {
                ConfigError::Invalid {
                    field: "slack",
                    reason: "must be at most 1048576",
                }
            });
        }
        Ok(())
    }

    /// How many producer ticks fit in one consumer tick.
    pub fn prod_ratio(&self) -> f64 {
        self.cons_period_ns as f64 / self.prod_period_ns as f64
    }

    /// Slack the benchmark buffer is built with.
    pub fn effective_slack(&self) -> usize {
        if self.auto_slack {
            slack_of_prod_ratio(self.prod_ratio())
        } else {
            self.slack
        }
    }

    pub fn prod_period(&self) -> Duration {
        Duration::from_nanos(self.prod_period_ns)
    }

    pub fn cons_period(&self) -> Duration {
        Duration::from_nanos(self.cons_period_ns)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_nanos(self.start_delay_ns)
    }

    pub fn consumer_offset(&self) -> Duration {
        Duration::from_nanos(self.consumer_offset_ns)
    }
}
