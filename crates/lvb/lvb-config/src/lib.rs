mod config;

pub use config::{BenchConfig, ConfigError, MAX_BENCH_SLACK};
