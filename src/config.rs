//! Worker configuration
//!
//! Loaded from environment variables (after `.env`), with defaults for every
//! value.

use anyhow::Context;
use std::path::PathBuf;
use std::str::FromStr;

use crate::runner::process::{DEFAULT_COMPILE_TIME_LIMIT_MS, DEFAULT_OUTPUT_LIMIT_BYTES};

/// Grading worker configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Per-case time limit for jobs that do not set one (default: 2s)
    pub default_time_limit_secs: u32,
    /// Memory limit for jobs that do not set one (default: 256MB, advisory)
    pub default_memory_limit_mb: u32,
    /// Upper bound on grading runs executing at once
    pub max_concurrent_runs: usize,
    /// Compile time limit in milliseconds (default: 30000ms = 30s)
    pub compile_time_limit_ms: u32,
    /// Captured bytes per output stream
    pub output_limit_bytes: usize,
    /// Parent of per-run scratch directories (system temp dir if unset)
    pub scratch_dir: Option<PathBuf>,
    /// Toolchain TOML overriding the built-in `files/languages.toml`
    pub languages_config: Option<PathBuf>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            default_time_limit_secs: 2,
            default_memory_limit_mb: 256,
            max_concurrent_runs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            compile_time_limit_ms: DEFAULT_COMPILE_TIME_LIMIT_MS,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            scratch_dir: None,
            languages_config: None,
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            default_time_limit_secs: parse_or(
                &lookup,
                "DEFAULT_TIME_LIMIT_SECS",
                defaults.default_time_limit_secs,
            )?,
            default_memory_limit_mb: parse_or(
                &lookup,
                "DEFAULT_MEMORY_LIMIT_MB",
                defaults.default_memory_limit_mb,
            )?,
            max_concurrent_runs: parse_or(
                &lookup,
                "MAX_CONCURRENT_RUNS",
                defaults.max_concurrent_runs,
            )?,
            compile_time_limit_ms: parse_or(
                &lookup,
                "COMPILE_TIME_LIMIT_MS",
                defaults.compile_time_limit_ms,
            )?,
            output_limit_bytes: parse_or(
                &lookup,
                "OUTPUT_LIMIT_BYTES",
                defaults.output_limit_bytes,
            )?,
            scratch_dir: lookup("SCRATCH_DIR").map(PathBuf::from),
            languages_config: lookup("LANGUAGES_CONFIG").map(PathBuf::from),
        };

        if config.max_concurrent_runs == 0 {
            anyhow::bail!("MAX_CONCURRENT_RUNS must be at least 1");
        }

        Ok(config)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = JudgeConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.default_time_limit_secs, 2);
        assert_eq!(config.default_memory_limit_mb, 256);
        assert_eq!(config.compile_time_limit_ms, 30_000);
        assert!(config.max_concurrent_runs >= 1);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn test_overrides_from_env() {
        let config = JudgeConfig::from_lookup(lookup_from(&[
            ("DEFAULT_TIME_LIMIT_SECS", "5"),
            ("MAX_CONCURRENT_RUNS", "3"),
            ("SCRATCH_DIR", "/var/lib/judge"),
        ]))
        .unwrap();

        assert_eq!(config.default_time_limit_secs, 5);
        assert_eq!(config.max_concurrent_runs, 3);
        assert_eq!(config.scratch_dir, Some(PathBuf::from("/var/lib/judge")));
    }

    #[test]
    fn test_invalid_value_is_error() {
        let err = JudgeConfig::from_lookup(lookup_from(&[("OUTPUT_LIMIT_BYTES", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("OUTPUT_LIMIT_BYTES"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(JudgeConfig::from_lookup(lookup_from(&[("MAX_CONCURRENT_RUNS", "0")])).is_err());
    }
}
