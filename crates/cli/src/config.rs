//! Configuration for the `neovm` runner.
//!
//! The file format is TOML. Every table and field is optional; anything left
//! out falls back to the consensus defaults of the engine.

use anyhow::{Context, Result};
use neo_legacy_vm::ExecutionEngineLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Gas budget used when neither the file nor the command line sets one.
pub const DEFAULT_GAS: u64 = 10_000_000;

/// Runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Gas budget for the whole run.
    pub gas: u64,
    /// Engine caps, see [`ExecutionEngineLimits`].
    pub limits: ExecutionEngineLimits,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            gas: DEFAULT_GAS,
            limits: ExecutionEngineLimits::DEFAULT,
        }
    }
}

impl RunnerConfig {
    /// Loads the configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = RunnerConfig::from_toml("").expect("empty config parses");
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_partial_limits_table() {
        let config = RunnerConfig::from_toml(
            r#"
gas = 500

[limits]
max_stack_size = 16
max_big_integer_size = 64
"#,
        )
        .expect("config parses");

        assert_eq!(config.gas, 500);
        assert_eq!(config.limits.max_stack_size, 16);
        assert_eq!(config.limits.max_big_integer_size, 64);
        assert_eq!(
            config.limits.max_invocation_stack_size,
            ExecutionEngineLimits::DEFAULT.max_invocation_stack_size
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[limits]\nmax_array_size = 8").expect("write config");

        let config = RunnerConfig::load(file.path()).expect("config loads");
        assert_eq!(config.limits.max_array_size, 8);
        assert_eq!(config.gas, DEFAULT_GAS);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(RunnerConfig::from_toml("gas = \"lots\"").is_err());
    }
}
