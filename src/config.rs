//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cotask.toml` files.

use crate::agent::AgentConfig;
use crate::cli::{Args, Mode, OutputFormat};
use crate::error::ReduceError;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".cotask.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Parallel reduction settings.
    #[serde(default)]
    pub reduce: ReduceConfig,

    /// Counter agent settings.
    #[serde(default)]
    pub agent: AgentSection,

    /// Watchdog settings.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceConfig {
    /// Worker tasks requested per sum.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    /// Milliseconds between ticks.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default)]
    pub start_counter: i64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            start_counter: 0,
        }
    }
}

fn default_tick_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Seconds until the watchdog stops the agent.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
        }
    }
}

fn default_deadline_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.cotask.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.reduce.workers == 0 {
            return Err(ReduceError::InvalidWorkerCount {
                requested: self.reduce.workers,
            }
            .into());
        }
        if self.agent.tick_ms == 0 {
            bail!("agent.tick_ms must be at least 1");
        }
        if self.watchdog.deadline_secs == 0 {
            bail!("watchdog.deadline_secs must be at least 1");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// where the CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if args.verbose {
            self.general.verbose = true;
        }

        match &args.mode {
            Some(Mode::Sum(sum)) => {
                if let Some(workers) = sum.workers {
                    self.reduce.workers = workers;
                }
                if let Some(format) = sum.format {
                    self.general.format = format;
                }
            }
            Some(Mode::Count(count)) => {
                if let Some(tick_ms) = count.tick_ms {
                    self.agent.tick_ms = tick_ms;
                }
                if let Some(start) = count.start {
                    self.agent.start_counter = start;
                }
                if let Some(deadline_secs) = count.deadline_secs {
                    self.watchdog.deadline_secs = deadline_secs;
                }
                if let Some(format) = count.format {
                    self.general.format = format;
                }
            }
            None => {}
        }
    }

    /// Agent settings in the form the agent takes them.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            tick: Duration::from_millis(self.agent.tick_ms),
            start_counter: self.agent.start_counter,
        }
    }

    pub fn watchdog_deadline(&self) -> Duration {
        Duration::from_secs(self.watchdog.deadline_secs)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CountArgs, SumArgs};
    use std::io::Write;
    use tempfile::TempDir;

    fn args_with(mode: Mode) -> Args {
        Args {
            mode: Some(mode),
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reduce.workers, 4);
        assert_eq!(config.agent.tick_ms, 100);
        assert_eq!(config.agent.start_counter, 0);
        assert_eq!(config.watchdog.deadline_secs, 10);
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
format = "json"

[reduce]
workers = 8

[agent]
tick_ms = 250
start_counter = -3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.reduce.workers, 8);
        assert_eq!(config.agent.tick_ms, 250);
        assert_eq!(config.agent.start_counter, -3);
        // Missing section falls back to defaults
        assert_eq!(config.watchdog.deadline_secs, 10);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[reduce]\nworkers = 0").unwrap();

        let err = Config::load(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Invalid worker count"), "{message}");
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[watchdog]\ndeadline_secs = 3\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.watchdog_deadline(), Duration::from_secs(3));

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[reduce\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_merge_with_args_only_overrides_explicit_values() {
        let mut config = Config::default();
        config.reduce.workers = 6;

        config.merge_with_args(&args_with(Mode::Sum(SumArgs::default())));
        assert_eq!(config.reduce.workers, 6);

        let sum = SumArgs {
            workers: Some(2),
            format: Some(OutputFormat::Json),
            ..SumArgs::default()
        };
        config.merge_with_args(&args_with(Mode::Sum(sum)));
        assert_eq!(config.reduce.workers, 2);
        assert_eq!(config.general.format, OutputFormat::Json);

        let count = CountArgs {
            tick_ms: Some(20),
            start: Some(5),
            deadline_secs: Some(1),
            ..CountArgs::default()
        };
        config.merge_with_args(&args_with(Mode::Count(count)));
        let agent = config.agent_config();
        assert_eq!(agent.tick, Duration::from_millis(20));
        assert_eq!(agent.start_counter, 5);
        assert_eq!(config.watchdog.deadline_secs, 1);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[reduce]"));
        assert!(toml_str.contains("[agent]"));
        assert!(toml_str.contains("[watchdog]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.reduce.workers, 4);
    }
}
