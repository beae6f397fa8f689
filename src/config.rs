//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.devprofile.toml` files.

use crate::options::ServerOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".devprofile.toml";

/// Names of the builtin probes, in dispatch order.
pub const BUILTIN_PROBES: [&str; 5] = ["platform", "hardware", "browser", "telephony", "network"];

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Probe settings.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Identity service connection, when one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerOptions>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Write the profile to this file instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Indent JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            verbose: false,
            pretty: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Probe selection and per-probe inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Builtin probes to run.
    #[serde(default = "default_probes")]
    pub probes: Vec<String>,

    /// Per-probe deadline in milliseconds. Unset means probes run unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_ms: Option<u64>,

    /// User agent reported by the browser probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Carrier reported by the telephony probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_name: Option<String>,

    /// ISO country code reported by the telephony probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    /// `host:port` resolved by the network probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_host: Option<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            probes: default_probes(),
            probe_timeout_ms: None,
            user_agent: None,
            carrier_name: None,
            country_code: None,
            network_host: None,
        }
    }
}

fn default_probes() -> Vec<String> {
    BUILTIN_PROBES.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from `dir/.devprofile.toml`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        if args.compact {
            self.general.pretty = false;
        }

        if let Some(ref probes) = args.probes {
            self.collector.probes = probes.clone();
        }
        if let Some(timeout) = args.probe_timeout {
            self.collector.probe_timeout_ms = Some(timeout);
        }
        if let Some(ref agent) = args.user_agent {
            self.collector.user_agent = Some(agent.clone());
        }
        if let Some(ref host) = args.network_host {
            self.collector.network_host = Some(host.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the merged settings.
    ///
    /// Values from the file get the same checks as their command-line
    /// counterparts, so call this after [`merge_with_args`](Config::merge_with_args).
    pub fn validate(&self) -> Result<()> {
        let collector = &self.collector;

        if collector.probes.is_empty() {
            bail!("At least one probe must be selected");
        }
        if let Some(unknown) = collector
            .probes
            .iter()
            .find(|p| !BUILTIN_PROBES.contains(&p.as_str()))
        {
            bail!(
                "Unknown probe '{}'. Available: {}",
                unknown,
                BUILTIN_PROBES.join(", ")
            );
        }

        if collector.probe_timeout_ms == Some(0) {
            bail!("Probe timeout must be at least 1 millisecond");
        }

        if let Some(ref host) = collector.network_host {
            if !host.contains(':') {
                bail!("Network host must be in host:port form");
            }
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
