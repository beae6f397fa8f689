//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::BUILTIN_PROBES;
use clap::Parser;
use std::path::PathBuf;

/// devprofile - collect a device profile from concurrent probes
///
/// Runs every enabled probe in parallel and prints the merged profile
/// as JSON, keyed by probe name.
///
/// Examples:
///   devprofile
///   devprofile --probes platform,hardware --compact
///   devprofile --probe-timeout 500 --network-host example.com:443
///   devprofile --options
///   devprofile --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Write the profile to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .devprofile.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit single-line JSON
    #[arg(long)]
    pub compact: bool,

    /// Probes to run (comma-separated)
    ///
    /// Example: --probes platform,hardware
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub probes: Option<Vec<String>>,

    /// Per-probe deadline in milliseconds
    ///
    /// Without it a probe that never answers blocks the whole collection.
    #[arg(long, value_name = "MS", env = "DEVPROFILE_PROBE_TIMEOUT")]
    pub probe_timeout: Option<u64>,

    /// User agent reported by the browser probe
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// host:port resolved by the network probe
    #[arg(long, value_name = "HOST:PORT")]
    pub network_host: Option<String>,

    /// Print the configured server options dictionary and exit
    #[arg(long)]
    pub options: bool,

    /// Generate a default .devprofile.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref probes) = self.probes {
            if probes.is_empty() {
                return Err("At least one probe must be selected".to_string());
            }
            if let Some(unknown) = probes.iter().find(|p| !BUILTIN_PROBES.contains(&p.as_str())) {
                return Err(format!(
                    "Unknown probe '{}'. Available: {}",
                    unknown,
                    BUILTIN_PROBES.join(", ")
                ));
            }
        }

        if let Some(timeout) = self.probe_timeout {
            if timeout == 0 {
                return Err("Probe timeout must be at least 1 millisecond".to_string());
            }
        }

        if let Some(ref host) = self.network_host {
            if !host.contains(':') {
                return Err("Network host must be in host:port form".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
