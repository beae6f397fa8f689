//! devprofile - device profile collector
//!
//! A CLI that runs the builtin device probes concurrently and prints the
//! merged profile as JSON.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, output failure)

use anyhow::{Context, Result};
use devprofile::cli::Args;
use devprofile::collector::{Aggregator, ProfileCollector};
use devprofile::config::{Config, CONFIG_FILE};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("devprofile v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Collection failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .devprofile.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to choose probes, set a probe timeout, or add a [server] section.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the profile.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    if args.options {
        return print_options(&config);
    }

    if config.collector.probe_timeout_ms.is_none() {
        debug!("No probe timeout configured; a stuck probe will block collection");
    }

    let collector = ProfileCollector::from_config(Aggregator::current(), &config.collector);
    info!("Probes: {}", collector.probe_names().join(", "));

    let start = Instant::now();
    let profile = collector.collect().await;
    info!(
        "Collected {} probe results in {:.1}ms",
        profile.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    let rendered = if config.general.pretty {
        profile.to_json_pretty()
    } else {
        profile.to_json()
    }
    .context("Failed to serialize profile")?;

    write_output(config.general.output.as_deref(), &rendered)
}

/// Print the `[server]` section as the namespaced options dictionary.
fn print_options(config: &Config) -> Result<()> {
    let server = config
        .server
        .as_ref()
        .context("No [server] section configured")?;

    let dictionary = server.to_dictionary()?;
    let rendered = if config.general.pretty {
        serde_json::to_string_pretty(&dictionary)?
    } else {
        serde_json::to_string(&dictionary)?
    };

    write_output(config.general.output.as_deref(), &rendered)
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write profile to {}", path))?;
            info!("Profile written to {}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
