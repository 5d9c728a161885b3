use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sl_app::{AppResult, Overrides};
use sl_controls::SettingId;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sl")]
#[command(about = "solarloop - solar collector circulation controller", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, debug, sl_controls=debug)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller
    Run {
        /// Path to the configuration YAML file
        #[arg(long, default_value = "/config.yaml")]
        config: PathBuf,
        /// EVOK API address (host:port)
        #[arg(long)]
        evok_address: Option<String>,
        /// Home Assistant address (host:port)
        #[arg(long)]
        hass_address: Option<String>,
        /// Home Assistant long-lived access token
        #[arg(long, env = "HASS_TOKEN", hide_env_values = true)]
        hass_token: Option<String>,
        /// Flow regulator is fully open at 0 V
        #[arg(long)]
        invert: bool,
        /// Listen address for the monitoring endpoints
        #[arg(long)]
        listen: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        /// Path to the configuration YAML file
        config_path: PathBuf,
    },
    /// Show the flow duty the configured curve yields for a temperature delta
    Flow {
        /// Path to the configuration YAML file
        config_path: PathBuf,
        /// Temperature delta in °C
        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            config,
            evok_address,
            hass_address,
            hass_token,
            invert,
            listen,
        } => cmd_run(
            &config,
            Overrides {
                evok_address,
                hass_address,
                hass_token,
                listen,
                invert,
            },
        ),
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Flow { config_path, delta } => cmd_flow(&config_path, delta),
    }
}

fn cmd_run(config_path: &Path, overrides: Overrides) -> AppResult<()> {
    tracing::info!(path = %config_path.display(), "Reading configuration");
    let config = sl_app::load_config(config_path)?;
    let config = sl_app::apply_overrides(config, &overrides)?;
    sl_app::run(config)
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = sl_app::load_config(config_path)?;
    let summary = sl_app::summarize(&config)?;
    println!("✓ Configuration is valid");
    println!("  EVOK:           {}", summary.evok_address);
    println!("  Home Assistant: {}", summary.hass_address);
    println!("  Monitoring:     {}", summary.listen);
    println!("  Inverted flow:  {}", summary.invert);
    println!("  Initial thresholds:");
    for id in SettingId::ALL {
        println!("    {:<14} {}", id.name(), summary.thresholds.get(id));
    }
    Ok(())
}

fn cmd_flow(config_path: &Path, delta: f64) -> AppResult<()> {
    let config = sl_app::load_config(config_path)?;
    let (duty, written) = sl_app::flow_for(&config, delta)?;
    println!("delta {delta:.2} °C -> duty {duty:.2}");
    if written != duty {
        println!("regulator receives {written:.2} (inverted)");
    }
    Ok(())
}
