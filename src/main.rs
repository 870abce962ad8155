use clap::{Parser, Subcommand};
use fabricd::config;
use fabricd::controlplane::{Controller, DataplaneHandle};
use fabricd::telemetry::{init_logging, MetricsRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "fabricd")]
#[command(about = "Control-plane decision engine for a data-center fabric")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run the controller daemon
    Run {
        /// Path to fabricd.toml
        #[arg(short, long, default_value = "fabricd.toml")]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate fabricd.toml without starting the engine
    Validate {
        /// Path to fabricd.toml
        #[arg(short, long, default_value = "fabricd.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config {
            action: ConfigAction::Validate { config },
        } => {
            if let Err(e) = cmd_config_validate(&config) {
                eprintln!("[ERROR] {}", e);
                std::process::exit(1);
            }
        }
        Commands::Run { config } => {
            if let Err(e) = cmd_run(&config) {
                eprintln!("[ERROR] {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn cmd_config_validate(path: &PathBuf) -> fabricd::Result<()> {
    let config = config::load(path)?;
    let result = config::validate(&config);
    result.print_diagnostics();
    if result.has_errors() {
        return Err(fabricd::Error::Config(format!(
            "{} error(s) in {}",
            result.errors.len(),
            path.display()
        )));
    }
    println!("{} is valid", path.display());
    Ok(())
}

fn cmd_run(path: &PathBuf) -> fabricd::Result<()> {
    let config = config::load(path)?;

    init_logging(Some(&config.log));

    // Fail fast: a broken subnet table cannot be corrected at runtime.
    let result = config::validate(&config);
    result.print_diagnostics();
    if result.has_errors() {
        return Err(fabricd::Error::Config("invalid configuration".into()));
    }

    let topology = config.topology()?;
    let subnets = config.subnet_table()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let metrics = Arc::new(MetricsRegistry::new());
        let (dataplane, _actions) = DataplaneHandle::new();
        let controller = Arc::new(Controller::new(topology, subnets, dataplane, metrics));

        for s in config.subnets.iter() {
            info!(cidr = %s.cidr, gateway = %s.gateway_ip, "configured subnet");
        }
        info!(router = %controller.topology().router(), "engine ready");

        // The switch transport is an external collaborator: it owns
        // the TCP/OpenFlow side, feeds `events` and drains `_actions`.
        // Without one attached we idle until interrupted.
        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let engine = tokio::spawn(Arc::clone(&controller).run(events_rx));

        tokio::signal::ctrl_c().await.ok();
        info!("shutting down");
        drop(events_tx);
        engine.await.ok();
    });

    Ok(())
}
