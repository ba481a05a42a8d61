//! abrmd Daemon - TPM2 Access Broker Front End
//!
//! Resolves the downstream TCTI from the command line, environment and config
//! file, builds it, and wires it as the sink of the broker's command source.
//!
//! # Usage
//!
//! ```bash
//! # Kernel resource manager device
//! abrmd-daemon --tcti device --tcti-device /dev/tpmrm0
//!
//! # Simulator through a TSS2 TCTI library
//! abrmd-daemon -t dynamic -i libtss2-tcti-mssim.so.0 -j host=localhost,port=2321
//!
//! # Show the resolved configuration
//! abrmd-daemon --dump-config
//!
//! # Verbose logging
//! RUST_LOG=debug abrmd-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{FromArgMatches, Parser};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use abrmd_core::{
    add_sink, load_config, load_config_from_path, BrokerConfig, FanOutSource, TransportSink,
};

/// abrmd Daemon - TPM2 access broker
#[derive(Parser, Debug)]
#[command(name = "abrmd-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "ABRMD_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "ABRMD_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Print the resolved TCTI configuration and exit
    #[arg(long)]
    dump_config: bool,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("abrmd_daemon={level},abrmd_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
}

fn render_config(config: &BrokerConfig) -> String {
    fn field(value: Option<&str>) -> &str {
        value.unwrap_or("(unset)")
    }

    let transport = &config.transport;
    let config_file = config
        .config_file_path
        .as_ref()
        .map(|path| format!("config_file: {}\n", path.display()))
        .unwrap_or_default();

    format!(
        "source: {source}\n\
         {config_file}\
         tcti: {kind}\n\
         device: {device}\n\
         socket_address: {address}\n\
         socket_port: {port}\n\
         file_name: {file_name}\n\
         conf_str: {conf_str}\n",
        source = config.source(),
        kind = transport.kind,
        device = field(transport.device_path.as_deref()),
        address = field(transport.socket_address.as_deref()),
        port = transport.effective_socket_port(),
        file_name = field(transport.library_name.as_deref()),
        conf_str = field(transport.library_conf.as_deref()),
    )
}

async fn wait_for_shutdown() -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
    }
    Ok(())
}

fn run(args: &Args, matches: &clap::ArgMatches) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    }
    .context("Failed to load configuration")?;

    cli::tcti_overrides(matches)
        .apply(&mut config)
        .context("Invalid TCTI option")?;

    if args.dump_config {
        print!("{}", render_config(&config));
        return Ok(());
    }

    info!(
        tcti = %config.transport.kind,
        source = %config.source(),
        "Resolved TCTI configuration"
    );

    // TCTI construction blocks; do it before the runtime exists.
    let transport = config
        .transport_factory()
        .build()
        .context("Failed to initialize downstream TCTI")?;

    let sink = Arc::new(TransportSink::new(transport));
    let mut commands: FanOutSource<Vec<u8>> = FanOutSource::new("command-source");
    add_sink::<Vec<u8>>(&mut commands, sink.clone());
    info!(
        tcti = %sink.describe(),
        sinks = commands.sink_count(),
        "Command pipeline ready"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(wait_for_shutdown())?;

    info!("Shutting down...");
    drop(commands);
    if let Some(e) = sink.take_error() {
        return Err(e).context("Downstream TCTI failed to transmit");
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli::command().get_matches();
    let args = Args::from_arg_matches(&matches)?;

    init_logging(&args.log_level)?;

    info!("abrmd daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    match run(&args, &matches) {
        Ok(()) => {
            info!("abrmd daemon stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Daemon stopped with error");
            Err(e)
        }
    }
}
