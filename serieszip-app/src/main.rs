//! serieszip daemon: loads the config, wires up tracing and telemetry and
//! serves the proxy.

mod config;
mod graphite;

use anyhow::Result;
use clap::Parser;
use config::Config;
use serieszip::{OptionsBuilder, Zipper};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "serieszip", version, about = "fan-out proxy for clustered graphite-style metric storage")]
struct Args {
    /// JSON config file, optionally preceded by a '#' comment header
    #[arg(short = 'c', long)]
    config: PathBuf,

    /// Override the listening port from the config file
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Override the runtime worker thread count from the config file
    #[arg(long)]
    max_procs: Option<usize>,

    /// Increase log verbosity (-d: debug, -dd: trace)
    #[arg(short = 'd', long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Per-backend concurrency limit (0 disables admission control)
    #[arg(short = 'l', long, default_value_t = 0)]
    limit: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config = Config::load(&args.config)?;

    // command line overrides config file
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max_procs) = args.max_procs {
        config.max_procs = max_procs;
    }

    info!("starting serieszip {}", env!("CARGO_PKG_VERSION"));

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if config.max_procs > 0 {
        runtime.worker_threads(config.max_procs);
    }

    runtime.build()?.block_on(run(config, args.limit))
}

async fn run(config: Config, concurrency_limit: usize) -> Result<()> {
    let options = OptionsBuilder::new()
        .total_timeout(Duration::from_millis(config.timeout_ms))
        .after_first_timeout(Duration::from_millis(config.timeout_ms_after_first_seen))
        .concurrency_limit(concurrency_limit)
        .max_idle_conns_per_host(config.max_idle_conns_per_host)
        .buckets(config.buckets)
        .build();

    let zipper = Zipper::with_options(config.backends.clone(), options)?;

    if let Some(host) = config.graphite_host() {
        graphite::install(host, zipper.clone())?;
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on {addr}");

    axum::Server::bind(&addr)
        .serve(serieszip::router(zipper).into_make_service())
        .await?;

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
