use clap::Parser;
use std::path::PathBuf;
use tokio::signal;

use nodetrack::{
    config::Config,
    constants::*,
    events::{emit_system_event, LogLevel},
    shutdown::Shutdown,
    tracker::start_tracker,
};

/// nodetrack-tracker: discovery service keeping a TTL-bounded list of online nodes.
#[derive(Parser, Debug)]
#[command(name = "nodetrack-tracker", version, about = "nodetrack discovery tracker")]
struct Args {
    /// Optional path to config file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Listen address (host:port)
    #[arg(long)]
    bind: Option<String>,

    /// Seconds without submit_info before a node is dropped
    #[arg(long)]
    ttl_secs: Option<u64>,

    /// Seconds between background sweeps
    #[arg(long)]
    sweep_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?.unwrap_or_default();
    if let Some(bind) = args.bind {
        config.set_tracker_bind(bind);
    }
    if let Some(ttl) = args.ttl_secs {
        config.set_ttl_secs(ttl);
    }
    if let Some(sweep) = args.sweep_secs {
        config.set_sweep_interval_secs(sweep);
    }

    nodetrack::events::init_events_from_config(config.logging.as_ref()).await;
    emit_system_event("tracker", LogLevel::Info, "startup", Some(full_version()));

    let shutdown = Shutdown::new();
    let handle = start_tracker(&config, shutdown.clone()).await?;
    println!(
        "{}Starting tracker service on {}",
        ICON_PLACEHOLDER, handle.local_addr
    );

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("{}Tracker shutting down...", ICON_PLACEHOLDER);
            shutdown.trigger();
        }
    });

    let result = handle.wait().await;
    emit_system_event("tracker", LogLevel::Info, "stopped", None);
    nodetrack::events::flush_events().await;
    result
}
