use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use nodetrack::{
    agent::{start_agent, OutputSink, Spool, StdoutSink, TeeSink},
    config::Config,
    constants::*,
    events::{emit_system_event, LogLevel},
    prompt::spawn_prompt,
    shutdown::Shutdown,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "nodetrack node agent")]
struct Args {
    /// Optional path to config file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Address to listen on and advertise (host:port)
    #[arg(long)]
    address: Option<String>,

    /// Tracker address (host:port)
    #[arg(long)]
    tracker: Option<String>,

    /// Directory of the command spool files
    #[arg(long)]
    spool_dir: Option<String>,

    /// Read commands from an interactive prompt instead of the spool
    #[arg(long)]
    prompt: bool,

    /// Do not register with the tracker at startup
    #[arg(long)]
    no_submit: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match Config::load(&args.config)? {
        Some(cfg) => {
            println!("{}Loaded config from: {}", ICON_PLACEHOLDER, args.config.display());
            cfg
        }
        None => {
            println!(
                "{}No config file found at '{}', using defaults.",
                ICON_PLACEHOLDER,
                args.config.display()
            );
            Config::default()
        }
    };
    if let Some(address) = args.address {
        config.set_agent_address(address);
    }
    if let Some(tracker) = args.tracker {
        config.set_tracker_address(tracker);
    }
    if let Some(dir) = args.spool_dir {
        config.set_spool_dir(dir);
    }
    if args.no_submit {
        config.agent.get_or_insert_with(Default::default).submit_on_start = Some(false);
    }

    nodetrack::events::init_events_from_config(config.logging.as_ref()).await;
    emit_system_event("agent", LogLevel::Info, "startup", Some(full_version()));

    let shutdown = Shutdown::new();
    let advertised = config.agent_address();
    let address = nodetrack::network::message::NodeAddress::parse_flexible(&advertised)
        .map_err(|e| anyhow::anyhow!("invalid --address '{}': {}", advertised, e))?;
    let spool = Spool::new(config.spool_dir(), &address);
    spool.ensure().await?;

    let file_sink: Arc<dyn OutputSink> = Arc::new(spool.output_sink());
    let output: Arc<dyn OutputSink> = if args.prompt {
        Arc::new(TeeSink::new(vec![file_sink, Arc::new(StdoutSink)]))
    } else {
        file_sink
    };

    let mut handle = start_agent(&config, output, shutdown.clone()).await?;

    if args.prompt {
        spawn_prompt(handle.queue.clone(), handle.address().to_string())?;
    } else {
        let reader = spool.spawn_reader(handle.queue.clone(), config.poll_interval(), shutdown.clone());
        handle.track(reader);
        println!(
            "{}Reading commands from {}",
            ICON_PLACEHOLDER,
            spool.in_path().display()
        );
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                emit_system_event("agent", LogLevel::Info, "interrupted", None);
                shutdown.trigger();
            }
        });
    }

    handle.wait().await?;
    emit_system_event("agent", LogLevel::Info, "stopped", None);
    nodetrack::events::flush_events().await;
    Ok(())
}
