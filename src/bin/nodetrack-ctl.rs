use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nodetrack::agent::{Command, Spool};
use nodetrack::config::Config;
use nodetrack::network::message::NodeAddress;

/// nodetrack-ctl: drive a running node agent through its spool files.
///
/// Commands are appended to `<spool_dir>/<node>.in`; the agent's output is
/// read back from `<spool_dir>/<node>.out`. The agent does not need to be
/// reachable over the network.
#[derive(Parser, Debug)]
#[command(name = "nodetrack-ctl", version, about = "Controller for nodetrack agents")]
struct Cli {
    /// Path to config file (TOML); only `[agent].spool_dir` is used
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Spool directory (overrides the config file)
    #[arg(long)]
    spool_dir: Option<String>,

    /// Agent to control (host:port)
    #[arg(short, long)]
    node: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue a raw command line
    Send { line: String },
    /// Register the agent with its tracker
    SubmitInfo,
    /// Fetch the tracker's node list
    GetList,
    /// Ask the tracker for the agent's public IP
    GetIp,
    /// Handshake with a peer
    PeerConnect { peer: String },
    /// Send a chat message to a connected peer
    Chat { peer: String, message: String },
    /// Send a local file to a connected peer
    File { peer: String, path: PathBuf },
    /// Stop the agent
    Exit,
    /// Print and clear the agent's output
    Output {
        /// Wait this many milliseconds before reading
        #[arg(long, default_value_t = 0)]
        wait_ms: u64,
    },
}

fn parse_peer(raw: &str) -> anyhow::Result<NodeAddress> {
    NodeAddress::parse_flexible(raw).map_err(|e| anyhow::anyhow!("{}", e))
}

fn file_descriptor(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("failed to read '{}': {}", path.display(), e))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".into());
    let mut file = Map::new();
    file.insert("filename".into(), Value::String(filename));
    file.insert("size".into(), Value::from(bytes.len()));
    file.insert(
        "content".into(),
        Value::String(String::from_utf8_lossy(&bytes).into_owned()),
    );
    Ok(file)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?.unwrap_or_default();
    if let Some(dir) = cli.spool_dir {
        config.set_spool_dir(dir);
    }
    let node = parse_peer(&cli.node)?;
    let spool = Spool::new(config.spool_dir(), &node);

    let line = match cli.command {
        Commands::Send { line } => line,
        Commands::SubmitInfo => Command::SubmitInfo.to_line(),
        Commands::GetList => Command::GetList.to_line(),
        Commands::GetIp => Command::GetIp.to_line(),
        Commands::PeerConnect { peer } => Command::PeerConnect(parse_peer(&peer)?).to_line(),
        Commands::Chat { peer, message } => Command::Chat {
            peer: parse_peer(&peer)?,
            message,
        }
        .to_line(),
        Commands::File { peer, path } => Command::File {
            peer: parse_peer(&peer)?,
            file: file_descriptor(&path)?,
        }
        .to_line(),
        Commands::Exit => Command::Exit.to_line(),
        Commands::Output { wait_ms } => {
            if wait_ms > 0 {
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
            let output = spool.take_output().await?;
            print!("{}", output);
            return Ok(());
        }
    };

    spool.push_command(&line).await?;
    println!("queued for {}: {}", node, line);
    Ok(())
}
