use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vtuber_bridge::{
    BridgeConfig, BridgeHandle, BridgePaths, ChatSession, ConsoleSession, ControlAction,
    SessionKey, WsConnector, parse_command, spawn_bridge,
};

#[derive(Parser)]
#[command(name = "vtb")]
#[command(about = "Chat with a VTuber backend from the terminal")]
struct Cli {
    /// Custom data directory (defaults to ~/.vtuber-bridge)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Backend WebSocket endpoint (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Platform name used to key this channel
    #[arg(long, default_value = "console")]
    platform: String,

    /// Channel id used to key this channel
    #[arg(long, default_value = "stdin")]
    channel: String,

    /// Channel type used to key this channel
    #[arg(long, default_value = "private")]
    channel_type: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging (stderr, so replies on stdout stay readable)
    let default_filter = if cli.debug {
        "vtuber_bridge=debug,vtuber_protocol=debug"
    } else {
        "vtuber_bridge=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let paths = BridgePaths::new(cli.data_dir)?;
    let mut file_config = paths.load()?;
    if let Some(endpoint) = cli.endpoint {
        file_config.endpoint = endpoint;
    }
    let config = BridgeConfig::from_file(&file_config);
    info!(
        endpoint = %config.endpoint,
        reasoning = config.pipeline.reasoning,
        "starting VTuber bridge"
    );

    let (bridge, task) = spawn_bridge(config, WsConnector);
    let session: Arc<dyn ChatSession> = Arc::new(ConsoleSession::new(
        cli.platform,
        cli.channel,
        cli.channel_type,
    ));

    eprintln!("Type `vtuber -u [HISTORY_UID]` to connect, `vtuber -d` to disconnect.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => handle_line(&bridge, &session, &line).await?,
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    bridge.shutdown().await?;
    if let Err(e) = task.await {
        warn!(error = %e, "bridge task ended abnormally");
    }
    Ok(())
}

async fn handle_line(
    bridge: &BridgeHandle,
    session: &Arc<dyn ChatSession>,
    line: &str,
) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let action = match parse_command(line) {
        Some(Ok(action)) => action,
        Some(Err(usage)) => {
            println!("{}", usage.trim_end());
            return Ok(());
        }
        None => {
            bridge
                .message(session.clone(), line.to_string(), Vec::new())
                .await?;
            return Ok(());
        }
    };

    let status = match action {
        ControlAction::Up { history_uid } => {
            bridge.up(session.clone(), history_uid).await?.to_string()
        }
        ControlAction::Down => bridge.down(session.clone()).await?.to_string(),
        ControlAction::Status => {
            let key = SessionKey::from_session(session.as_ref());
            match bridge.status(key).await? {
                Some(state) => format!("Connection is {}.", state),
                None => "Not connected.".to_string(),
            }
        }
    };
    session.send(&status);
    Ok(())
}
