use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use relaycast::model::{IceServerConfig, RoomId};
use relaycast::peer::{
    Broadcaster, BroadcasterEvent, SignalClient, StaticSampleCapture, TransportConfig, Viewer,
    ViewerEvent, WebRtcBackend,
};
use relaycast::server::RelayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relaycast", version, about = "One-to-many live broadcast signaling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay and room directory.
    Serve(ServeArgs),
    /// Claim a room and negotiate a link with every viewer that joins.
    Broadcast(PeerArgs),
    /// Join a room as a viewer and report what arrives.
    Watch(PeerArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "RELAYCAST_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// STUN url handed to clients. Repeatable.
    #[arg(long, env = "RELAYCAST_STUN", value_delimiter = ',')]
    stun: Vec<String>,

    #[arg(long, env = "RELAYCAST_TURN")]
    turn: Option<String>,

    #[arg(long, env = "RELAYCAST_TURN_USERNAME", requires = "turn")]
    turn_username: Option<String>,

    #[arg(long, env = "RELAYCAST_TURN_CREDENTIAL", requires = "turn")]
    turn_credential: Option<String>,

    #[arg(long, env = "RELAYCAST_ROOM_CAPACITY", default_value_t = 100)]
    room_channel_capacity: usize,
}

#[derive(Args)]
struct PeerArgs {
    /// Websocket url of the relay.
    #[arg(long, env = "RELAYCAST_RELAY", default_value = "ws://127.0.0.1:8080/ws")]
    relay: String,

    #[arg(long)]
    room: String,
}

impl ServeArgs {
    fn into_config(self) -> RelayConfig {
        let mut config = RelayConfig {
            bind: self.bind,
            room_channel_capacity: self.room_channel_capacity,
            ..RelayConfig::default()
        };

        if !self.stun.is_empty() {
            config.ice_servers = vec![IceServerConfig {
                urls: self.stun,
                username: None,
                credential: None,
            }];
        }
        if let Some(turn) = self.turn {
            config.ice_servers.push(IceServerConfig {
                urls: vec![turn],
                username: self.turn_username,
                credential: self.turn_credential,
            });
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => {
            let config = args.into_config();
            println!(
                "{} {}",
                "📡 Relay starting on".green().bold(),
                config.bind.to_string().cyan()
            );
            relaycast::server::serve(config).await?;
            println!("{}", "Relay stopped".yellow());
        }
        Commands::Broadcast(args) => broadcast(args).await?,
        Commands::Watch(args) => watch(args).await?,
    }

    Ok(())
}

async fn broadcast(args: PeerArgs) -> Result<()> {
    let (client, incoming) = SignalClient::connect(&args.relay)
        .await
        .context("Failed to reach the relay")?;
    let room = RoomId::from(args.room);
    let mut broadcaster = Broadcaster::new(
        room.clone(),
        Arc::new(WebRtcBackend::new(TransportConfig::default())),
        Arc::new(StaticSampleCapture::new(room.as_str())),
        Arc::new(client),
    );
    let mut events = broadcaster.subscribe();
    let mut task = tokio::spawn(broadcaster.run(incoming));
    println!("{} {}", "🎥 Broadcasting in room".green().bold(), room);

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                BroadcasterEvent::LinkState { viewer_id, state } => {
                    println!("   {} {:?}", viewer_id.to_string().cyan(), state)
                }
                BroadcasterEvent::ConnectionState { viewer_id, state } => {
                    println!("   {} transport {:?}", viewer_id.to_string().cyan(), state)
                }
                BroadcasterEvent::LinkFailed { viewer_id, reason } => {
                    println!("   {} {}", viewer_id.to_string().red(), reason)
                }
                BroadcasterEvent::Disconnected => {}
            },
            result = &mut task => {
                result.context("Broadcaster task panicked")??;
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                task.abort();
                println!("{}", "Broadcast stopped".yellow());
                return Ok(());
            }
        }
    }
}

async fn watch(args: PeerArgs) -> Result<()> {
    let (client, incoming) = SignalClient::connect(&args.relay)
        .await
        .context("Failed to reach the relay")?;
    let room = RoomId::from(args.room);
    let mut viewer = Viewer::new(
        room.clone(),
        Arc::new(WebRtcBackend::new(TransportConfig::default())),
        Arc::new(client),
    );
    let mut events = viewer.subscribe();
    let mut task = tokio::spawn(viewer.run(incoming));
    println!("{} {}", "👀 Watching room".green().bold(), room);

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                ViewerEvent::TrackAdded { id, kind } => {
                    println!("   {} {:?} track {}", "+".green(), kind, id)
                }
                ViewerEvent::TrackEnded { id } => println!("   {} track {}", "-".red(), id),
                ViewerEvent::Idle => println!("   {}", "No broadcaster, waiting".yellow()),
                ViewerEvent::LinkFailed(reason) => println!("   {}", reason.red()),
                other => println!("   {:?}", other),
            },
            result = &mut task => {
                result.context("Viewer task panicked")??;
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                task.abort();
                println!("{}", "Stopped watching".yellow());
                return Ok(());
            }
        }
    }
}
