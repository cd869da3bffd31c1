//! The arena world server binary.
//!
//! Composition root: builds the [`Arena`], spawns the simulation actor and
//! the background workers (relay publisher, event-batch sink, registry disk
//! writer), and serves HTTP `/ipc` plus WebSocket `/ws` until ctrl-c.

mod actor;
mod bridge;
mod ipc;
mod persist;
mod relay;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_core::Obstacle;
use arena_phase::PhaseTimings;
use arena_registry::{load_profiles, save_profiles};
use arena_sim::{ArenaBuilder, HookSet};

use crate::actor::ArenaCall;
use crate::bridge::ObserverBridge;
use crate::persist::{LogEventSink, spawn_event_writer, spawn_registry_writer};
use crate::relay::{LogRelay, spawn_relay};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name    = "arena-server",
    version,
    about   = "Authoritative world server for a multi-agent survival arena",
    long_about = "Agents drive the world through JSON commands on POST /ipc;\n\
                  spectators observe through the WebSocket at /ws."
)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Directory holding the registry snapshot
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// RNG seed (seeds from entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with static obstacles: [{"x":…,"z":…,"radius":…}, …]
    #[arg(long)]
    obstacles: Option<PathBuf>,

    /// Lobby phase duration in hours
    #[arg(long, default_value_t = 48)]
    lobby_hours: u64,

    /// Battle phase duration in hours
    #[arg(long, default_value_t = 72)]
    battle_hours: u64,

    /// Showdown phase duration in hours
    #[arg(long, default_value_t = 48)]
    showdown_hours: u64,

    /// Public base URL advertised in registration replies
    #[arg(long, default_value = "http://localhost:8080")]
    public_url: String,
}

// ── AppState ──────────────────────────────────────────────────────────────────

/// Shared handler state: the channel into the simulation actor plus the
/// advertised URLs.
#[derive(Clone)]
pub struct AppState {
    pub calls: mpsc::Sender<ArenaCall>,
    pub public_url: String,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    const HOUR_MS: u64 = 60 * 60 * 1_000;

    let snapshot_path = args.data_dir.join("profiles.json");
    let profiles = load_profiles(&snapshot_path)
        .with_context(|| format!("loading registry snapshot {}", snapshot_path.display()))?;
    info!(count = profiles.len(), "registry snapshot loaded");

    let obstacles: Vec<Obstacle> = match &args.obstacles {
        Some(path) => {
            let raw = std::fs::read(path)
                .with_context(|| format!("reading obstacle file {}", path.display()))?;
            serde_json::from_slice(&raw).context("parsing obstacle file")?
        }
        None => Vec::new(),
    };

    let mut builder = ArenaBuilder::new()
        .obstacles(obstacles)
        .phase_timings(PhaseTimings {
            lobby_ms:    args.lobby_hours * HOUR_MS,
            battle_ms:   args.battle_hours * HOUR_MS,
            showdown_ms: args.showdown_hours * HOUR_MS,
        })
        .profiles(profiles);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let arena = builder.build();

    // Background workers.
    let (relay_hook, relay_task) = spawn_relay(Box::new(LogRelay));
    let (batch_hook, batch_task) = spawn_event_writer(Box::new(LogEventSink));
    let (flush_tx, flush_task) = spawn_registry_writer(snapshot_path.clone());

    let mut hooks = HookSet::new();
    hooks.push(Box::new(relay_hook));
    hooks.push(Box::new(batch_hook));

    // The simulation actor.
    let (calls_tx, calls_rx) = mpsc::channel::<ArenaCall>(1_024);
    let actor_task = tokio::spawn(actor::run(
        arena,
        ObserverBridge::new(),
        hooks,
        calls_rx,
        flush_tx.clone(),
    ));

    // HTTP surface.
    let state = AppState {
        calls: calls_tx.clone(),
        public_url: args.public_url.clone(),
    };
    let app = Router::new()
        .route("/ipc", post(ipc::ipc_handler))
        .route("/ws", get(bridge::ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(bind = %args.bind, "arena server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    // Orderly teardown: stop the tick loop, flush the registry, close workers.
    info!("shutting down");
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    if calls_tx
        .send(ArenaCall::Shutdown { done: done_tx })
        .await
        .is_ok()
    {
        if let Ok(profiles) = done_rx.await {
            if let Err(error) = save_profiles(&snapshot_path, &profiles) {
                tracing::error!(%error, "final registry flush failed");
            }
        }
    }
    drop(flush_tx);
    let _ = actor_task.await;
    relay_task.abort();
    batch_task.abort();
    flush_task.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
