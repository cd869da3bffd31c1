//! Background persistence: the registry disk writer and the event batch
//! write-through to the external database.
//!
//! Both run off the simulation task.  The registry writer receives whole
//! profile snapshots (already debounced by the registry's dirty tracking)
//! and replaces the JSON file atomically.  The event batch hook converts
//! the per-tick event list into rows of the external store's schema and
//! hands them to an [`EventSink`] — a log stub here, a database client in
//! production.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use arena_core::{AgentId, TickId, TimeMs, WorldMessage};
use arena_registry::{AgentProfile, save_profiles};
use arena_sim::ArenaHooks;

// ── Registry writer ───────────────────────────────────────────────────────────

/// Spawn the disk writer; returns the snapshot channel.
pub fn spawn_registry_writer(
    path: PathBuf,
) -> (mpsc::Sender<Vec<AgentProfile>>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Vec<AgentProfile>>(4);
    let task = tokio::spawn(async move {
        while let Some(profiles) = rx.recv().await {
            match save_profiles(&path, &profiles) {
                Ok(())     => debug!(count = profiles.len(), "registry snapshot written"),
                Err(error) => error!(%error, "registry snapshot write failed"),
            }
        }
    });
    (tx, task)
}

// ── Event batch sink ──────────────────────────────────────────────────────────

/// One row of the external event store.
#[derive(Clone, Debug)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    pub round_id: u32,
    pub event_type: String,
    pub agent_id: AgentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_agent_id: Option<AgentId>,
    pub payload: serde_json::Value,
    pub timestamp: TimeMs,
}

/// Consumer of event batches.  Log stub in this repo.
pub trait EventSink: Send + Sync {
    fn write_batch(&self, rows: &[EventRow]);
}

pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn write_batch(&self, rows: &[EventRow]) {
        debug!(count = rows.len(), "event batch");
    }
}

/// Event hook: batches each tick's non-transient events into rows.
///
/// Tracks the current round by watching `phase` events go past, so rows are
/// attributed to the round they happened in.
pub struct EventBatchHook {
    tx: mpsc::Sender<Vec<EventRow>>,
    round_id: u32,
    dropped: u64,
}

impl ArenaHooks for EventBatchHook {
    fn on_events(&mut self, tick: TickId, events: &[WorldMessage]) {
        let mut rows = Vec::new();
        for event in events {
            if let WorldMessage::Phase { round_number, .. } = event {
                self.round_id = *round_number;
            }
            if event.is_transient() {
                continue;
            }
            rows.push(EventRow {
                round_id:        self.round_id,
                event_type:      event.kind().to_owned(),
                agent_id:        event.agent_id().clone(),
                target_agent_id: match event {
                    WorldMessage::Whisper { to_agent_id, .. } => Some(to_agent_id.clone()),
                    _ => None,
                },
                payload:         serde_json::to_value(event).unwrap_or_default(),
                timestamp:       event.timestamp(),
            });
        }
        if rows.is_empty() {
            return;
        }
        if self.tx.try_send(rows).is_err() {
            self.dropped += 1;
            warn!(tick = tick.0, dropped = self.dropped, "event sink backlog, dropping batch");
        }
    }
}

/// Spawn the batch writer; returns the hook to register with the arena.
pub fn spawn_event_writer(sink: Box<dyn EventSink>) -> (EventBatchHook, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Vec<EventRow>>(256);
    let task = tokio::spawn(async move {
        while let Some(rows) = rx.recv().await {
            sink.write_batch(&rows);
        }
    });
    (EventBatchHook { tx, round_id: 1, dropped: 0 }, task)
}
