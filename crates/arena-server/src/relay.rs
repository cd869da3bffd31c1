//! External relay publishing.
//!
//! Applied events are mirrored to an external relay that gossips them to
//! remote peers.  Publishing is strictly fire-and-forget: the hook copies
//! events into a bounded channel on the simulation task, a worker drains it,
//! and every failure (full channel, sink error) is logged and dropped — the
//! tick never blocks on the relay.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use arena_core::{TickId, WorldMessage};
use arena_sim::ArenaHooks;

/// Destination of the validated message firehose.  The in-repo
/// implementation just logs; production wires a network client here.
pub trait RelaySink: Send + Sync {
    fn publish(&self, msg: &WorldMessage);
}

/// Log-only sink.
pub struct LogRelay;

impl RelaySink for LogRelay {
    fn publish(&self, msg: &WorldMessage) {
        debug!(kind = msg.kind(), agent = msg.agent_id().as_str(), "relay publish");
    }
}

/// The event hook living inside the simulation loop.
pub struct RelayHook {
    tx: mpsc::Sender<WorldMessage>,
    dropped: u64,
}

impl ArenaHooks for RelayHook {
    fn on_events(&mut self, tick: TickId, events: &[WorldMessage]) {
        for event in events {
            if self.tx.try_send(event.clone()).is_err() {
                self.dropped += 1;
                if self.dropped.is_multiple_of(100) || self.dropped == 1 {
                    warn!(tick = tick.0, dropped = self.dropped, "relay backlog, dropping events");
                }
            }
        }
    }

}

/// Spawn the relay worker; returns the hook to register with the arena.
pub fn spawn_relay(sink: Box<dyn RelaySink>) -> (RelayHook, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<WorldMessage>(4_096);
    let task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            sink.publish(&msg);
        }
    });
    (RelayHook { tx, dropped: 0 }, task)
}
