//! The simulation actor.
//!
//! One task owns the [`Arena`] and the [`ObserverBridge`]; everything else
//! talks to it over a channel.  A `select!` loop interleaves the 50 ms tick
//! with incoming calls, so every state mutation is serialized by
//! construction — the concurrency model the rest of the workspace assumes.
//!
//! The actor is also the tick boundary of the error-handling contract:
//! every tick body, command execution, and observer frame runs under
//! `catch_unwind`, so a bug-class failure is logged with its tick number
//! and the loop keeps going — a single faulty command or hook must never
//! stall the simulation.

use std::panic::{self, AssertUnwindSafe};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{error, info};

use arena_core::constants::TICK_INTERVAL_MS;
use arena_core::{AgentId, ObserverId, RejectResult};
use arena_registry::AgentProfile;
use arena_sim::{Arena, HookSet, Reply, WorldCommand};

use crate::bridge::{ClientFrame, ObserverBridge};

/// One message into the simulation task.
pub enum ArenaCall {
    /// An external verb with a one-shot reply.
    Execute {
        cmd: WorldCommand,
        reply: oneshot::Sender<RejectResult<Reply>>,
    },
    /// A new observer connection; replies with its minted id.
    ObserverJoin {
        tx: mpsc::Sender<std::sync::Arc<str>>,
        follow: Option<AgentId>,
        reply: oneshot::Sender<ObserverId>,
    },
    /// A parsed client frame from an observer socket.
    ObserverFrame { id: ObserverId, frame: ClientFrame },
    /// The observer socket closed.
    ObserverGone { id: ObserverId },
    /// Stop ticking; reply with the final registry snapshot for the flush.
    Shutdown { done: oneshot::Sender<Vec<AgentProfile>> },
}

/// Run the actor until shutdown.  `flush_tx` feeds the registry disk writer.
pub async fn run(
    mut arena: Arena,
    mut bridge: ObserverBridge,
    mut hooks: HookSet,
    mut calls: mpsc::Receiver<ArenaCall>,
    flush_tx: mpsc::Sender<Vec<AgentProfile>>,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    // A long tick must not be skipped over — the next one starts immediately.
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let tick = arena.tick_id;
                let ticked = panic::catch_unwind(AssertUnwindSafe(|| {
                    let out = arena.tick(&mut hooks);
                    bridge.update_follows(&arena);
                    bridge.fan_out(&arena, &out);
                    out.registry_flush
                }));
                match ticked {
                    Ok(registry_flush) => {
                        arena.metrics.observer_count = bridge.len();
                        if let Some(profiles) = registry_flush {
                            // Full channel: the next due snapshot supersedes
                            // this one.
                            let _ = flush_tx.try_send(profiles);
                        }
                    }
                    Err(payload) => {
                        error!(
                            tick = tick.0,
                            panic = panic_message(payload.as_ref()),
                            "tick panicked; continuing"
                        );
                    }
                }
            }

            call = calls.recv() => match call {
                Some(ArenaCall::Execute { cmd, reply }) => {
                    let actor = cmd.agent_id().cloned();
                    match panic::catch_unwind(AssertUnwindSafe(|| arena.execute(cmd))) {
                        Ok(result) => {
                            let _ = reply.send(result);
                        }
                        Err(payload) => {
                            // Dropping the reply surfaces server_unavailable
                            // to this one caller; the loop lives on.
                            error!(
                                tick = arena.tick_id.0,
                                agent = actor.as_ref().map(AgentId::as_str).unwrap_or("-"),
                                panic = panic_message(payload.as_ref()),
                                "command execution panicked; continuing"
                            );
                        }
                    }
                }
                Some(ArenaCall::ObserverJoin { tx, follow, reply }) => {
                    let id = bridge.add(tx, follow, &arena);
                    let _ = reply.send(id);
                }
                Some(ArenaCall::ObserverFrame { id, frame }) => {
                    let handled = panic::catch_unwind(AssertUnwindSafe(|| {
                        bridge.handle_frame(id, frame, &mut arena)
                    }));
                    if let Err(payload) = handled {
                        error!(
                            tick = arena.tick_id.0,
                            observer = id.0,
                            panic = panic_message(payload.as_ref()),
                            "observer frame handling panicked; continuing"
                        );
                    }
                }
                Some(ArenaCall::ObserverGone { id }) => {
                    bridge.remove(id);
                }
                Some(ArenaCall::Shutdown { done }) => {
                    info!(tick = arena.tick_id.0, "simulation actor stopping");
                    let _ = done.send(arena.registry.snapshot());
                    break;
                }
                None => break,
            }
        }
    }
}

/// Best-effort text of a caught panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "opaque panic payload"
    }
}
