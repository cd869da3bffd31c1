//! The observer bridge: WebSocket spectators and per-tick fan-out.
//!
//! # Delivery model
//!
//! Each observer has a viewport anchor (optionally tracking a followed
//! agent).  Per tick, every observer gets either a **snapshot** (first tick
//! after connect — unfiltered — then every 5 s filtered to its area of
//! interest) or the tick's **deltas**, filtered per event:
//!
//! - whispers never leave the server
//! - lifecycle/battle/alliance/phase/territory/bet/zone events go to everyone
//! - chat and emotes reach observers within `CHAT_RANGE + AOI_RADIUS` of
//!   the speaker
//! - positions and actions reach observers whose AOI contains the actor
//!
//! Each delta is JSON-encoded exactly once per tick; observers share the
//! encoded string by refcount.  Outbound sends are `try_send` onto each
//! socket's bounded queue — a slow or dead spectator loses frames, never
//! the simulation's time.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use arena_core::constants::{
    AOI_RADIUS, CHAT_RANGE, MAX_INBOUND_FRAME_BYTES, MAX_VIEWPORT_ABS, SNAPSHOT_INTERVAL_TICKS,
};
use arena_core::{AgentId, Delivery, ObserverId, TickId, WorldMessage, geom};
use arena_sim::{Arena, TickOutput, WorldCommand};

use crate::AppState;
use crate::actor::ArenaCall;

// ── Client frames ─────────────────────────────────────────────────────────────

/// Observer→server messages.
#[derive(Clone, Debug)]
#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Reset the ack state to force a full snapshot next tick.
    Subscribe,
    RequestProfiles,
    #[serde(rename_all = "camelCase")]
    RequestProfile { agent_id: AgentId },
    RequestBattles,
    RequestRoomInfo,
    Viewport { x: f64, z: f64 },
    #[serde(rename_all = "camelCase")]
    Follow { agent_id: Option<AgentId> },
    #[serde(rename_all = "camelCase")]
    PlaceBet {
        agent_id: AgentId,
        amount: f64,
        tx_hash: String,
        wallet: String,
    },
}

// ── Observer state ────────────────────────────────────────────────────────────

struct Observer {
    tx: mpsc::Sender<Arc<str>>,
    view_x: f64,
    view_z: f64,
    follow: Option<AgentId>,
    /// 0 until the first snapshot is delivered (tick numbering starts at 1).
    last_ack_tick: TickId,
}

/// Owner of every connected observer.  Lives on the simulation task.
#[derive(Default)]
pub struct ObserverBridge {
    observers: FxHashMap<ObserverId, Observer>,
    next_id: u64,
}

impl ObserverBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Register a connection: room info and the battle list go out at once;
    /// the first tick after this sends the full snapshot.
    pub fn add(
        &mut self,
        tx: mpsc::Sender<Arc<str>>,
        follow: Option<AgentId>,
        arena: &Arena,
    ) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);

        let mut observer = Observer {
            tx,
            view_x: 0.0,
            view_z: 0.0,
            follow,
            last_ack_tick: TickId::ZERO,
        };
        if let Some(agent) = &observer.follow {
            if let Some(pos) = arena.world.position_of(agent) {
                observer.view_x = pos.x;
                observer.view_z = pos.z;
            }
        }
        send_frame(&observer.tx, room_info_frame(arena));
        send_frame(&observer.tx, battle_state_frame(arena));
        self.observers.insert(id, observer);
        debug!(observer = id.0, "observer connected");
        id
    }

    pub fn remove(&mut self, id: ObserverId) {
        if self.observers.remove(&id).is_some() {
            debug!(observer = id.0, "observer disconnected");
        }
    }

    /// Anchor each following observer to its agent's current position.
    pub fn update_follows(&mut self, arena: &Arena) {
        for observer in self.observers.values_mut() {
            let Some(agent) = &observer.follow else {
                continue;
            };
            if let Some(pos) = arena.world.position_of(agent) {
                observer.view_x = pos.x;
                observer.view_z = pos.z;
            }
        }
    }

    /// Per-tick fan-out (steps 6–7 of the tick contract).
    pub fn fan_out(&mut self, arena: &Arena, out: &TickOutput) {
        // Encode each broadcastable event once; all observers share the Arc.
        let outbound: Vec<(usize, Arc<str>)> = out
            .events
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.delivery() != Delivery::Never)
            .map(|(i, msg)| (i, world_frame(msg)))
            .collect();

        let snapshot_due = out.tick.is_multiple_of(SNAPSHOT_INTERVAL_TICKS);
        let mut gone = Vec::new();

        for (&id, observer) in self.observers.iter_mut() {
            let first = observer.last_ack_tick == TickId::ZERO;

            if first || snapshot_due {
                // First snapshot is unfiltered so the observer sees everyone.
                let viewport = (!first).then_some((observer.view_x, observer.view_z));
                let frame = snapshot_frame(arena, out.tick, viewport);
                if !try_deliver(&observer.tx, frame) {
                    gone.push(id);
                    continue;
                }
            } else {
                let aoi = arena
                    .grid
                    .query_radius(observer.view_x, observer.view_z, AOI_RADIUS);
                let mut dead = false;
                for (index, frame) in &outbound {
                    let msg = &out.events[*index];
                    if !delivers_to(msg, observer.view_x, observer.view_z, &aoi, arena) {
                        continue;
                    }
                    if !try_deliver(&observer.tx, frame.clone()) {
                        dead = true;
                        break;
                    }
                }
                if dead {
                    gone.push(id);
                    continue;
                }
            }

            if out.survival_changed && !try_deliver(&observer.tx, room_info_frame(arena)) {
                gone.push(id);
                continue;
            }
            observer.last_ack_tick = out.tick;
        }

        for id in gone {
            self.remove(id);
        }
    }

    /// Apply one client frame.
    pub fn handle_frame(&mut self, id: ObserverId, frame: ClientFrame, arena: &mut Arena) {
        let Some(observer) = self.observers.get_mut(&id) else {
            return;
        };
        match frame {
            ClientFrame::Subscribe => {
                observer.last_ack_tick = TickId::ZERO;
            }
            ClientFrame::RequestProfiles => {
                send_frame(
                    &observer.tx,
                    json_frame(&json!({ "type": "profiles", "profiles": arena.registry.snapshot() })),
                );
            }
            ClientFrame::RequestProfile { agent_id } => {
                let frame = match arena.registry.get(&agent_id) {
                    Some(profile) => json!({ "type": "profile", "profile": profile }),
                    None => json!({
                        "type":  "commandResult",
                        "ok":    false,
                        "error": "unknown_agent",
                    }),
                };
                send_frame(&observer.tx, json_frame(&frame));
            }
            ClientFrame::RequestBattles => {
                send_frame(&observer.tx, battle_state_frame(arena));
            }
            ClientFrame::RequestRoomInfo => {
                send_frame(&observer.tx, room_info_frame(arena));
            }
            ClientFrame::Viewport { x, z } => {
                let valid = geom::all_finite(&[x, z])
                    && x.abs() <= MAX_VIEWPORT_ABS
                    && z.abs() <= MAX_VIEWPORT_ABS;
                if valid {
                    observer.view_x = x;
                    observer.view_z = z;
                    observer.follow = None;
                } else {
                    send_frame(
                        &observer.tx,
                        json_frame(&json!({
                            "type":  "commandResult",
                            "ok":    false,
                            "error": "invalid_position",
                        })),
                    );
                }
            }
            ClientFrame::Follow { agent_id } => {
                observer.follow = agent_id;
            }
            ClientFrame::PlaceBet { agent_id, amount, tx_hash, wallet } => {
                let result = arena.execute(WorldCommand::PlaceBet {
                    agent_id,
                    amount_usd: amount,
                    tx_hash,
                    wallet_address: wallet,
                });
                let frame = match result {
                    Ok(body) => {
                        let mut v = json!({ "type": "commandResult", "ok": true });
                        merge_object(&mut v, body);
                        v
                    }
                    Err(reject) => json!({
                        "type":  "commandResult",
                        "ok":    false,
                        "error": reject.token(),
                        "hint":  reject.to_string(),
                    }),
                };
                send_frame(&observer.tx, json_frame(&frame));
            }
        }
    }
}

// ── Delivery rule ─────────────────────────────────────────────────────────────

/// Should `msg` reach an observer at `(view_x, view_z)` with AOI set `aoi`?
pub fn delivers_to(
    msg: &WorldMessage,
    view_x: f64,
    view_z: f64,
    aoi: &FxHashSet<AgentId>,
    arena: &Arena,
) -> bool {
    match msg.delivery() {
        Delivery::Never  => false,
        Delivery::Global => true,
        Delivery::ChatRange => arena
            .world
            .position_of(msg.agent_id())
            .is_some_and(|pos| {
                geom::within(view_x, view_z, pos.x, pos.z, CHAT_RANGE + AOI_RADIUS)
            }),
        Delivery::Spatial => aoi.contains(msg.agent_id()),
    }
}

// ── Frame encoding ────────────────────────────────────────────────────────────

fn json_frame(value: &serde_json::Value) -> Arc<str> {
    Arc::from(value.to_string())
}

fn world_frame(msg: &WorldMessage) -> Arc<str> {
    json_frame(&json!({ "type": "world", "data": msg }))
}

fn room_info_frame(arena: &Arena) -> Arc<str> {
    let mut v = json!({ "type": "roomInfo" });
    merge_object(&mut v, arena.room_info());
    json_frame(&v)
}

fn battle_state_frame(arena: &Arena) -> Arc<str> {
    json_frame(&json!({ "type": "battleState", "battles": arena.battles.views() }))
}

/// A snapshot frame; `viewport` of `None` means unfiltered.
fn snapshot_frame(arena: &Arena, tick: TickId, viewport: Option<(f64, f64)>) -> Arc<str> {
    let now = arena_core::WorldClock::wall_now();
    let mut agents = arena.world.snapshot(&arena.registry, now);
    if let Some((vx, vz)) = viewport {
        agents.retain(|row| {
            geom::within(vx, vz, row.position.x, row.position.z, AOI_RADIUS)
        });
    }
    json_frame(&json!({
        "type":     "snapshot",
        "tick":     tick,
        "agents":   agents,
        "battles":  arena.battles.views(),
        "phase":    arena.phases.state(),
        "survival": arena.survival.state(),
    }))
}

/// Best-effort bounded send; `false` means the receiver is gone.
fn try_deliver(tx: &mpsc::Sender<Arc<str>>, frame: Arc<str>) -> bool {
    match tx.try_send(frame) {
        Ok(())                                   => true,
        Err(mpsc::error::TrySendError::Full(_))  => true, // frame dropped, socket alive
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

fn send_frame(tx: &mpsc::Sender<Arc<str>>, frame: Arc<str>) {
    let _ = tx.try_send(frame);
}

/// Merge `extra`'s keys into `target` (both must be JSON objects).
fn merge_object(target: &mut serde_json::Value, extra: serde_json::Value) {
    if let (Some(target), serde_json::Value::Object(extra)) = (target.as_object_mut(), extra) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}

// ── WebSocket transport ───────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
pub struct WsQuery {
    /// Auto-follow this agent from connect.
    pub agent: Option<String>,
}

/// `GET /ws` upgrade handler.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let follow = query.agent.map(AgentId::from);
    ws.max_message_size(MAX_INBOUND_FRAME_BYTES)
        .on_upgrade(move |socket| observer_session(state, socket, follow))
}

async fn observer_session(state: AppState, socket: WebSocket, follow: Option<AgentId>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<str>>(256);

    let (id_tx, id_rx) = oneshot::channel();
    if state
        .calls
        .send(ArenaCall::ObserverJoin { tx, follow, reply: id_tx })
        .await
        .is_err()
    {
        return;
    }
    let Ok(id) = id_rx.await else {
        return;
    };

    // Writer half: drain the bounded queue onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.to_string())).await.is_err() {
                break;
            }
        }
    });

    // Reader half: parse frames and forward them to the actor.
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                if text.len() > MAX_INBOUND_FRAME_BYTES {
                    continue;
                }
                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => {
                        if state
                            .calls
                            .send(ArenaCall::ObserverFrame { id, frame })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(error) => {
                        debug!(observer = id.0, %error, "unparseable client frame");
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    let _ = state.calls.send(ArenaCall::ObserverGone { id }).await;
    writer.abort();
}
