//! `WorldState` — positions, actions, and event history.

use rustc_hash::FxHashMap;

use arena_core::{AgentId, TimeMs, WorldMessage};
use arena_registry::{AgentProfile, AgentRegistry};

use crate::events::EventRing;

// ── AgentPosition ─────────────────────────────────────────────────────────────

/// Authoritative position of one in-world agent.  `y` stays 0 on the island
/// plane; it is carried for forward compatibility with elevated geometry.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPosition {
    pub agent_id: AgentId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation: f64,
    pub timestamp: TimeMs,
}

/// One row of a world snapshot: the profile joined with live state.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    #[serde(flatten)]
    pub profile: AgentProfile,
    pub position: AgentPosition,
    pub action: String,
}

// ── WorldState ────────────────────────────────────────────────────────────────

/// Positions and actions live only while the agent is in-world; the ring
/// keeps the recent non-transient event history for late joiners.
#[derive(Default)]
pub struct WorldState {
    positions: FxHashMap<AgentId, AgentPosition>,
    actions: FxHashMap<AgentId, String>,
    events: EventRing,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Application ───────────────────────────────────────────────────────

    /// Apply one validated message.
    ///
    /// Position and action messages overwrite live state; everything else
    /// lands in the history ring.  Registry `last_seen` is bumped for the
    /// actor in all cases (and both participants for battle events).
    pub fn apply(&mut self, msg: &WorldMessage, registry: &mut AgentRegistry) {
        let now = msg.timestamp();
        match msg {
            WorldMessage::Position { agent_id, x, y, z, rotation, timestamp } => {
                self.positions.insert(
                    agent_id.clone(),
                    AgentPosition {
                        agent_id: agent_id.clone(),
                        x: *x,
                        y: *y,
                        z: *z,
                        rotation: *rotation,
                        timestamp: *timestamp,
                    },
                );
                registry.touch(agent_id, now);
            }

            WorldMessage::Action { agent_id, action, .. } => {
                self.actions
                    .insert(agent_id.clone(), action.label().to_owned());
                registry.touch(agent_id, now);
            }

            WorldMessage::Join { agent_id, x, z, rotation, timestamp, .. } => {
                // Spawn coordinates were resolved at registration; a join for
                // an agent that already stands somewhere must not teleport it.
                self.positions
                    .entry(agent_id.clone())
                    .or_insert_with(|| AgentPosition {
                        agent_id: agent_id.clone(),
                        x: *x,
                        y: 0.0,
                        z: *z,
                        rotation: *rotation,
                        timestamp: *timestamp,
                    });
                self.actions
                    .entry(agent_id.clone())
                    .or_insert_with(|| "idle".to_owned());
                registry.touch(agent_id, now);
                self.events.push(msg.clone());
            }

            WorldMessage::Leave { agent_id, .. } => {
                self.positions.remove(agent_id);
                self.actions.remove(agent_id);
                self.events.push(msg.clone());
            }

            WorldMessage::Profile { agent_id, name, color, bio, capabilities, skills, .. } => {
                registry.apply_profile_update(
                    agent_id,
                    name.clone(),
                    color.clone(),
                    bio.clone(),
                    capabilities.clone(),
                    skills.clone(),
                    now,
                );
                self.events.push(msg.clone());
            }

            WorldMessage::Battle { update, .. } => {
                for participant in update.defeated() {
                    registry.touch(participant, now);
                }
                registry.touch(msg.agent_id(), now);
                self.events.push(msg.clone());
            }

            // Chat, emote, whisper, alliance, phase, bet, territory,
            // zone_damage: history plus a heartbeat for the actor.
            _ => {
                registry.touch(msg.agent_id(), now);
                self.events.push(msg.clone());
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn position_of(&self, id: &AgentId) -> Option<&AgentPosition> {
        self.positions.get(id)
    }

    pub fn action_of(&self, id: &AgentId) -> Option<&str> {
        self.actions.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.positions.contains_key(id)
    }

    /// Number of in-world agents.
    pub fn population(&self) -> usize {
        self.positions.len()
    }

    /// `(id, (x, z))` pairs for the per-tick grid rebuild.
    pub fn positions_xz(&self) -> impl Iterator<Item = (&AgentId, (f64, f64))> {
        self.positions.iter().map(|(id, p)| (id, (p.x, p.z)))
    }

    /// `(x, z)` list for spawn separation checks.
    pub fn occupied_points(&self) -> Vec<(f64, f64)> {
        self.positions.values().map(|p| (p.x, p.z)).collect()
    }

    /// Ids of every in-world agent.
    pub fn agent_ids(&self) -> impl Iterator<Item = &AgentId> {
        self.positions.keys()
    }

    /// Join online profiles with live positions and actions.  Agents whose
    /// profile went stale (no heartbeat for 5 minutes) are omitted even if
    /// a position lingers.
    pub fn snapshot(&self, registry: &AgentRegistry, now: TimeMs) -> Vec<AgentSnapshot> {
        let mut rows: Vec<AgentSnapshot> = self
            .positions
            .iter()
            .filter(|(id, _)| registry.is_online(id, now))
            .filter_map(|(id, position)| {
                let profile = registry.get(id)?.clone();
                Some(AgentSnapshot {
                    profile,
                    position: position.clone(),
                    action: self
                        .actions
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| "idle".to_owned()),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.profile.agent_id.cmp(&b.profile.agent_id));
        rows
    }

    /// Recent history, oldest first.
    pub fn events_since(&self, since: TimeMs, limit: usize) -> Vec<WorldMessage> {
        self.events.since(since, limit)
    }

    pub fn event_total(&self) -> u64 {
        self.events.total_count()
    }
}
