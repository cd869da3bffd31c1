//! The `Arena` struct: one of everything, plus the tick loop.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rustc_hash::FxHashSet;
use serde_json::json;
use tracing::{debug, error, info, warn};

use arena_battle::{BattleManager, StartFacts};
use arena_core::constants::{
    MAX_AGENTS, TICK_INTERVAL_MS, TIMEOUT_SCAN_INTERVAL_MS,
};
use arena_core::message::AllianceAction;
use arena_core::{
    AgentId, BattleUpdate, EndReason, Reject, RejectResult, SimRng, TickId, TimeMs, WorldClock,
    WorldMessage,
};
use arena_phase::{AllianceBook, PhaseManager, SurvivalContract};
use arena_queue::CommandQueue;
use arena_registry::{AgentRegistry, RegisterSpec, profile::validate_wallet};
use arena_spatial::SpatialGrid;
use arena_world::{SpawnSelector, WorldState};

use crate::builder::ArenaConfig;
use crate::command::{RegisterArgs, Reply, WorldCommand};
use crate::hooks::ArenaHooks;
use crate::metrics::SimMetrics;

// ── TickOutput ────────────────────────────────────────────────────────────────

/// What one tick produced, handed to the observer bridge for fan-out.
pub struct TickOutput {
    pub tick: TickId,
    pub now: TimeMs,
    /// Applied events in enqueue order.
    pub events: Vec<WorldMessage>,
    /// The survival contract started, settled, or reset since the last tick;
    /// the bridge pushes fresh room info to every observer.
    pub survival_changed: bool,
    /// A debounced registry snapshot fell due this tick; the server forwards
    /// it to the disk writer.
    pub registry_flush: Option<Vec<arena_registry::AgentProfile>>,
    pub duration_ms: f64,
    pub slow: bool,
}

// ── Arena ─────────────────────────────────────────────────────────────────────

/// The composition root.  Fields are public in the same spirit as the rest
/// of the workspace: everything runs on one task, and the server layer reads
/// positions, battles, and metrics directly when encoding observer frames.
pub struct Arena {
    pub config: ArenaConfig,
    pub clock: WorldClock,
    pub tick_id: TickId,
    pub registry: AgentRegistry,
    pub world: WorldState,
    pub grid: SpatialGrid,
    pub queue: CommandQueue,
    pub battles: BattleManager,
    pub phases: PhaseManager,
    pub survival: SurvivalContract,
    pub alliances: AllianceBook,
    pub metrics: SimMetrics,
    pub(crate) spawner: SpawnSelector,
    pub(crate) rng: SimRng,
    last_timeout_scan: TimeMs,
    survival_dirty: bool,
    /// Bet transaction hashes accepted but not yet settled externally.
    tx_in_flight: FxHashSet<String>,
}

impl Arena {
    /// Construct via [`ArenaBuilder`][crate::ArenaBuilder].
    pub(crate) fn from_parts(
        config: ArenaConfig,
        registry: AgentRegistry,
        mut clock: WorldClock,
    ) -> Self {
        let now = clock.stamp();
        let mut queue = CommandQueue::new();
        queue.set_obstacles(config.obstacles.clone());
        let rng = match config.seed {
            Some(seed) => SimRng::new(seed),
            None       => SimRng::from_entropy(),
        };
        Self {
            phases: PhaseManager::new(config.phase_timings, now),
            config,
            clock,
            // Tick numbering starts at 1: observers use lastAckTick = 0 as
            // the "never acked, send a full snapshot" sentinel.
            tick_id: TickId(1),
            registry,
            world: WorldState::new(),
            grid: SpatialGrid::new(),
            queue,
            battles: BattleManager::new(),
            survival: SurvivalContract::new(),
            alliances: AllianceBook::new(),
            metrics: SimMetrics::default(),
            spawner: SpawnSelector::new(),
            rng,
            last_timeout_scan: now,
            survival_dirty: false,
            tx_in_flight: FxHashSet::default(),
        }
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// One simulation step, strictly ordered:
    ///
    /// 1. internal timers (battle timeout scan, phase tick, round-end check)
    /// 2. drain the command queue
    /// 3. apply each message to world state
    /// 4. event hooks (relay, persistence batch, metrics)
    /// 5. spatial grid rebuild
    ///
    /// Viewport tracking and observer fan-out (steps 6–7 of the contract)
    /// are driven by the server from the returned [`TickOutput`].
    pub fn tick<H: ArenaHooks>(&mut self, hooks: &mut H) -> TickOutput {
        let started = Instant::now();
        let now = self.clock.stamp();
        let tick = self.tick_id;
        hooks.on_tick_start(tick, now);

        self.run_timers(now);

        let batch = self.queue.drain();
        let mut events = Vec::with_capacity(batch.len());
        for msg in batch {
            // Bug-class isolation: a panic while applying one command is
            // caught here so the rest of the batch still lands.
            let applied = {
                let world = &mut self.world;
                let registry = &mut self.registry;
                panic::catch_unwind(AssertUnwindSafe(|| world.apply(&msg, registry)))
            };
            match applied {
                Ok(()) => {
                    self.metrics.commands_applied += 1;
                    events.push(msg);
                }
                Err(_) => {
                    self.metrics.commands_faulted += 1;
                    error!(
                        tick = tick.0,
                        agent = msg.agent_id().as_str(),
                        kind = msg.kind(),
                        "apply panicked; command dropped"
                    );
                }
            }
        }

        hooks.on_events(tick, &events);

        self.grid.rebuild(self.world.positions_xz());

        let duration_ms = started.elapsed().as_secs_f64() * 1_000.0;
        let slow = duration_ms > TICK_INTERVAL_MS as f64;
        if slow {
            self.metrics.slow_ticks += 1;
            warn!(tick = tick.0, duration_ms, "slow tick");
        }
        self.metrics.ticks += 1;
        self.metrics.last_tick_ms = duration_ms;
        self.metrics.active_agents = self.world.population();
        self.metrics.active_battles = self.battles.active_count();
        self.metrics.queue_depth = self.queue.len();

        hooks.on_tick_end(tick, &self.registry, &self.metrics);
        self.tick_id = tick.next();

        TickOutput {
            tick,
            now,
            events,
            survival_changed: std::mem::take(&mut self.survival_dirty),
            registry_flush: self.registry.snapshot_if_due(now),
            duration_ms,
            slow,
        }
    }

    fn run_timers(&mut self, now: TimeMs) {
        // Battle turn timeouts, scanned once per second.
        if now.since(self.last_timeout_scan) >= TIMEOUT_SCAN_INTERVAL_MS {
            self.last_timeout_scan = now;
            let updates = self.battles.check_timeouts(now);
            if !updates.is_empty() {
                self.ingest_battle_updates(updates, AgentId::system());
            }
        }

        // Phase timer; a transition re-caps alliances.
        if let Some(phase) = self.phases.tick(now) {
            info!(tick = self.tick_id.0, %phase, "phase transition");
            self.emit_phase_event();
            let cap = self.phases.alliance_cap();
            for (alliance_id, dropped) in self.alliances.trim_to_cap(cap) {
                let timestamp = self.clock.stamp();
                self.queue.push_trusted(WorldMessage::Alliance {
                    agent_id: AgentId::system(),
                    alliance_id,
                    action: AllianceAction::Trimmed,
                    members: dropped,
                    timestamp,
                });
            }
        }

        // Survival round timer.
        let living = self.living_agents();
        if self.survival.check_timer(now, &living).is_some() {
            info!(tick = self.tick_id.0, "survival round timer expired");
            self.survival_dirty = true;
        }
    }

    // ── Command execution ─────────────────────────────────────────────────

    /// Judge and apply one external verb.  Policy rejections mutate nothing
    /// (beyond the rejection counter) and carry a stable wire token.
    pub fn execute(&mut self, cmd: WorldCommand) -> RejectResult<Reply> {
        let actor = cmd.agent_id().cloned();
        let result = self.dispatch(cmd);
        if let Err(reject) = &result {
            self.metrics.commands_rejected += 1;
            debug!(
                tick = self.tick_id.0,
                agent = actor.as_ref().map(AgentId::as_str).unwrap_or("-"),
                token = reject.token(),
                "command rejected"
            );
        }
        result
    }

    fn dispatch(&mut self, cmd: WorldCommand) -> RejectResult<Reply> {
        let now = self.clock.stamp();
        match cmd {
            WorldCommand::AutoConnect { args } => {
                let agent_id = self.mint_agent_id();
                self.register_agent(agent_id, args, now)
            }
            WorldCommand::Register { agent_id, args } => {
                if !AgentId::is_well_formed(agent_id.as_str()) {
                    return Err(Reject::InvalidAgentId);
                }
                self.register_agent(agent_id, args, now)
            }
            WorldCommand::Leave { agent_id } => self.leave_agent(&agent_id, "left", now),

            WorldCommand::Move { agent_id, x, y, z, rotation } => {
                self.gate_actor(&agent_id, now)?;
                if self.battles.is_engaged(&agent_id) {
                    return Err(Reject::AgentInBattle);
                }
                let timestamp = self.clock.stamp();
                self.queue.enqueue(
                    WorldMessage::Position { agent_id, x, y, z, rotation, timestamp },
                    now,
                )?;
                Ok(json!({}))
            }

            WorldCommand::Action { agent_id, action } => {
                self.gate_actor(&agent_id, now)?;
                let timestamp = self.clock.stamp();
                self.queue
                    .enqueue(WorldMessage::Action { agent_id, action, timestamp }, now)?;
                Ok(json!({}))
            }

            WorldCommand::Chat { agent_id, text } => {
                self.gate_actor(&agent_id, now)?;
                let timestamp = self.clock.stamp();
                // Long chat is truncated rather than rejected at the IPC
                // surface; the hard 500 limit still guards direct enqueues.
                let text = truncate_chars(&text, arena_core::constants::MAX_CHAT_LEN);
                self.queue
                    .enqueue(WorldMessage::Chat { agent_id, text, timestamp }, now)?;
                Ok(json!({}))
            }

            WorldCommand::Emote { agent_id, emote } => {
                self.gate_actor(&agent_id, now)?;
                let timestamp = self.clock.stamp();
                self.queue
                    .enqueue(WorldMessage::Emote { agent_id, emote, timestamp }, now)?;
                Ok(json!({}))
            }

            WorldCommand::Whisper { agent_id, to_agent_id, text } => {
                self.gate_actor(&agent_id, now)?;
                if !self.registry.contains(&to_agent_id) {
                    return Err(Reject::UnknownTargetAgent);
                }
                let timestamp = self.clock.stamp();
                self.queue.enqueue(
                    WorldMessage::Whisper { agent_id, to_agent_id, text, timestamp },
                    now,
                )?;
                Ok(json!({}))
            }

            WorldCommand::Territory { agent_id, x, z, radius, label } => {
                self.gate_actor(&agent_id, now)?;
                if !arena_core::geom::all_finite(&[x, z, radius]) {
                    return Err(Reject::InvalidPosition);
                }
                if !arena_core::geom::in_bounds(x, z) {
                    return Err(Reject::OutOfBounds);
                }
                if radius <= 0.0 || radius > 50.0 {
                    return Err(Reject::BadArgs("territory radius must be in (0, 50]".into()));
                }
                let timestamp = self.clock.stamp();
                self.queue.enqueue(
                    WorldMessage::Territory { agent_id, x, z, radius, label, timestamp },
                    now,
                )?;
                Ok(json!({}))
            }

            WorldCommand::BattleStart { agent_id, target_agent_id } => {
                self.start_battle(agent_id, target_agent_id, now)
            }

            WorldCommand::BattleIntent { agent_id, battle_id, intent } => {
                self.gate_actor(&agent_id, now)?;
                if intent.is_violent() && self.registry.has_refused(&agent_id) {
                    return Err(Reject::AgentRefusedViolence);
                }
                let updates = self
                    .battles
                    .submit_intent(&agent_id, &battle_id, intent, now)?;
                self.ingest_battle_updates(updates, agent_id);
                Ok(json!({ "accepted": true }))
            }

            WorldCommand::BattleSurrender { agent_id } => {
                self.gate_actor(&agent_id, now)?;
                let updates = self.battles.surrender(&agent_id, now)?;
                self.ingest_battle_updates(updates, agent_id);
                Ok(json!({}))
            }

            WorldCommand::BattleTruce { agent_id } => {
                self.gate_actor(&agent_id, now)?;
                let (accepted, updates) = self.battles.propose_truce(&agent_id, now)?;
                self.ingest_battle_updates(updates, agent_id);
                Ok(json!({ "accepted": accepted }))
            }

            WorldCommand::AllianceForm { agent_id } => {
                self.gate_actor(&agent_id, now)?;
                let alliance_id = self.alliances.form(&agent_id, now)?;
                let timestamp = self.clock.stamp();
                self.queue.push_trusted(WorldMessage::Alliance {
                    agent_id:    agent_id.clone(),
                    alliance_id: alliance_id.clone(),
                    action:      AllianceAction::Formed,
                    members:     vec![agent_id],
                    timestamp,
                });
                Ok(json!({ "allianceId": alliance_id }))
            }

            WorldCommand::AllianceJoin { agent_id, alliance_id } => {
                self.gate_actor(&agent_id, now)?;
                let cap = self.phases.alliance_cap();
                self.alliances.join(&agent_id, &alliance_id, cap)?;
                let members = self
                    .alliances
                    .get(&alliance_id)
                    .map(|a| a.members.clone())
                    .unwrap_or_default();
                let timestamp = self.clock.stamp();
                self.queue.push_trusted(WorldMessage::Alliance {
                    agent_id,
                    alliance_id,
                    action: AllianceAction::Joined,
                    members,
                    timestamp,
                });
                Ok(json!({}))
            }

            WorldCommand::AllianceLeave { agent_id } => {
                self.gate_actor(&agent_id, now)?;
                let (alliance_id, members) = self
                    .alliances
                    .remove_everywhere(&agent_id)
                    .ok_or_else(|| Reject::BadArgs("not in an alliance".into()))?;
                let timestamp = self.clock.stamp();
                self.queue.push_trusted(WorldMessage::Alliance {
                    agent_id,
                    alliance_id,
                    action: AllianceAction::Left,
                    members,
                    timestamp,
                });
                Ok(json!({}))
            }

            WorldCommand::SurvivalRefuse { agent_id, refuse } => {
                self.gate_actor(&agent_id, now)?;
                if !self.registry.set_prize_refusal(&agent_id, refuse, now) {
                    return Err(Reject::UnknownAgent);
                }
                self.survival.record_refusal(&agent_id, refuse);
                let living = self.living_agents();
                if self.survival.reevaluate(&living, now).is_some() {
                    self.survival_dirty = true;
                }
                Ok(json!({ "refused": refuse }))
            }

            WorldCommand::PlaceBet { agent_id, amount_usd, tx_hash, wallet_address } => {
                self.place_bet(agent_id, amount_usd, tx_hash, wallet_address, now)
            }

            // ── Queries ───────────────────────────────────────────────────
            WorldCommand::WorldState => Ok(json!({
                "agents":   self.world.snapshot(&self.registry, now),
                "battles":  self.battles.views(),
                "phase":    self.phases.state(),
                "survival": self.survival.state(),
            })),

            WorldCommand::Battles => Ok(json!({ "battles": self.battles.views() })),

            WorldCommand::RoomInfo => Ok(self.room_info()),

            WorldCommand::RoomEvents { since, limit } => {
                let limit = limit.unwrap_or(50).min(arena_core::constants::EVENT_RING_CAPACITY);
                let events = self
                    .world
                    .events_since(since.unwrap_or(TimeMs::ZERO), limit);
                Ok(json!({ "events": events }))
            }

            WorldCommand::RoomSkills => {
                let skills: Vec<serde_json::Value> = self
                    .registry
                    .iter()
                    .filter(|p| !p.skills.is_empty())
                    .map(|p| json!({ "agentId": p.agent_id, "skills": p.skills }))
                    .collect();
                Ok(json!({ "skills": skills }))
            }

            WorldCommand::SurvivalStatus => Ok(json!({ "survival": self.survival.state() })),

            WorldCommand::Profile { agent_id } => {
                let profile = self.registry.get(&agent_id).ok_or(Reject::UnknownAgent)?;
                Ok(json!({ "profile": profile }))
            }

            WorldCommand::Profiles => Ok(json!({ "profiles": self.registry.snapshot() })),

            WorldCommand::Describe => Ok(describe()),

            // ── Admin ─────────────────────────────────────────────────────
            WorldCommand::SurvivalStart { prize_pool_usd, duration_ms } => {
                self.survival.start(prize_pool_usd, duration_ms, now)?;
                self.survival_dirty = true;
                self.emit_phase_event();
                info!(prize_pool_usd, ?duration_ms, "survival round started");
                Ok(json!({ "survival": self.survival.state() }))
            }

            WorldCommand::SurvivalReset => {
                self.reset_round(now);
                Ok(json!({ "survival": self.survival.state() }))
            }

            WorldCommand::AdminRevive { agent_id } => {
                if !self.registry.revive(&agent_id, now) {
                    return Err(Reject::UnknownAgent);
                }
                info!(agent = agent_id.as_str(), "admin revive");
                Ok(json!({}))
            }
        }
    }

    // ── Registration ──────────────────────────────────────────────────────

    fn mint_agent_id(&mut self) -> AgentId {
        loop {
            let candidate = AgentId::from(format!("agent-{}", self.rng.id_suffix(6)));
            if !self.registry.contains(&candidate) {
                return candidate;
            }
        }
    }

    fn register_agent(
        &mut self,
        agent_id: AgentId,
        args: RegisterArgs,
        now: TimeMs,
    ) -> RejectResult<Reply> {
        let wallet = args.wallet_address.clone().unwrap_or_default();
        validate_wallet(&wallet)?;
        if !self.survival.accepts_registration() {
            return Err(Reject::SurvivalRoundClosed);
        }
        // Existing ids go through the liveness gate (ban, permanent death).
        self.registry.check_alive(&agent_id, now)?;
        if !self.world.contains(&agent_id) && self.world.population() >= MAX_AGENTS {
            return Err(Reject::RoomFull);
        }

        let profile = self
            .registry
            .register(
                RegisterSpec {
                    agent_id:       agent_id.clone(),
                    wallet_address: wallet,
                    name:           args.name,
                    color:          args.color,
                    bio:            args.bio,
                    capabilities:   args.capabilities,
                    skills:         args.skills,
                },
                now,
            )?
            .clone();

        let explicit = match (args.x, args.z) {
            (Some(x), Some(z)) => Some((x, z, args.rotation.unwrap_or(0.0))),
            _ => None,
        };
        let spawn = self.spawner.select(
            explicit,
            &self.world.occupied_points(),
            &self.config.obstacles,
            &mut self.rng,
            now,
        );

        let timestamp = self.clock.stamp();
        self.queue.push_trusted(WorldMessage::Join {
            agent_id: agent_id.clone(),
            name: profile.name.clone(),
            color: profile.color.clone(),
            x: spawn.x,
            z: spawn.z,
            rotation: spawn.rotation,
            timestamp,
        });

        Ok(json!({
            "agentId": agent_id,
            "profile": profile,
            "spawn":   { "x": spawn.x, "z": spawn.z, "rotation": spawn.rotation },
        }))
    }

    fn leave_agent(&mut self, agent_id: &AgentId, reason: &str, now: TimeMs) -> RejectResult<Reply> {
        if !self.registry.contains(agent_id) {
            return Err(Reject::UnknownAgent);
        }
        if let Some(ended) = self.battles.handle_agent_leave(agent_id) {
            self.ingest_battle_updates(vec![ended], agent_id.clone());
        }
        self.queue.prune_agent(agent_id);
        let timestamp = self.clock.stamp();
        self.queue.push_trusted(WorldMessage::Leave {
            agent_id:  agent_id.clone(),
            reason:    Some(reason.to_owned()),
            timestamp,
        });
        // Departure can leave a last survivor standing.
        let living: Vec<AgentId> = self
            .living_agents()
            .into_iter()
            .filter(|id| id != agent_id)
            .collect();
        if self.survival.reevaluate(&living, now).is_some() {
            self.survival_dirty = true;
        }
        Ok(json!({}))
    }

    // ── Combat orchestration ──────────────────────────────────────────────

    fn start_battle(
        &mut self,
        agent_id: AgentId,
        target_agent_id: AgentId,
        now: TimeMs,
    ) -> RejectResult<Reply> {
        self.gate_actor(&agent_id, now)?;
        if !self.survival.combat_open() {
            return Err(Reject::SurvivalRoundClosed);
        }
        if self.registry.contains(&target_agent_id) {
            self.registry.check_alive(&target_agent_id, now)?;
        }

        let power_of = |registry: &AgentRegistry, id: &AgentId| {
            registry.get(id).map_or(1.0, |p| p.combat.power())
        };
        let facts = StartFacts {
            challenger_pos:     self.world.position_of(&agent_id).map(|p| (p.x, p.z)),
            target_pos:         self.world.position_of(&target_agent_id).map(|p| (p.x, p.z)),
            challenger_power:   power_of(&self.registry, &agent_id),
            target_power:       power_of(&self.registry, &target_agent_id),
            combat_allowed:     self.phases.combat_allowed(),
            challenger_refused: self.registry.has_refused(&agent_id),
            target_refused:     self.registry.has_refused(&target_agent_id),
            allied:             self.alliances.are_allied(&agent_id, &target_agent_id),
            challenger:         agent_id.clone(),
            target:             target_agent_id,
        };

        let started = self.battles.start(facts, now)?;
        let battle_id = started.battle_id().clone();
        self.ingest_battle_updates(vec![started], agent_id);
        let view = self.battles.get(&battle_id).map(|record| record.view());
        Ok(json!({ "battleId": battle_id, "battle": view }))
    }

    /// Wrap battle updates as world messages and run termination side
    /// effects: alliance removal, permanent death, the trailing `leave`,
    /// winner accounting, and survival re-evaluation.
    fn ingest_battle_updates(&mut self, updates: Vec<BattleUpdate>, actor: AgentId) {
        for update in updates {
            let timestamp = self.clock.stamp();
            let ended = match &update {
                BattleUpdate::Ended { reason, winner_id, defeated_ids, .. } => {
                    Some((*reason, winner_id.clone(), defeated_ids.clone()))
                }
                _ => None,
            };
            self.queue.push_trusted(WorldMessage::Battle {
                agent_id: actor.clone(),
                update,
                timestamp,
            });

            let Some((reason, winner, defeated)) = ended else {
                continue;
            };
            if defeated.is_empty() {
                continue;
            }

            for dead in &defeated {
                if let Some((alliance_id, members)) = self.alliances.remove_everywhere(dead) {
                    let ts = self.clock.stamp();
                    self.queue.push_trusted(WorldMessage::Alliance {
                        agent_id: dead.clone(),
                        alliance_id,
                        action: AllianceAction::Left,
                        members,
                        timestamp: ts,
                    });
                }
                self.registry.record_defeat(dead, timestamp);
                self.queue.prune_agent(dead);
                let leave_ts = self.clock.stamp_after(timestamp);
                self.queue.push_trusted(WorldMessage::Leave {
                    agent_id:  dead.clone(),
                    reason:    Some("defeated".to_owned()),
                    timestamp: leave_ts,
                });
                info!(agent = dead.as_str(), "permanent death");
            }
            if reason == EndReason::Ko {
                if let Some(winner) = &winner {
                    self.registry
                        .record_victory(winner, defeated.len().max(1) as u32, timestamp);
                }
            }

            let living = self.living_agents();
            if self.survival.reevaluate(&living, timestamp).is_some() {
                self.survival_dirty = true;
            }
        }
    }

    // ── Betting ───────────────────────────────────────────────────────────

    fn place_bet(
        &mut self,
        agent_id: AgentId,
        amount_usd: f64,
        tx_hash: String,
        wallet_address: String,
        now: TimeMs,
    ) -> RejectResult<Reply> {
        if !self.survival.accepts_bets() {
            return Err(Reject::SurvivalRoundClosed);
        }
        if !self.registry.contains(&agent_id) {
            return Err(Reject::UnknownTargetAgent);
        }
        validate_wallet(&wallet_address)?;
        if !amount_usd.is_finite() || amount_usd <= 0.0 {
            return Err(Reject::BadArgs("bet amount must be a positive number".into()));
        }
        if tx_hash.trim().is_empty() {
            return Err(Reject::BadArgs("txHash is required".into()));
        }
        if !self.tx_in_flight.insert(tx_hash.clone()) {
            return Err(Reject::DuplicateTxHashInFlight);
        }

        self.survival.add_to_pool(amount_usd);
        let timestamp = self.clock.stamp();
        self.queue.push_trusted(WorldMessage::Bet {
            agent_id,
            amount_usd,
            tx_hash,
            wallet_address,
            timestamp,
        });
        Ok(json!({
            "accepted":     true,
            "prizePoolUsd": self.survival.state().prize_pool_usd,
        }))
    }

    // ── Round reset ───────────────────────────────────────────────────────

    fn reset_round(&mut self, now: TimeMs) {
        info!(tick = self.tick_id.0, "survival round reset");
        let everyone: Vec<AgentId> = self.world.agent_ids().cloned().collect();
        for agent_id in everyone {
            self.queue.prune_agent(&agent_id);
            let timestamp = self.clock.stamp();
            self.queue.push_trusted(WorldMessage::Leave {
                agent_id,
                reason: Some("round reset".to_owned()),
                timestamp,
            });
        }
        self.battles.clear();
        self.alliances.clear();
        self.registry.revive_all(now);
        self.survival.reset();
        self.tx_in_flight.clear();
        self.phases.advance_round(now);
        self.survival_dirty = true;
        self.emit_phase_event();
    }

    // ── Shared helpers ────────────────────────────────────────────────────

    /// The common gate for action verbs: must be registered, not banned,
    /// not dead (temporarily or permanently).
    fn gate_actor(&self, agent_id: &AgentId, now: TimeMs) -> RejectResult<()> {
        if !self.registry.contains(agent_id) {
            return Err(Reject::UnknownAgent);
        }
        self.registry.check_alive(agent_id, now)
    }

    /// In-world agents that are not permanently dead.
    fn living_agents(&self) -> Vec<AgentId> {
        self.world
            .agent_ids()
            .filter(|id| {
                self.registry
                    .get(id)
                    .is_none_or(|p| !p.combat.permanently_dead)
            })
            .cloned()
            .collect()
    }

    fn emit_phase_event(&mut self) {
        let state = self.phases.state();
        let timestamp = self.clock.stamp();
        self.queue.push_trusted(WorldMessage::Phase {
            agent_id:         AgentId::system(),
            phase:            state.phase,
            round_number:     state.round_number,
            safe_zone_radius: state.safe_zone_radius,
            ends_at:          state.ends_at,
            timestamp,
        });
    }

    /// Room metadata for connects and `room-info` queries.
    pub fn room_info(&self) -> Reply {
        use arena_core::constants as c;
        json!({
            "worldSize":        c::WORLD_SIZE,
            "battleStartRange": c::BATTLE_START_RANGE,
            "chatRange":        c::CHAT_RANGE,
            "aoiRadius":        c::AOI_RADIUS,
            "proximityRadius":  c::PROXIMITY_RADIUS,
            "tickRate":         c::TICK_RATE,
            "turnTimeoutMs":    c::TURN_TIMEOUT_MS,
            "maxAgents":        c::MAX_AGENTS,
            "population":       self.world.population(),
            "phase":            self.phases.state(),
            "survival":         self.survival.state(),
            "metrics":          self.metrics,
        })
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    text.chars().take(max).collect()
}

/// Static command catalogue returned by `describe`.
fn describe() -> Reply {
    json!({
        "commands": [
            { "command": "auto-connect",           "args": "name?, walletAddress, capabilities?, skills?, color?" },
            { "command": "register",               "args": "agentId, walletAddress, name?, color?, bio?" },
            { "command": "world-move",             "args": "agentId, x, y, z, rotation" },
            { "command": "world-action",           "args": "agentId, action ∈ {walk, idle, wave, pinch, talk, dance, backflip, spin}" },
            { "command": "world-chat",             "args": "agentId, text (≤500 chars)" },
            { "command": "world-emote",            "args": "agentId, emote ∈ {happy, thinking, surprised, laugh}" },
            { "command": "world-whisper",          "args": "agentId, toAgentId, text" },
            { "command": "world-territory",        "args": "agentId, x, z, radius, label?" },
            { "command": "world-battle-start",     "args": "agentId, targetAgentId (range ≤ 12)" },
            { "command": "world-battle-intent",    "args": "agentId, battleId, intent ∈ {approach, strike, guard, feint, retreat}" },
            { "command": "world-battle-surrender", "args": "agentId" },
            { "command": "world-battle-truce",     "args": "agentId" },
            { "command": "world-alliance-form",    "args": "agentId" },
            { "command": "world-alliance-join",    "args": "agentId, allianceId" },
            { "command": "world-alliance-leave",   "args": "agentId" },
            { "command": "survival-refuse",        "args": "agentId, refuse?" },
            { "command": "world-leave",            "args": "agentId" },
            { "command": "world-state",            "args": "" },
            { "command": "world-battles",          "args": "" },
            { "command": "room-info",              "args": "" },
            { "command": "room-events",            "args": "since?, limit?" },
            { "command": "room-skills",            "args": "" },
            { "command": "survival-status",        "args": "" },
            { "command": "profile",                "args": "agentId" },
            { "command": "profiles",               "args": "" },
        ],
    })
}
