//! The in-memory profile store.
//!
//! All reads and writes happen on the simulation task; the background
//! flusher only ever sees cloned snapshots, so there is no shared mutable
//! state.  Dirty tracking lives here: every mutation records a dirty stamp,
//! and the flusher asks `snapshot_if_due` once per tick.

use rustc_hash::{FxHashMap, FxHashSet};

use arena_core::constants::{ONLINE_WINDOW_MS, REGISTRY_FLUSH_DEBOUNCE_MS};
use arena_core::{AgentId, Reject, RejectResult, SkillSpec, TimeMs};

use crate::profile::{AgentProfile, RegisterSpec, validate_wallet};

/// Owner of every [`AgentProfile`], keyed by agent id with a wallet index.
///
/// The wallet index is append-only: every id that ever claimed a wallet
/// stays bound to it, so a permanently-dead profile keeps its wallet locked
/// no matter what registers afterwards.
#[derive(Default)]
pub struct AgentRegistry {
    profiles: FxHashMap<AgentId, AgentProfile>,
    wallet_index: FxHashMap<String, Vec<AgentId>>,
    banned: FxHashSet<AgentId>,
    dirty_since: Option<TimeMs>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a disk snapshot at startup.
    pub fn from_profiles(profiles: Vec<AgentProfile>) -> Self {
        let mut registry = Self::new();
        for profile in profiles {
            if !profile.wallet_address.is_empty() {
                registry.bind_wallet(profile.wallet_address.clone(), profile.agent_id.clone());
            }
            registry.profiles.insert(profile.agent_id.clone(), profile);
        }
        registry
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn get(&self, id: &AgentId) -> Option<&AgentProfile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentProfile> {
        self.profiles.values()
    }

    /// `last_seen` within the 5-minute window counts as online.
    pub fn is_online(&self, id: &AgentId, now: TimeMs) -> bool {
        self.profiles
            .get(id)
            .is_some_and(|p| now.since(p.last_seen) <= ONLINE_WINDOW_MS)
    }

    /// Every id ever bound to `wallet`, in binding order.
    pub fn wallet_ids(&self, wallet: &str) -> &[AgentId] {
        self.wallet_index.get(wallet).map_or(&[], Vec::as_slice)
    }

    // ── Liveness gate ─────────────────────────────────────────────────────

    /// The gate every inbound command passes: ban, permanent death, and the
    /// temporary death window, in that order.
    pub fn check_alive(&self, id: &AgentId, now: TimeMs) -> RejectResult<()> {
        if self.banned.contains(id) {
            return Err(Reject::AgentBanned);
        }
        let Some(profile) = self.profiles.get(id) else {
            return Ok(()); // unknown ids are judged elsewhere
        };
        if profile.combat.permanently_dead {
            return Err(Reject::AgentDeadPermanent);
        }
        if profile.combat.is_dead_at(now) {
            return Err(Reject::AgentDead { dead_until: profile.combat.dead_until });
        }
        Ok(())
    }

    /// True when any id ever bound to `wallet` is permanently dead — the
    /// whole wallet is locked out, not just the original agent id.
    pub fn wallet_locked(&self, wallet: &str) -> bool {
        self.wallet_ids(wallet).iter().any(|id| {
            self.profiles
                .get(id)
                .is_some_and(|p| p.combat.permanently_dead)
        })
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Create or merge a profile.  Wallet shape, wallet lockout, and the
    /// one-living-agent-per-wallet rule are enforced here; room capacity and
    /// survival gating are the caller's.
    pub fn register(&mut self, spec: RegisterSpec, now: TimeMs) -> RejectResult<&AgentProfile> {
        validate_wallet(&spec.wallet_address)?;
        if self.wallet_locked(&spec.wallet_address) {
            // Re-registering the dead agent's own id is equally refused.
            return Err(Reject::WalletBelongsToDeadAgent);
        }
        let id = spec.agent_id.clone();
        // A claimed wallet admits no second id while its owner lives; the
        // dead-agent lockout above cannot be evaded by registering early.
        if self.wallet_ids(&spec.wallet_address).iter().any(|bound| bound != &id) {
            return Err(Reject::WalletInUse);
        }
        if let Some(existing) = self.profiles.get_mut(&id) {
            if existing.combat.permanently_dead {
                return Err(Reject::AgentDeadPermanent);
            }
            existing.merge(spec, now);
        } else {
            let profile = AgentProfile::new(spec, now);
            self.bind_wallet(profile.wallet_address.clone(), id.clone());
            self.profiles.insert(id.clone(), profile);
        }
        self.mark_dirty(now);
        Ok(&self.profiles[&id])
    }

    /// Bump `last_seen`.  Called for every applied command that names the
    /// agent; intentionally does not set the dirty flag (a pure heartbeat
    /// is not worth a disk write).
    pub fn touch(&mut self, id: &AgentId, now: TimeMs) {
        if let Some(profile) = self.profiles.get_mut(id) {
            profile.last_seen = now;
        }
    }

    /// Apply a `profile` message: partial identity update.
    pub fn apply_profile_update(
        &mut self,
        id: &AgentId,
        name: Option<String>,
        color: Option<String>,
        bio: Option<String>,
        capabilities: Option<Vec<String>>,
        skills: Option<Vec<SkillSpec>>,
        now: TimeMs,
    ) {
        let Some(profile) = self.profiles.get_mut(id) else {
            return;
        };
        if let Some(name) = name {
            profile.name = name;
        }
        if let Some(color) = color {
            profile.color = color;
        }
        if let Some(bio) = bio {
            profile.bio = bio;
        }
        if let Some(capabilities) = capabilities {
            profile.capabilities = capabilities;
        }
        if let Some(skills) = skills {
            profile.skills = skills;
        }
        profile.last_seen = now;
        self.mark_dirty(now);
    }

    /// Record a defeat: death counters plus the permanent-death flag.
    pub fn record_defeat(&mut self, id: &AgentId, now: TimeMs) {
        if let Some(profile) = self.profiles.get_mut(id) {
            profile.combat.losses += 1;
            profile.combat.deaths += 1;
            profile.combat.last_death_at = Some(now);
            profile.combat.permanently_dead = true;
            profile.combat.death_permanent_at = Some(now);
        }
        self.mark_dirty(now);
    }

    /// Record a KO victory over `kill_count` agents.
    pub fn record_victory(&mut self, id: &AgentId, kill_count: u32, now: TimeMs) {
        if let Some(profile) = self.profiles.get_mut(id) {
            profile.combat.wins += 1;
            profile.combat.kills += kill_count;
            profile.combat.guilt += kill_count;
        }
        self.mark_dirty(now);
    }

    pub fn set_prize_refusal(&mut self, id: &AgentId, refused: bool, now: TimeMs) -> bool {
        let Some(profile) = self.profiles.get_mut(id) else {
            return false;
        };
        profile.combat.refused_prize = refused;
        self.mark_dirty(now);
        true
    }

    pub fn has_refused(&self, id: &AgentId) -> bool {
        self.profiles
            .get(id)
            .is_some_and(|p| p.combat.refused_prize)
    }

    /// Admin revive: clears the whole combat record for one agent.
    pub fn revive(&mut self, id: &AgentId, now: TimeMs) -> bool {
        let Some(profile) = self.profiles.get_mut(id) else {
            return false;
        };
        profile.combat = Default::default();
        self.mark_dirty(now);
        true
    }

    /// Round reset: every profile's combat record is cleared.
    pub fn revive_all(&mut self, now: TimeMs) {
        for profile in self.profiles.values_mut() {
            profile.combat = Default::default();
        }
        self.mark_dirty(now);
    }

    pub fn ban(&mut self, id: AgentId) {
        self.banned.insert(id);
    }

    pub fn unban(&mut self, id: &AgentId) {
        self.banned.remove(id);
    }

    /// Append `id` to the wallet's binding list.  Bindings are never removed.
    fn bind_wallet(&mut self, wallet: String, id: AgentId) {
        let ids = self.wallet_index.entry(wallet).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    // ── Flush coordination ────────────────────────────────────────────────

    fn mark_dirty(&mut self, now: TimeMs) {
        self.dirty_since.get_or_insert(now);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// A full profile snapshot once mutations have sat for the debounce
    /// window.  Clears the dirty stamp — callers own delivering the copy.
    pub fn snapshot_if_due(&mut self, now: TimeMs) -> Option<Vec<AgentProfile>> {
        let since = self.dirty_since?;
        if now.since(since) < REGISTRY_FLUSH_DEBOUNCE_MS {
            return None;
        }
        self.dirty_since = None;
        Some(self.snapshot())
    }

    /// An unconditional full snapshot (shutdown flush).
    pub fn snapshot(&self) -> Vec<AgentProfile> {
        let mut profiles: Vec<AgentProfile> = self.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        profiles
    }
}
