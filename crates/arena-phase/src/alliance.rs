//! The alliance book.
//!
//! Alliances are named member sets with join order preserved: the phase
//! cap trims most-recent joiners first.  An agent belongs to at most one
//! alliance; battle starts consult [`AllianceBook::are_allied`] and deaths
//! call [`AllianceBook::remove_everywhere`].

use rustc_hash::FxHashMap;

use arena_core::{AgentId, AllianceId, Reject, RejectResult, TimeMs};

/// One alliance: members in join order.
#[derive(Clone, Debug)]
pub struct Alliance {
    pub alliance_id: AllianceId,
    pub members: Vec<AgentId>,
    pub formed_at: TimeMs,
}

/// Owner of every alliance and the member→alliance index.
#[derive(Default)]
pub struct AllianceBook {
    alliances: FxHashMap<AllianceId, Alliance>,
    member_index: FxHashMap<AgentId, AllianceId>,
    seq: u64,
}

impl AllianceBook {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn are_allied(&self, a: &AgentId, b: &AgentId) -> bool {
        match (self.member_index.get(a), self.member_index.get(b)) {
            (Some(ia), Some(ib)) => ia == ib,
            _ => false,
        }
    }

    pub fn alliance_of(&self, agent: &AgentId) -> Option<&Alliance> {
        self.member_index
            .get(agent)
            .and_then(|id| self.alliances.get(id))
    }

    pub fn get(&self, id: &AllianceId) -> Option<&Alliance> {
        self.alliances.get(id)
    }

    pub fn count(&self) -> usize {
        self.alliances.len()
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Found a new alliance with `founder` as the first member.
    pub fn form(&mut self, founder: &AgentId, now: TimeMs) -> RejectResult<AllianceId> {
        if self.member_index.contains_key(founder) {
            return Err(Reject::BadArgs("already in an alliance".into()));
        }
        self.seq += 1;
        let alliance_id = AllianceId::from(format!("alliance-{:04}", self.seq));
        self.alliances.insert(
            alliance_id.clone(),
            Alliance {
                alliance_id: alliance_id.clone(),
                members:     vec![founder.clone()],
                formed_at:   now,
            },
        );
        self.member_index.insert(founder.clone(), alliance_id.clone());
        Ok(alliance_id)
    }

    /// Join an existing alliance, subject to the current phase cap.
    pub fn join(&mut self, agent: &AgentId, alliance_id: &AllianceId, cap: usize) -> RejectResult<()> {
        if self.member_index.contains_key(agent) {
            return Err(Reject::BadArgs("already in an alliance".into()));
        }
        let alliance = self
            .alliances
            .get_mut(alliance_id)
            .ok_or_else(|| Reject::BadArgs("no such alliance".into()))?;
        if alliance.members.len() >= cap {
            return Err(Reject::BadArgs("alliance is at the phase cap".into()));
        }
        alliance.members.push(agent.clone());
        self.member_index.insert(agent.clone(), alliance_id.clone());
        Ok(())
    }

    /// Remove `agent` from its alliance, disbanding an emptied one.
    /// Returns the alliance id and the remaining member list.
    pub fn remove_everywhere(&mut self, agent: &AgentId) -> Option<(AllianceId, Vec<AgentId>)> {
        let alliance_id = self.member_index.remove(agent)?;
        let alliance = self.alliances.get_mut(&alliance_id)?;
        alliance.members.retain(|m| m != agent);
        let remaining = alliance.members.clone();
        if remaining.is_empty() {
            self.alliances.remove(&alliance_id);
        }
        Some((alliance_id, remaining))
    }

    /// Enforce a new cap on every alliance, dropping most-recent joiners.
    /// Returns `(alliance, trimmed members)` pairs for event emission.
    pub fn trim_to_cap(&mut self, cap: usize) -> Vec<(AllianceId, Vec<AgentId>)> {
        let mut trimmed = Vec::new();
        for alliance in self.alliances.values_mut() {
            if alliance.members.len() <= cap {
                continue;
            }
            let dropped: Vec<AgentId> = alliance.members.split_off(cap);
            for agent in &dropped {
                self.member_index.remove(agent);
            }
            trimmed.push((alliance.alliance_id.clone(), dropped));
        }
        trimmed.sort_by(|a, b| a.0.cmp(&b.0));
        trimmed
    }

    /// Round reset.
    pub fn clear(&mut self) {
        self.alliances.clear();
        self.member_index.clear();
    }
}
