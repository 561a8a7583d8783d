//! Per-actor skill experience tracking.
//!
//! Fed exclusively by the resource domains' `skill_xp` grants (spec §4.4:
//! mining/fishing/foraging grant `(skillId, skillXp)` on a successful
//! yield); this system just accumulates it per actor per skill.

use std::collections::BTreeMap;

use dashmap::DashMap;
use goap_types::EntityId;
use serde::{Deserialize, Serialize};

/// One actor's captured skill levels, for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecord {
    /// The actor these skills belong to.
    pub actor: EntityId,
    /// Skill id → accumulated experience.
    pub experience: BTreeMap<String, f64>,
}

/// Per-actor, per-skill experience ledger.
#[derive(Default)]
pub struct SkillSystem {
    experience: DashMap<EntityId, BTreeMap<String, f64>>,
}

impl SkillSystem {
    /// Current accumulated experience for `actor` in `skill_id` (`0.0` if
    /// untouched).
    #[must_use]
    pub fn experience(&self, actor: &EntityId, skill_id: &str) -> f64 {
        self.experience.get(actor).and_then(|skills| skills.get(skill_id).copied()).unwrap_or(0.0)
    }

    /// Grant `xp` of `skill_id` to `actor`. Non-positive or non-finite
    /// grants are a no-op, matching the resource domains' own
    /// `skill_xp > 0 ∧ finite` gate.
    pub fn grant(&self, actor: &EntityId, skill_id: &str, xp: f64) -> f64 {
        if !(xp > 0.0 && xp.is_finite()) {
            return self.experience(actor, skill_id);
        }
        let mut skills = self.experience.entry(actor.clone()).or_default();
        let entry = skills.entry(skill_id.to_owned()).or_insert(0.0);
        *entry += xp;
        *entry
    }

    /// Snapshot every actor's skills, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> Vec<SkillRecord> {
        self.experience
            .iter()
            .map(|entry| SkillRecord { actor: entry.key().clone(), experience: entry.value().clone() })
            .collect()
    }

    /// Replace this system's contents from a previously captured snapshot.
    pub fn apply_state(&self, records: Vec<SkillRecord>) {
        self.experience.clear();
        for record in records {
            self.experience.insert(record.actor, record.experience);
        }
    }
}
