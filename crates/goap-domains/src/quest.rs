//! Quest objective progress and turn-in (spec §4.4's quest ops).

use std::collections::BTreeMap;

use dashmap::DashMap;
use goap_types::{CurrencyOp, EntityId, InventoryOp, QuestOp};
use serde::{Deserialize, Serialize};

use crate::result::DomainApplyResult;

/// Outcome status of a quest operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestStatus {
    /// The actor has made progress but the objective is not yet satisfied.
    InProgress,
    /// The objective requirement is satisfied and rewards were granted.
    Completed,
    /// The operation could not be applied (unknown quest, unmet turn-in
    /// requirement, wrong item).
    Failed,
}

/// One objective's turn-in requirement and reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestObjectiveDef {
    /// Objective identifier, unique within its quest.
    pub objective_id: String,
    /// Item required for turn-in, if any.
    pub required_item_id: Option<String>,
    /// Quantity of `required_item_id` required for turn-in.
    pub required_quantity: i64,
    /// Items granted on successful turn-in.
    pub reward_items: Vec<(String, i64)>,
    /// Currency granted on successful turn-in.
    pub reward_currency: f64,
}

/// A quest's full objective list, defined by quest id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestDef {
    /// Objectives, in turn-in order.
    pub objectives: Vec<QuestObjectiveDef>,
}

/// One actor's progress against one quest's objectives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QuestProgress {
    completed_objectives: BTreeMap<String, bool>,
    counters: BTreeMap<String, i64>,
}

/// One actor's captured quest state, for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestRecord {
    /// The actor this progress belongs to.
    pub actor: EntityId,
    /// Quest id → per-objective progress.
    pub quests: BTreeMap<String, QuestProgressRecord>,
}

/// A serializable view of [`QuestProgress`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestProgressRecord {
    /// Objective id → whether it has been turned in.
    pub completed_objectives: BTreeMap<String, bool>,
    /// Objective id → accumulated progress counter.
    pub counters: BTreeMap<String, i64>,
}

/// Tracks per-actor quest objective progress and turn-in rewards.
#[derive(Default)]
pub struct QuestSystem {
    defs: BTreeMap<String, QuestDef>,
    progress: DashMap<EntityId, BTreeMap<String, QuestProgress>>,
}

impl QuestSystem {
    /// Build a system from a fixed quest-id → definition table.
    #[must_use]
    pub fn new(defs: BTreeMap<String, QuestDef>) -> Self {
        Self { defs, progress: DashMap::new() }
    }

    /// Apply a quest operation for its actor.
    ///
    /// `action == "progress"` increments the named objective's counter by
    /// `quantity` (minimum 1) and reports `InProgress`. `action ==
    /// "turn_in"` checks the objective's requirement; if satisfied, grants
    /// its rewards and reports `Completed`, else `Failed`.
    pub fn apply(&self, op: &QuestOp) -> (QuestStatus, DomainApplyResult) {
        let Some(def) = self.defs.get(&op.quest_id) else {
            return (QuestStatus::Failed, DomainApplyResult::failed(format!("unknown quest {}", op.quest_id)));
        };
        let objective_id = objective_id_from_action(&op.action);
        let Some(objective) = def.objectives.iter().find(|o| o.objective_id == objective_id) else {
            return (QuestStatus::Failed, DomainApplyResult::failed("unknown objective"));
        };

        let mut actor_quests = self.progress.entry(op.actor.clone()).or_default();
        let progress = actor_quests.entry(op.quest_id.clone()).or_default();
        let verb = op.action.split_once(':').map_or(op.action.as_str(), |(verb, _)| verb);

        match verb {
            "progress" => {
                let counter = progress.counters.entry(objective.objective_id.clone()).or_insert(0);
                *counter = counter.saturating_add(op.quantity.max(1));
                let mut result = DomainApplyResult::succeeded();
                result.objective_progress =
                    Some((objective.objective_id.clone(), *counter, objective.required_quantity));
                (QuestStatus::InProgress, result)
            }
            "turn_in" => {
                let met = objective.required_item_id.as_deref().is_none_or(|required| {
                    op.item_id.as_deref() == Some(required) && op.quantity >= objective.required_quantity
                });
                if !met {
                    let so_far = progress.counters.get(&objective.objective_id).copied().unwrap_or(0);
                    let mut result = DomainApplyResult::failed("turn-in requirement not met");
                    result.objective_progress =
                        Some((objective.objective_id.clone(), so_far, objective.required_quantity));
                    return (QuestStatus::Failed, result);
                }
                progress.completed_objectives.insert(objective.objective_id.clone(), true);

                let mut result = DomainApplyResult::succeeded();
                result.objective_progress = Some((
                    objective.objective_id.clone(),
                    objective.required_quantity,
                    objective.required_quantity,
                ));
                if let Some(required) = &objective.required_item_id {
                    result.inventory_changes.push(InventoryOp {
                        owner: op.actor.clone(),
                        item_id: required.clone(),
                        quantity: objective.required_quantity,
                        remove: true,
                    });
                }
                for (item_id, quantity) in &objective.reward_items {
                    result.inventory_changes.push(InventoryOp {
                        owner: op.actor.clone(),
                        item_id: item_id.clone(),
                        quantity: *quantity,
                        remove: false,
                    });
                }
                if objective.reward_currency.abs() >= 1e-6 {
                    result
                        .currency_changes
                        .push(CurrencyOp { owner: op.actor.clone(), amount: objective.reward_currency });
                }
                (QuestStatus::Completed, result)
            }
            _ => (QuestStatus::Failed, DomainApplyResult::failed(format!("unknown quest action {}", op.action))),
        }
    }

    /// Snapshot every actor's quest progress, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> Vec<QuestRecord> {
        self.progress
            .iter()
            .map(|entry| {
                let quests = entry
                    .value()
                    .iter()
                    .map(|(quest_id, p)| {
                        (
                            quest_id.clone(),
                            QuestProgressRecord {
                                completed_objectives: p.completed_objectives.clone(),
                                counters: p.counters.clone(),
                            },
                        )
                    })
                    .collect();
                QuestRecord { actor: entry.key().clone(), quests }
            })
            .collect()
    }

    /// Replace this system's contents from a previously captured snapshot.
    pub fn apply_state(&self, records: Vec<QuestRecord>) {
        self.progress.clear();
        for record in records {
            let quests = record
                .quests
                .into_iter()
                .map(|(quest_id, p)| {
                    (
                        quest_id,
                        QuestProgress { completed_objectives: p.completed_objectives, counters: p.counters },
                    )
                })
                .collect();
            self.progress.insert(record.actor, quests);
        }
    }
}

/// Quest ops carry no separate `objectiveId` field on the wire (spec §4.4
/// only lists `{actor, questId, action, itemId?, quantity}`); by
/// convention the objective id is embedded in `action` as
/// `"<verb>:<objectiveId>"`.
fn objective_id_from_action(action: &str) -> String {
    action.split_once(':').map_or_else(|| action.to_owned(), |(_, id)| id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> BTreeMap<String, QuestDef> {
        let mut defs = BTreeMap::new();
        defs.insert(
            "deliver_parcel".to_owned(),
            QuestDef {
                objectives: vec![QuestObjectiveDef {
                    objective_id: "hand_in".to_owned(),
                    required_item_id: Some("parcel".to_owned()),
                    required_quantity: 1,
                    reward_items: vec![("gold_coin".to_owned(), 3)],
                    reward_currency: 50.0,
                }],
            },
        );
        defs
    }

    #[test]
    fn turn_in_with_required_item_grants_rewards() {
        let quests = QuestSystem::new(defs());
        let actor = EntityId::new("alice");
        let op = QuestOp {
            actor,
            quest_id: "deliver_parcel".into(),
            action: "turn_in:hand_in".into(),
            item_id: Some("parcel".into()),
            quantity: 1,
        };
        let (status, result) = quests.apply(&op);
        assert_eq!(status, QuestStatus::Completed);
        assert!(result.success);
        assert_eq!(result.inventory_changes.len(), 2);
        assert_eq!(result.currency_changes.len(), 1);
    }

    #[test]
    fn turn_in_without_required_item_fails() {
        let quests = QuestSystem::new(defs());
        let actor = EntityId::new("alice");
        let op = QuestOp {
            actor,
            quest_id: "deliver_parcel".into(),
            action: "turn_in:hand_in".into(),
            item_id: None,
            quantity: 0,
        };
        let (status, _) = quests.apply(&op);
        assert_eq!(status, QuestStatus::Failed);
    }

    #[test]
    fn progress_action_increments_counter() {
        let quests = QuestSystem::new(defs());
        let actor = EntityId::new("alice");
        let op = QuestOp {
            actor,
            quest_id: "deliver_parcel".into(),
            action: "progress:hand_in".into(),
            item_id: None,
            quantity: 1,
        };
        let (status, _) = quests.apply(&op);
        assert_eq!(status, QuestStatus::InProgress);
    }
}
