//! Post-commit effect dispatch (spec §4.4).
//!
//! Invoked only after a `Committed` result from `WorldStore::try_commit`.
//! Each branch below is optional — a registry with a domain left
//! unattached simply skips that op kind. Dispatch is **not** itself
//! transactional with the world commit: a domain `apply` failure is
//! logged and surfaced in-band as `success = false`, never rolled back.

use goap_domains::{
    AnimalSystem, CropSystem, CurrencySystem, FishingSystem, ForagingSystem, InventorySystem, MiningSystem,
    QuestSystem, ShopSystem, SkillSystem, SocialSystem,
};
use goap_logging::{Field, WorldLogger};
use goap_types::{EffectBatch, ShopTxnKind, WorldTime};
use std::sync::Arc;

/// The domain systems post-commit dispatch may route operations to. Every
/// field is optional so a deployment can attach only the domains it uses.
#[derive(Default, Clone)]
pub struct DomainRegistry {
    /// Inventory ledger.
    pub inventory: Option<Arc<InventorySystem>>,
    /// Currency ledger.
    pub currency: Option<Arc<CurrencySystem>>,
    /// Shop listings and transactions.
    pub shops: Option<Arc<ShopSystem>>,
    /// Relationship scores.
    pub social: Option<Arc<SocialSystem>>,
    /// Skill experience.
    pub skills: Option<Arc<SkillSystem>>,
    /// Quest objective progress.
    pub quests: Option<Arc<QuestSystem>>,
    /// Crop resource nodes.
    pub crops: Option<Arc<CropSystem>>,
    /// Animal resource nodes.
    pub animals: Option<Arc<AnimalSystem>>,
    /// Mining resource nodes.
    pub mining: Option<Arc<MiningSystem>>,
    /// Fishing resource nodes.
    pub fishing: Option<Arc<FishingSystem>>,
    /// Foraging resource nodes.
    pub foraging: Option<Arc<ForagingSystem>>,
}

/// Dispatches a committed batch's domain operations to whichever systems
/// are attached, logging each outcome to the world log.
pub struct EffectDispatcher {
    domains: DomainRegistry,
    world_log: Arc<WorldLogger>,
}

impl EffectDispatcher {
    /// Build a dispatcher over `domains`, logging outcomes to `world_log`.
    #[must_use]
    pub fn new(domains: DomainRegistry, world_log: Arc<WorldLogger>) -> Self {
        Self { domains, world_log }
    }

    /// Process every domain operation carried on `batch`.
    pub fn dispatch(&self, batch: &EffectBatch, world_time: &WorldTime) {
        self.dispatch_inventory_ops(&batch.inventory_ops, None);
        self.dispatch_currency_ops(&batch.currency_ops, None);
        self.dispatch_shop_txns(&batch.shop_txns);
        self.dispatch_relationship_ops(&batch.relationship_ops);
        self.dispatch_resource_ops(
            "crop",
            &batch.crop_ops,
            self.domains.crops.as_deref().map(|s| s as &dyn ResourceDomainApply),
            world_time,
        );
        self.dispatch_resource_ops(
            "animal",
            &batch.animal_ops,
            self.domains.animals.as_deref().map(|s| s as &dyn ResourceDomainApply),
            world_time,
        );
        self.dispatch_resource_ops(
            "mining",
            &batch.mining_ops,
            self.domains.mining.as_deref().map(|s| s as &dyn ResourceDomainApply),
            world_time,
        );
        self.dispatch_resource_ops(
            "fishing",
            &batch.fishing_ops,
            self.domains.fishing.as_deref().map(|s| s as &dyn ResourceDomainApply),
            world_time,
        );
        self.dispatch_resource_ops(
            "foraging",
            &batch.foraging_ops,
            self.domains.foraging.as_deref().map(|s| s as &dyn ResourceDomainApply),
            world_time,
        );
        self.dispatch_quest_ops(&batch.quest_ops);
    }

    fn dispatch_inventory_ops(&self, ops: &[goap_types::InventoryOp], domain_tag: Option<&str>) {
        let Some(inventory) = &self.domains.inventory else {
            return;
        };
        for op in ops {
            let moved = inventory.apply(op);
            if moved == 0 {
                continue;
            }
            let signed = if op.remove { -moved } else { moved };
            let mut fields =
                vec![Field::new("owner", &op.owner), Field::new("item", &op.item_id), Field::new("delta", signed)];
            if let Some(domain) = domain_tag {
                fields.push(Field::new("domain", domain));
            }
            self.world_log.log("INVENTORY", &fields);
        }
    }

    fn dispatch_currency_ops(&self, ops: &[goap_types::CurrencyOp], domain_tag: Option<&str>) {
        let Some(currency) = &self.domains.currency else {
            return;
        };
        for op in ops {
            if op.amount.abs() < 1e-6 {
                continue;
            }
            let balance = currency.apply(op);
            let mut fields = vec![
                Field::new("owner", &op.owner),
                Field::new("delta", op.amount),
                Field::new("balance", balance),
            ];
            if let Some(domain) = domain_tag {
                fields.push(Field::new("domain", domain));
            }
            self.world_log.log("CURRENCY", &fields);
        }
    }

    fn dispatch_shop_txns(&self, txns: &[goap_types::ShopTxn]) {
        let (Some(shops), Some(inventory)) = (&self.domains.shops, &self.domains.inventory) else {
            return;
        };
        for txn in txns {
            let Some(outcome) = shops.transact(&txn.shop, &txn.actor, &txn.item_id, txn.quantity, txn.kind, inventory)
            else {
                continue;
            };
            let actor_delta = match txn.kind {
                ShopTxnKind::Sale => outcome.total_price,
                ShopTxnKind::Purchase => -outcome.total_price,
            };
            if let Some(currency) = &self.domains.currency {
                currency.adjust(&txn.actor, actor_delta);
                currency.adjust(&txn.shop, -actor_delta);
            }
            self.world_log.log(
                "SHOP",
                &[
                    Field::new("shop", &txn.shop),
                    Field::new("actor", &txn.actor),
                    Field::new("item", &txn.item_id),
                    Field::new("quantity", outcome.quantity),
                    Field::new("total_price", outcome.total_price),
                ],
            );
        }
    }

    fn dispatch_relationship_ops(&self, ops: &[goap_types::RelationshipOp]) {
        let Some(social) = &self.domains.social else {
            return;
        };
        for op in ops {
            let score = social.apply(op);
            self.world_log.log(
                "RELATIONSHIP",
                &[
                    Field::new("from", &op.from),
                    Field::new("to", &op.to),
                    Field::new("relationship", &op.relationship_id),
                    Field::new("score", score),
                ],
            );
        }
    }

    fn dispatch_quest_ops(&self, ops: &[goap_types::QuestOp]) {
        let Some(quests) = &self.domains.quests else {
            return;
        };
        for op in ops {
            let (status, result) = quests.apply(op);
            self.process_inventory_changes(&result.inventory_changes, "quest");
            self.process_currency_changes(&result.currency_changes, "quest");
            let (objective, progress) = result.objective_progress.as_ref().map_or(
                (String::new(), String::new()),
                |(objective_id, progress, required)| (objective_id.clone(), format!("{progress}/{required}")),
            );
            self.world_log.log(
                "QUEST",
                &[
                    Field::new("actor", &op.actor),
                    Field::new("quest", &op.quest_id),
                    Field::new("objective", objective),
                    Field::new("status", format!("{status:?}")),
                    Field::new("progress", progress),
                    Field::new("message", result.message.unwrap_or_default()),
                ],
            );
        }
    }

    fn dispatch_resource_ops(
        &self,
        domain_name: &str,
        ops: &[goap_types::ResourceDomainOp],
        system: Option<&dyn ResourceDomainApply>,
        world_time: &WorldTime,
    ) {
        let Some(system) = system else {
            return;
        };
        for op in ops {
            let result = system.apply(op, world_time);
            self.process_inventory_changes(&result.inventory_changes, domain_name);
            self.process_currency_changes(&result.currency_changes, domain_name);
            if let Some((skill_id, xp)) = &result.skill_xp {
                if let Some(skills) = &self.domains.skills {
                    skills.grant(&op.actor, skill_id, *xp);
                }
            }
            self.world_log.log(
                domain_name.to_ascii_uppercase().as_str(),
                &[
                    Field::new("actor", &op.actor),
                    Field::new("target", &op.target),
                    Field::new("success", result.success),
                ],
            );
        }
    }

    fn process_inventory_changes(&self, changes: &[goap_types::InventoryOp], domain_tag: &str) {
        self.dispatch_inventory_ops(changes, Some(domain_tag));
    }

    fn process_currency_changes(&self, changes: &[goap_types::CurrencyOp], domain_tag: &str) {
        self.dispatch_currency_ops(changes, Some(domain_tag));
    }
}

/// Object-safe view over the five resource-domain newtypes so
/// `dispatch_resource_ops` can be written once instead of five times.
trait ResourceDomainApply {
    fn apply(&self, op: &goap_types::ResourceDomainOp, world_time: &WorldTime) -> goap_domains::DomainApplyResult;
}

macro_rules! impl_resource_domain_apply {
    ($ty:ty) => {
        impl ResourceDomainApply for $ty {
            fn apply(
                &self,
                op: &goap_types::ResourceDomainOp,
                world_time: &WorldTime,
            ) -> goap_domains::DomainApplyResult {
                Self::apply(self, op, world_time)
            }
        }
    };
}

impl_resource_domain_apply!(CropSystem);
impl_resource_domain_apply!(AnimalSystem);
impl_resource_domain_apply!(MiningSystem);
impl_resource_domain_apply!(FishingSystem);
impl_resource_domain_apply!(ForagingSystem);
