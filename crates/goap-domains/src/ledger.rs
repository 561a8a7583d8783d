//! Inventory, currency, and shop bookkeeping.
//!
//! Grounded on `emergence-ledger/src/ledger.rs`'s append-only,
//! struct-of-args transfer pattern, adapted from a single shared ledger to
//! three small concurrent maps (each domain is independently lockable, per
//! spec §5's "a single internal mutex each").

use dashmap::DashMap;
use goap_types::{CurrencyOp, EntityId, InventoryOp, ShopTxnKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-owner item-type → quantity ledger.
#[derive(Default)]
pub struct InventorySystem {
    balances: DashMap<EntityId, BTreeMap<String, i64>>,
}

/// One owner's captured inventory, for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// The owning entity.
    pub owner: EntityId,
    /// Item type → quantity held.
    pub items: BTreeMap<String, i64>,
}

impl InventorySystem {
    /// Current quantity of `item_id` held by `owner`.
    #[must_use]
    pub fn balance(&self, owner: &EntityId, item_id: &str) -> i64 {
        self.balances.get(owner).and_then(|items| items.get(item_id).copied()).unwrap_or(0)
    }

    /// Add `quantity` of `item_id` to `owner`. Non-positive quantities are a
    /// no-op, per spec.
    pub fn add(&self, owner: &EntityId, item_id: &str, quantity: i64) -> i64 {
        if quantity <= 0 {
            return 0;
        }
        let mut items = self.balances.entry(owner.clone()).or_default();
        let entry = items.entry(item_id.to_owned()).or_insert(0);
        *entry = entry.saturating_add(quantity);
        quantity
    }

    /// Remove up to `quantity` of `item_id` from `owner`, returning how much
    /// was actually removed (never more than `owner` held).
    pub fn remove(&self, owner: &EntityId, item_id: &str, quantity: i64) -> i64 {
        if quantity <= 0 {
            return 0;
        }
        let Some(mut items) = self.balances.get_mut(owner) else {
            return 0;
        };
        let Some(held) = items.get_mut(item_id) else {
            return 0;
        };
        let removed = quantity.min(*held);
        *held -= removed;
        removed
    }

    /// Apply a raw inventory operation, returning the quantity actually
    /// moved (may be less than requested for removals).
    pub fn apply(&self, op: &InventoryOp) -> i64 {
        if op.remove {
            self.remove(&op.owner, &op.item_id, op.quantity)
        } else {
            self.add(&op.owner, &op.item_id, op.quantity)
        }
    }

    /// Snapshot every owner's holdings, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> Vec<InventoryRecord> {
        self.balances
            .iter()
            .map(|entry| InventoryRecord { owner: entry.key().clone(), items: entry.value().clone() })
            .collect()
    }

    /// Replace this system's contents from a previously captured snapshot.
    pub fn apply_state(&self, records: Vec<InventoryRecord>) {
        self.balances.clear();
        for record in records {
            self.balances.insert(record.owner, record.items);
        }
    }
}

/// Per-owner currency balance.
#[derive(Default)]
pub struct CurrencySystem {
    balances: DashMap<EntityId, f64>,
}

impl CurrencySystem {
    /// Current balance for `owner` (`0.0` if never touched).
    #[must_use]
    pub fn balance(&self, owner: &EntityId) -> f64 {
        self.balances.get(owner).map_or(0.0, |b| *b)
    }

    /// Apply a signed delta to `owner`'s balance, returning the new
    /// balance. Deltas with magnitude under `1e-6` are ignored, per spec.
    pub fn adjust(&self, owner: &EntityId, amount: f64) -> f64 {
        if amount.abs() < 1e-6 {
            return self.balance(owner);
        }
        let mut entry = self.balances.entry(owner.clone()).or_insert(0.0);
        *entry += amount;
        *entry
    }

    /// Apply a raw currency operation, returning the new balance.
    pub fn apply(&self, op: &CurrencyOp) -> f64 {
        self.adjust(&op.owner, op.amount)
    }

    /// Snapshot every owner's balance, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> Vec<(EntityId, f64)> {
        self.balances.iter().map(|entry| (entry.key().clone(), *entry.value())).collect()
    }

    /// Replace this system's contents from a previously captured snapshot.
    pub fn apply_state(&self, records: Vec<(EntityId, f64)>) {
        self.balances.clear();
        for (owner, balance) in records {
            self.balances.insert(owner, balance);
        }
    }
}

/// One shop's price list and remaining stock, keyed by item type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopListing {
    /// Price per unit, by item type.
    pub prices: BTreeMap<String, f64>,
    /// Remaining stock, by item type. Absent entries are treated as
    /// unlimited stock for sales-to-the-shop, zero for purchases.
    pub stock: BTreeMap<String, i64>,
}

/// A completed shop transaction: units moved and the total price charged.
#[derive(Debug, Clone, Copy)]
pub struct ShopOutcome {
    /// Units actually transacted (may be less than requested if stock ran
    /// out on a purchase).
    pub quantity: i64,
    /// Total price for `quantity` units.
    pub total_price: f64,
}

/// Shop listings, keyed by shop entity.
#[derive(Default)]
pub struct ShopSystem {
    shops: DashMap<EntityId, ShopListing>,
}

impl ShopSystem {
    /// Register or replace a shop's listing.
    pub fn set_listing(&self, shop: &EntityId, listing: ShopListing) {
        self.shops.insert(shop.clone(), listing);
    }

    /// Execute a sale (actor → shop) or purchase (shop → actor), moving
    /// inventory through `inventory` and returning the priced outcome.
    ///
    /// Returns `None` if the shop is unknown, the item is unpriced, or (on
    /// a purchase) the shop has no stock at all.
    pub fn transact(
        &self,
        shop: &EntityId,
        actor: &EntityId,
        item_id: &str,
        quantity: i64,
        kind: ShopTxnKind,
        inventory: &InventorySystem,
    ) -> Option<ShopOutcome> {
        if quantity <= 0 {
            return None;
        }
        let listing = self.shops.get(shop)?;
        let unit_price = *listing.prices.get(item_id)?;
        drop(listing);

        let moved = match kind {
            ShopTxnKind::Sale => {
                let moved = inventory.remove(actor, item_id, quantity);
                inventory.add(shop, item_id, moved);
                moved
            }
            ShopTxnKind::Purchase => {
                let available = self.shops.get(shop).map_or(0, |l| {
                    l.stock.get(item_id).copied().unwrap_or(i64::MAX)
                });
                let moved = inventory.remove(shop, item_id, quantity.min(available));
                inventory.add(actor, item_id, moved);
                moved
            }
        };

        if moved == 0 {
            return None;
        }
        if let Some(mut listing) = self.shops.get_mut(shop) {
            if let Some(stock) = listing.stock.get_mut(item_id) {
                *stock = (*stock - moved).max(0);
            }
        }

        Some(ShopOutcome {
            quantity: moved,
            #[allow(clippy::cast_precision_loss)]
            total_price: unit_price * moved as f64,
        })
    }

    /// Snapshot every shop's listing, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> Vec<(EntityId, ShopListing)> {
        self.shops.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect()
    }

    /// Replace this system's contents from a previously captured snapshot.
    pub fn apply_state(&self, records: Vec<(EntityId, ShopListing)>) {
        self.shops.clear();
        for (shop, listing) in records {
            self.shops.insert(shop, listing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_remove_never_exceeds_held_quantity() {
        let inv = InventorySystem::default();
        let owner = EntityId::new("alice");
        inv.add(&owner, "wood", 3);
        assert_eq!(inv.remove(&owner, "wood", 10), 3);
        assert_eq!(inv.balance(&owner, "wood"), 0);
    }

    #[test]
    fn currency_ignores_sub_epsilon_deltas() {
        let currency = CurrencySystem::default();
        let owner = EntityId::new("alice");
        currency.adjust(&owner, 10.0);
        currency.adjust(&owner, 1e-9);
        assert!((currency.balance(&owner) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn shop_sale_moves_inventory_and_prices_it() {
        let inv = InventorySystem::default();
        let shop_system = ShopSystem::default();
        let shop = EntityId::new("general_store");
        let actor = EntityId::new("alice");
        shop_system.set_listing(
            &shop,
            ShopListing {
                prices: [("wood".to_owned(), 2.0)].into_iter().collect(),
                stock: BTreeMap::new(),
            },
        );
        inv.add(&actor, "wood", 5);

        let outcome = shop_system.transact(&shop, &actor, "wood", 5, ShopTxnKind::Sale, &inv);
        let outcome = outcome.unwrap_or(ShopOutcome { quantity: 0, total_price: 0.0 });
        assert_eq!(outcome.quantity, 5);
        assert!((outcome.total_price - 10.0).abs() < 1e-9);
        assert_eq!(inv.balance(&actor, "wood"), 0);
        assert_eq!(inv.balance(&shop, "wood"), 5);
    }

    #[test]
    fn shop_purchase_is_capped_by_stock() {
        let inv = InventorySystem::default();
        let shop_system = ShopSystem::default();
        let shop = EntityId::new("general_store");
        let actor = EntityId::new("alice");
        inv.add(&shop, "seed", 2);
        shop_system.set_listing(
            &shop,
            ShopListing {
                prices: [("seed".to_owned(), 1.0)].into_iter().collect(),
                stock: [("seed".to_owned(), 2)].into_iter().collect(),
            },
        );

        let outcome = shop_system.transact(&shop, &actor, "seed", 10, ShopTxnKind::Purchase, &inv);
        let outcome = outcome.unwrap_or(ShopOutcome { quantity: 0, total_price: 0.0 });
        assert_eq!(outcome.quantity, 2);
        assert_eq!(inv.balance(&actor, "seed"), 2);
    }
}
