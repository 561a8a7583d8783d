//! The "active resource + timer + weighted catch + skill XP" shape shared
//! by the crop, animal, fishing, foraging, and mining domains (spec §4.5,
//! illustrated there by fishing).
//!
//! Rather than five independent copies of the same state machine, one
//! generic [`ResourceDomainSystem`] implements the shape once; `FishingSystem`,
//! `CropSystem`, `AnimalSystem`, `ForagingSystem`, and `MiningSystem` are
//! thin named wrappers so callers (and save-archive chunk names) still see
//! five distinct domains.

use std::collections::BTreeMap;

use goap_types::{EntityId, Position, ResourceDomainOp, WorldTime};
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::result::DomainApplyResult;
use crate::weather::WeatherKind;

/// One catch/yield definition a resource node can produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchDef {
    /// Item type yielded.
    pub item_id: String,
    /// Relative selection weight among currently-allowed catches.
    pub weight: f64,
    /// Season indices this catch is allowed in (empty = any season).
    pub allowed_seasons: Vec<u32>,
    /// Weather kinds this catch is allowed in (empty = any weather).
    #[serde(default)]
    pub allowed_weather: Vec<WeatherKind>,
    /// If `Some`, this catch requires the node's `variant_flag` to equal it
    /// (the fishing domain's `isShallow`; other domains may leave this
    /// `None` to mean "no variant restriction").
    pub requires_variant: Option<bool>,
    /// Minimum yield quantity (inclusive).
    pub min_quantity: i64,
    /// Maximum yield quantity (inclusive).
    pub max_quantity: i64,
    /// Item consumed per attempt (bait/seed/feed/tool charge), if any.
    pub consumable_item_id: Option<String>,
    /// Skill granted xp on a successful yield, if any.
    pub skill_id: Option<String>,
    /// XP granted per successful yield.
    pub skill_xp: f64,
}

impl CatchDef {
    fn allowed(&self, season_index: u32, weather: WeatherKind, variant_flag: bool) -> bool {
        let season_ok = self.allowed_seasons.is_empty() || self.allowed_seasons.contains(&season_index);
        let weather_ok = self.allowed_weather.is_empty() || self.allowed_weather.contains(&weather);
        let variant_ok = self.requires_variant.is_none_or(|required| required == variant_flag);
        season_ok && weather_ok && variant_ok
    }
}

/// One instance of a resource node (a plot, pen, vein, spot, or patch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Where the node sits in the world.
    pub position: Position,
    /// Domain-specific binary variant (fishing's `isShallow`; a crop plot
    /// might use this for "tilled"/"fallow", etc).
    pub variant_flag: bool,
    /// Whether the node currently accepts operations.
    pub active: bool,
    /// The catch currently locked in for this activation, if any.
    pub active_catch: Option<String>,
    /// The simulated day this node reactivates, once depleted.
    pub next_respawn_day: u64,
    /// Attempts remaining before this activation depletes.
    pub remaining_attempts: u32,
}

/// Tunables shared by every node this system manages.
#[derive(Debug, Clone)]
pub struct ResourceDomainConfig {
    /// Catch table, shared across all nodes in this system.
    pub catches: Vec<CatchDef>,
    /// Attempts granted per activation.
    pub attempts_per_activation: u32,
    /// Hours until a depleted node reactivates.
    pub respawn_hours: f64,
    /// Upper bound on simultaneously active nodes.
    pub max_active_nodes: usize,
}

/// The persisted shape of one resource-domain system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDomainState {
    /// Nodes, keyed by entity id.
    pub nodes: BTreeMap<EntityId, ResourceNode>,
    /// The domain's private RNG state.
    pub rng: ChaCha8Rng,
}

struct Inner {
    nodes: BTreeMap<EntityId, ResourceNode>,
    rng: ChaCha8Rng,
}

/// A generic active-resource domain system.
pub struct ResourceDomainSystem {
    name: &'static str,
    config: ResourceDomainConfig,
    gate: Mutex<Inner>,
}

impl ResourceDomainSystem {
    /// Build a system seeded deterministically from `seed`.
    #[must_use]
    pub fn new(name: &'static str, config: ResourceDomainConfig, seed: u64) -> Self {
        Self {
            name,
            config,
            gate: Mutex::new(Inner { nodes: BTreeMap::new(), rng: ChaCha8Rng::seed_from_u64(seed) }),
        }
    }

    /// Display name of this domain instance (e.g. `"fishing"`), used in
    /// logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Register a node under `id` at construction or world-seed time.
    pub fn seed_node(&self, id: EntityId, node: ResourceNode) {
        self.gate.lock().nodes.insert(id, node);
    }

    /// Advance internal timers: deactivate nodes whose active catch is no
    /// longer allowed under the current season/weather/depth, then
    /// reactivate depleted nodes whose respawn day has arrived and which
    /// still have an allowed catch.
    pub fn tick(&self, world_time: &WorldTime, weather: WeatherKind) {
        let mut inner = self.gate.lock();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let current_day = world_time.total_world_days.max(0.0) as u64;
        let season = world_time.season_index;

        for node in inner.nodes.values_mut() {
            if !node.active {
                continue;
            }
            let still_allowed = node.active_catch.as_ref().is_some_and(|catch_id| {
                self.config
                    .catches
                    .iter()
                    .any(|c| &c.item_id == catch_id && c.allowed(season, weather, node.variant_flag))
            });
            if !still_allowed {
                node.active = false;
                node.active_catch = None;
            }
        }

        let active_count = inner.nodes.values().filter(|n| n.active).count();
        let budget = self.config.max_active_nodes.saturating_sub(active_count);
        if budget == 0 {
            return;
        }

        let mut reactivated = 0usize;
        let due: Vec<EntityId> = inner
            .nodes
            .iter()
            .filter(|(_, node)| !node.active && current_day >= node.next_respawn_day)
            .map(|(id, _)| id.clone())
            .collect();
        for id in due {
            if reactivated >= budget {
                break;
            }
            let variant_flag = inner.nodes.get(&id).is_some_and(|node| node.variant_flag);
            let Some(catch_item) = self.choose_catch(&mut inner.rng, season, weather, variant_flag) else {
                continue;
            };
            if let Some(node) = inner.nodes.get_mut(&id) {
                node.active = true;
                node.active_catch = Some(catch_item);
                node.remaining_attempts = self.config.attempts_per_activation;
                reactivated += 1;
            }
        }
    }

    fn choose_catch(
        &self,
        rng: &mut ChaCha8Rng,
        season: u32,
        weather: WeatherKind,
        variant_flag: bool,
    ) -> Option<String> {
        let candidates: Vec<&CatchDef> =
            self.config.catches.iter().filter(|c| c.allowed(season, weather, variant_flag)).collect();
        if candidates.is_empty() {
            return None;
        }
        let total_weight: f64 = candidates.iter().map(|c| c.weight.max(0.0)).sum();
        if total_weight <= 0.0 {
            return candidates.first().map(|c| c.item_id.clone());
        }
        let mut roll = rng.random_range(0.0..total_weight);
        for candidate in &candidates {
            roll -= candidate.weight.max(0.0);
            if roll <= 0.0 {
                return Some(candidate.item_id.clone());
            }
        }
        candidates.last().map(|c| c.item_id.clone())
    }

    /// Apply one operation against its target node.
    pub fn apply(&self, op: &ResourceDomainOp, world_time: &WorldTime) -> DomainApplyResult {
        let mut inner = self.gate.lock();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let current_day = world_time.total_world_days.max(0.0) as u64;

        let Some(node) = inner.nodes.get_mut(&op.target) else {
            return DomainApplyResult::failed(format!("{} node {} unknown", self.name, op.target));
        };
        if !node.active || node.remaining_attempts == 0 {
            return DomainApplyResult::failed(format!("{} node {} is inactive", self.name, op.target));
        }
        let Some(catch_id) = node.active_catch.clone() else {
            return DomainApplyResult::failed(format!("{} node {} has no active catch", self.name, op.target));
        };
        let Some(catch) = self.config.catches.iter().find(|c| c.item_id == catch_id) else {
            return DomainApplyResult::failed("active catch no longer defined");
        };

        let mut result = DomainApplyResult::succeeded();
        if let Some(required) = &catch.consumable_item_id {
            result.inventory_changes.push(goap_types::InventoryOp {
                owner: op.actor.clone(),
                item_id: required.clone(),
                quantity: 1,
                remove: true,
            });
        }

        let quantity = if catch.max_quantity > catch.min_quantity {
            inner.rng.random_range(catch.min_quantity..=catch.max_quantity)
        } else {
            catch.min_quantity
        };
        result.inventory_changes.push(goap_types::InventoryOp {
            owner: op.actor.clone(),
            item_id: catch.item_id.clone(),
            quantity,
            remove: false,
        });
        if let Some(skill_id) = &catch.skill_id {
            if catch.skill_xp > 0.0 && catch.skill_xp.is_finite() {
                result.skill_xp = Some((skill_id.clone(), catch.skill_xp));
            }
        }

        if let Some(node) = inner.nodes.get_mut(&op.target) {
            node.remaining_attempts = node.remaining_attempts.saturating_sub(1);
            if node.remaining_attempts == 0 {
                node.active = false;
                node.active_catch = None;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let respawn_days = (self.config.respawn_hours / 24.0).ceil().max(0.0) as u64;
                node.next_respawn_day = current_day.saturating_add(respawn_days);
            }
        }

        result
    }

    /// Snapshot this system's nodes and RNG state, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> ResourceDomainState {
        let inner = self.gate.lock();
        ResourceDomainState { nodes: inner.nodes.clone(), rng: inner.rng.clone() }
    }

    /// Restore this system from a previously captured snapshot.
    pub fn apply_state(&self, state: ResourceDomainState) {
        let mut inner = self.gate.lock();
        inner.nodes = state.nodes;
        inner.rng = state.rng;
    }
}

/// Crop domain: tilled plots that mature and yield a harvest.
pub struct CropSystem(ResourceDomainSystem);
/// Animal domain: pens/pastures that yield a product when fed.
pub struct AnimalSystem(ResourceDomainSystem);
/// Fishing domain: spots that yield a catch per cast (the spec's
/// illustrative example).
pub struct FishingSystem(ResourceDomainSystem);
/// Foraging domain: patches that yield a find per search.
pub struct ForagingSystem(ResourceDomainSystem);
/// Mining domain: veins that yield ore per dig.
pub struct MiningSystem(ResourceDomainSystem);

macro_rules! resource_domain_wrapper {
    ($wrapper:ty, $domain_name:literal) => {
        impl $wrapper {
            /// Build a system seeded deterministically from `seed`.
            #[must_use]
            pub fn new(config: ResourceDomainConfig, seed: u64) -> Self {
                Self(ResourceDomainSystem::new($domain_name, config, seed))
            }

            /// Register a node under `id`.
            pub fn seed_node(&self, id: EntityId, node: ResourceNode) {
                self.0.seed_node(id, node);
            }

            /// Advance internal timers.
            pub fn tick(&self, world_time: &WorldTime, weather: WeatherKind) {
                self.0.tick(world_time, weather);
            }

            /// Apply one operation against its target node.
            pub fn apply(&self, op: &ResourceDomainOp, world_time: &WorldTime) -> DomainApplyResult {
                self.0.apply(op, world_time)
            }

            /// Snapshot this system's state, for persistence.
            #[must_use]
            pub fn capture_state(&self) -> ResourceDomainState {
                self.0.capture_state()
            }

            /// Restore this system from a previously captured snapshot.
            pub fn apply_state(&self, state: ResourceDomainState) {
                self.0.apply_state(state);
            }
        }
    };
}

resource_domain_wrapper!(CropSystem, "crop");
resource_domain_wrapper!(AnimalSystem, "animal");
resource_domain_wrapper!(FishingSystem, "fishing");
resource_domain_wrapper!(ForagingSystem, "foraging");
resource_domain_wrapper!(MiningSystem, "mining");

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResourceDomainConfig {
        ResourceDomainConfig {
            catches: vec![CatchDef {
                item_id: "trout".into(),
                weight: 1.0,
                allowed_seasons: vec![],
                allowed_weather: vec![],
                requires_variant: None,
                min_quantity: 1,
                max_quantity: 2,
                consumable_item_id: Some("bait".into()),
                skill_id: Some("fishing".into()),
                skill_xp: 5.0,
            }],
            attempts_per_activation: 2,
            respawn_hours: 24.0,
            max_active_nodes: 4,
        }
    }

    fn time(day: f64, season: u32) -> WorldTime {
        WorldTime {
            total_world_seconds: day * 86_400.0,
            total_world_days: day,
            time_scale: 1.0,
            seconds_per_day: 86_400.0,
            time_of_day: 0.0,
            day_of_year: 1,
            day_of_month: 1,
            month: 1,
            season_index: season,
            season_name: "Spring".into(),
            year: 1,
            days_per_month: 28,
            season_length_days: 28,
            days_per_year: 112,
        }
    }

    #[test]
    fn tick_activates_node_with_available_catch() -> Result<(), String> {
        let system = FishingSystem::new(config(), 7);
        let spot = EntityId::new("spot_1");
        system.seed_node(
            spot.clone(),
            ResourceNode {
                position: Position::new(0, 0),
                variant_flag: true,
                active: false,
                active_catch: None,
                next_respawn_day: 0,
                remaining_attempts: 0,
            },
        );
        system.tick(&time(0.0, 0), WeatherKind::Clear);
        let state = system.capture_state();
        let node = state.nodes.get(&spot).ok_or("just seeded")?;
        assert!(node.active);
        Ok(())
    }

    #[test]
    fn apply_depletes_attempts_and_reschedules() -> Result<(), String> {
        let system = FishingSystem::new(config(), 11);
        let spot = EntityId::new("spot_1");
        system.seed_node(
            spot.clone(),
            ResourceNode {
                position: Position::new(0, 0),
                variant_flag: true,
                active: true,
                active_catch: Some("trout".into()),
                next_respawn_day: 0,
                remaining_attempts: 1,
            },
        );
        let op = ResourceDomainOp {
            actor: EntityId::new("alice"),
            target: spot.clone(),
            action: "cast".into(),
            consumable_item_id: Some("bait".into()),
        };
        let result = system.apply(&op, &time(0.0, 0));
        assert!(result.success);
        assert!(result.skill_xp.is_some());

        let state = system.capture_state();
        let node = state.nodes.get(&spot).ok_or("just seeded")?;
        assert!(!node.active);
        assert_eq!(node.next_respawn_day, 1);
        Ok(())
    }

    #[test]
    fn apply_against_inactive_node_fails() {
        let system = FishingSystem::new(config(), 3);
        let spot = EntityId::new("spot_1");
        system.seed_node(
            spot.clone(),
            ResourceNode {
                position: Position::new(0, 0),
                variant_flag: true,
                active: false,
                active_catch: None,
                next_respawn_day: 5,
                remaining_attempts: 0,
            },
        );
        let op = ResourceDomainOp {
            actor: EntityId::new("alice"),
            target: spot,
            action: "cast".into(),
            consumable_item_id: None,
        };
        assert!(!system.apply(&op, &time(0.0, 0)).success);
    }

    #[test]
    fn tick_deactivates_a_node_whose_catch_is_no_longer_allowed_in_current_weather() -> Result<(), String> {
        let mut storm_only = config();
        storm_only.catches[0].allowed_weather = vec![WeatherKind::Storm];
        let system = FishingSystem::new(storm_only, 7);
        let spot = EntityId::new("spot_1");
        system.seed_node(
            spot.clone(),
            ResourceNode {
                position: Position::new(0, 0),
                variant_flag: true,
                active: true,
                active_catch: Some("trout".into()),
                next_respawn_day: 0,
                remaining_attempts: 1,
            },
        );

        system.tick(&time(0.0, 0), WeatherKind::Clear);
        let state = system.capture_state();
        let node = state.nodes.get(&spot).ok_or("just seeded")?;
        assert!(!node.active);
        assert!(node.active_catch.is_none());
        Ok(())
    }

    #[test]
    fn tick_does_not_activate_a_node_with_no_catch_allowed_in_current_weather() -> Result<(), String> {
        let mut storm_only = config();
        storm_only.catches[0].allowed_weather = vec![WeatherKind::Storm];
        let system = FishingSystem::new(storm_only, 7);
        let spot = EntityId::new("spot_1");
        system.seed_node(
            spot.clone(),
            ResourceNode {
                position: Position::new(0, 0),
                variant_flag: true,
                active: false,
                active_catch: None,
                next_respawn_day: 0,
                remaining_attempts: 0,
            },
        );

        system.tick(&time(0.0, 0), WeatherKind::Clear);
        let state = system.capture_state();
        let node = state.nodes.get(&spot).ok_or("just seeded")?;
        assert!(!node.active);

        system.tick(&time(0.0, 0), WeatherKind::Storm);
        let state = system.capture_state();
        let node = state.nodes.get(&spot).ok_or("just seeded")?;
        assert!(node.active);
        Ok(())
    }
}
