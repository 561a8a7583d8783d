//! Domain systems: inventory, currency, shop, social, skill, quest,
//! weather, calendar, and the generic resource-node domain (crop, animal,
//! fishing, foraging, mining).
//!
//! Each system here owns its own private concurrency gate and, where
//! randomness is involved, its own seeded RNG, per spec §5's "domain
//! systems use a single internal mutex each" rule. None of these systems
//! talk to `goap-store` directly — they are invoked from post-commit
//! effect dispatch (`goap-effects`) with the plain operation structs
//! carried on a committed `EffectBatch`.

pub mod calendar;
pub mod error;
pub mod ledger;
pub mod quest;
pub mod resource_domain;
pub mod result;
pub mod skill;
pub mod social;
pub mod weather;

pub use calendar::{CalendarEventDef, CalendarState, CalendarSystem};
pub use error::DomainError;
pub use ledger::{CurrencySystem, InventoryRecord, InventorySystem, ShopListing, ShopOutcome, ShopSystem};
pub use quest::{QuestDef, QuestObjectiveDef, QuestProgressRecord, QuestRecord, QuestStatus, QuestSystem};
pub use resource_domain::{
    AnimalSystem, CatchDef, CropSystem, FishingSystem, ForagingSystem, MiningSystem, ResourceDomainConfig,
    ResourceDomainState, ResourceDomainSystem, ResourceNode,
};
pub use result::DomainApplyResult;
pub use skill::{SkillRecord, SkillSystem};
pub use social::{GiftAffinityTable, RelationshipRecord, SocialSystem};
pub use weather::{SeasonWeatherWeights, WeatherConfig, WeatherKind, WeatherState, WeatherSystem};
