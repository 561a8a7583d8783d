//! Entity records and the building facet attached to some entities.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::position::Position;

/// Case-insensitive tag set. Stored lower-cased so membership tests never
/// need to re-normalize the query.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Build a tag set from raw tags, trimming whitespace, dropping empty
    /// entries, and case-insensitively deduplicating.
    #[must_use]
    pub fn normalize(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut set = BTreeSet::new();
        for tag in tags {
            let trimmed = tag.into().trim().to_ascii_lowercase();
            if !trimmed.is_empty() {
                set.insert(trimmed);
            }
        }
        Self(set)
    }

    /// Whether `tag` (compared case-insensitively) is present.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&tag.trim().to_ascii_lowercase())
    }

    /// Iterate the normalized tags.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A building facet on an entity: a service area with an open/closed flag,
/// capacity, service points, and a weekly/seasonal operating schedule.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Top-left and bottom-right corners of the building's footprint.
    pub area: (Position, Position),
    /// Whether the building currently accepts visitors.
    pub open_flag: bool,
    /// Maximum number of actors served at once.
    pub capacity: u32,
    /// Ordered list of positions where actors queue or are served.
    pub service_points: Vec<Position>,
    /// Ordered operating-hours windows.
    pub open_hours: Vec<OpenHours>,
}

/// One operating-hours window: which days and seasons it applies to, and the
/// start/end hour of day (0..24, end exclusive).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OpenHours {
    /// Days of the week this window applies on (0 = Sunday .. 6 = Saturday).
    pub days_of_week: BTreeSet<u8>,
    /// Seasons this window applies in (engine-defined season index).
    pub seasons: BTreeSet<u8>,
    /// Inclusive start hour.
    pub start_hour: u8,
    /// Exclusive end hour.
    pub end_hour: u8,
}

impl OpenHours {
    /// Whether `day`/`season`/`hour` falls inside this window.
    #[must_use]
    pub fn contains(&self, day_of_week: u8, season: u8, hour: u8) -> bool {
        self.days_of_week.contains(&day_of_week)
            && self.seasons.contains(&season)
            && hour >= self.start_hour
            && hour < self.end_hour
    }
}

/// An immutable entity record. Entities are replaced wholesale on change —
/// there is no in-place mutation of a live `Entity` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier.
    pub id: EntityId,
    /// Free-form entity type (e.g. `"npc"`, `"item"`, `"building"`).
    pub entity_type: String,
    /// Case-insensitive tag set.
    pub tags: TagSet,
    /// Current grid position.
    pub position: Position,
    /// Case-insensitive numeric attribute map.
    pub attributes: BTreeMap<String, f64>,
    /// Optional building facet.
    pub building: Option<Building>,
}

/// The well-known attribute key mirrored by `Building::open_flag`.
pub const OPEN_ATTRIBUTE: &str = "open";

/// The well-known attribute-key suffix that marks an item as consumed once
/// its value exceeds `0.5`. Matching is case-insensitive and checks the
/// attribute *name*, not a fixed key, since any attribute ending in this
/// suffix qualifies (e.g. `"freshness_consumed"`).
pub const CONSUMED_SUFFIX: &str = "consumed";

impl Entity {
    /// Case-insensitive attribute lookup, defaulting to `0.0`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> f64 {
        self.attribute_key(name)
            .and_then(|key| self.attributes.get(&key).copied())
            .unwrap_or(0.0)
    }

    /// Resolve `name` to the actual stored key, case-insensitively.
    fn attribute_key(&self, name: &str) -> Option<String> {
        let lower = name.to_ascii_lowercase();
        self.attributes
            .keys()
            .find(|k| k.to_ascii_lowercase() == lower)
            .cloned()
    }

    /// Whether this entity is tagged `"item"` and carries any attribute
    /// whose name ends in `"consumed"` (case-insensitive) with a value
    /// greater than `0.5`.
    #[must_use]
    pub fn is_auto_consumable(&self) -> bool {
        if !self.tags.contains("item") {
            return false;
        }
        self.attributes.iter().any(|(key, value)| {
            key.to_ascii_lowercase().ends_with(CONSUMED_SUFFIX) && *value > 0.5
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(tags: &[&str], attrs: &[(&str, f64)]) -> Entity {
        Entity {
            id: EntityId::new("e1"),
            entity_type: "item".into(),
            tags: TagSet::normalize(tags.iter().map(|t| t.to_string())),
            position: Position::new(0, 0),
            attributes: attrs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
            building: None,
        }
    }

    #[test]
    fn tag_set_is_case_insensitive() {
        let tags = TagSet::normalize(vec!["Item", " food ", ""]);
        assert!(tags.contains("item"));
        assert!(tags.contains("FOOD"));
        assert_eq!(tags.iter().count(), 2);
    }

    #[test]
    fn attribute_lookup_is_case_insensitive() {
        let e = entity(&["item"], &[("Consumed", 1.0)]);
        assert!((e.attribute("consumed") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn auto_consumable_requires_item_tag_and_threshold() {
        let consumable = entity(&["item"], &[("freshness_consumed", 0.9)]);
        assert!(consumable.is_auto_consumable());

        let not_item = entity(&[], &[("consumed", 0.9)]);
        assert!(!not_item.is_auto_consumable());

        let below_threshold = entity(&["item"], &[("consumed", 0.4)]);
        assert!(!below_threshold.is_auto_consumable());
    }

    #[test]
    fn open_hours_window_membership() {
        let window = OpenHours {
            days_of_week: [1, 2, 3].into_iter().collect(),
            seasons: [0].into_iter().collect(),
            start_hour: 9,
            end_hour: 17,
        };
        assert!(window.contains(2, 0, 12));
        assert!(!window.contains(2, 0, 18));
        assert!(!window.contains(0, 0, 12));
    }
}
