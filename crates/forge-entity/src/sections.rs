//! Layout section registry
//!
//! Sections live under the entity's `sections` field as a map from key to
//! `{ isEnabled, order, priority }`. Rendering follows ascending `order`,
//! and across one entity the orders form a permutation of `0..N`.
//!
//! Reordering never moves entries around; it exchanges the `order` values of
//! two neighbours, so the set of orders is unchanged by construction.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::{fields, Entity};
use crate::error::{EntityError, EntityResult};
use crate::path::FieldPath;
use crate::value::{Attr, AttrMap};

/// Default layout: `(key, enabled)` in render order
const DEFAULT_LAYOUT: [(&str, bool); 13] = [
    ("hero", true),
    ("media", true),
    ("about", true),
    ("features", true),
    ("tech", true),
    ("workflow", true),
    ("faq", true),
    ("trust", true),
    ("services", true),
    ("testimonials", true),
    ("team", false),
    ("contact", false),
    ("blog", false),
];

/// One named layout region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Registry key
    pub key: String,
    /// Whether the region renders
    pub is_enabled: bool,
    /// Position in the render sequence
    pub order: i64,
    /// Secondary weight, carried unexamined
    pub priority: i64,
}

impl Section {
    fn from_entry(key: &str, entry: &Attr) -> EntityResult<Self> {
        let malformed = |reason: &str| EntityError::MalformedSection {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let map = entry.as_map().ok_or_else(|| malformed("not a map"))?;
        let order = map
            .get("order")
            .and_then(Attr::as_i64)
            .ok_or_else(|| malformed("missing integer order"))?;
        Ok(Self {
            key: key.to_string(),
            is_enabled: map.get("isEnabled").and_then(Attr::as_bool).unwrap_or(false),
            order,
            priority: map.get("priority").and_then(Attr::as_i64).unwrap_or(order),
        })
    }
}

/// Direction of a single-step reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards order 0
    Up,
    /// Away from order 0
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("direction must be 'up' or 'down', got '{other}'")),
        }
    }
}

/// Default section map for a new entity
#[must_use]
pub fn default_sections() -> AttrMap {
    DEFAULT_LAYOUT
        .iter()
        .zip(0_i64..)
        .map(|(&(key, enabled), order)| {
            let entry: AttrMap = [
                ("isEnabled".to_string(), Attr::from(enabled)),
                ("order".to_string(), Attr::from(order)),
                ("priority".to_string(), Attr::from(order)),
            ]
            .into_iter()
            .collect();
            (key.to_string(), Attr::Map(entry))
        })
        .collect()
}

/// Sections of `entity` in render order
///
/// Ties on `order` (which a valid registry never has) fall back to key order.
/// An entity without a `sections` field has none.
///
/// # Errors
/// [`EntityError::MalformedSection`] for entries lacking an integer order
pub fn sections(entity: &Entity) -> EntityResult<Vec<Section>> {
    let Some(registry) = entity.field(fields::SECTIONS).and_then(Attr::as_map) else {
        return Ok(Vec::new());
    };
    let mut list = registry
        .iter()
        .map(|(key, entry)| Section::from_entry(key, entry))
        .collect::<EntityResult<Vec<_>>>()?;
    list.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.key.cmp(&b.key)));
    Ok(list)
}

fn section_path(key: &str, field: &str) -> FieldPath {
    FieldPath::new(vec![
        fields::SECTIONS.to_string(),
        key.to_string(),
        field.to_string(),
    ])
}

/// Flip `isEnabled` of one section; order is untouched
///
/// # Errors
/// [`EntityError::UnknownSection`] if `key` is not registered
pub fn toggle_section_enabled(entity: &Entity, key: &str) -> EntityResult<Entity> {
    let section = sections(entity)?
        .into_iter()
        .find(|s| s.key == key)
        .ok_or_else(|| EntityError::UnknownSection(key.to_string()))?;
    entity.with_field(&section_path(key, "isEnabled"), Attr::from(!section.is_enabled))
}

/// Swap the order of `key` with its neighbour in `direction`
///
/// Moving the first section up or the last one down returns the entity
/// unchanged.
///
/// # Errors
/// [`EntityError::UnknownSection`] if `key` is not registered
pub fn move_section(entity: &Entity, key: &str, direction: Direction) -> EntityResult<Entity> {
    let sorted = sections(entity)?;
    let index = sorted
        .iter()
        .position(|s| s.key == key)
        .ok_or_else(|| EntityError::UnknownSection(key.to_string()))?;
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|&j| j < sorted.len()),
    };
    let Some(neighbour) = neighbour else {
        return Ok(entity.clone());
    };
    let (moved, other) = (&sorted[index], &sorted[neighbour]);
    entity
        .with_field(&section_path(&moved.key, "order"), Attr::from(other.order))?
        .with_field(&section_path(&other.key, "order"), Attr::from(moved.order))
}

/// Whether the section orders form exactly `0..N`
///
/// # Errors
/// [`EntityError::MalformedSection`] for unreadable entries
pub fn check_permutation(entity: &Entity) -> EntityResult<bool> {
    Ok(sections(entity)?
        .iter()
        .zip(0_i64..)
        .all(|(section, expected)| section.order == expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn abc() -> Entity {
        Entity::from_json(json!({
            "id": "p-1",
            "sections": {
                "a": { "isEnabled": true, "order": 0, "priority": 0 },
                "b": { "isEnabled": true, "order": 1, "priority": 1 },
                "c": { "isEnabled": false, "order": 2, "priority": 2 }
            }
        }))
        .unwrap()
    }

    fn orders(entity: &Entity) -> Vec<(String, i64)> {
        sections(entity)
            .unwrap()
            .into_iter()
            .map(|s| (s.key, s.order))
            .collect()
    }

    fn pairs(items: &[(&str, i64)]) -> Vec<(String, i64)> {
        items.iter().map(|(k, o)| ((*k).to_string(), *o)).collect()
    }

    #[test]
    fn move_up_swaps_orders() {
        let moved = move_section(&abc(), "b", Direction::Up).unwrap();
        assert_eq!(orders(&moved), pairs(&[("b", 0), ("a", 1), ("c", 2)]));
    }

    #[test]
    fn move_down_swaps_orders() {
        let moved = move_section(&abc(), "a", Direction::Down).unwrap();
        assert_eq!(orders(&moved), pairs(&[("b", 0), ("a", 1), ("c", 2)]));
    }

    #[test]
    fn boundary_moves_are_noops() {
        let e = abc();
        assert_eq!(move_section(&e, "a", Direction::Up).unwrap(), e);
        assert_eq!(move_section(&e, "c", Direction::Down).unwrap(), e);
    }

    #[test]
    fn up_then_down_restores() {
        let e = abc();
        let there = move_section(&e, "c", Direction::Up).unwrap();
        let back = move_section(&there, "c", Direction::Down).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn move_only_touches_orders() {
        let moved = move_section(&abc(), "b", Direction::Up).unwrap();
        let b = sections(&moved).unwrap().into_iter().find(|s| s.key == "b").unwrap();
        assert!(b.is_enabled);
        assert_eq!(b.priority, 1);
    }

    #[test]
    fn toggle_flips_only_enabled() {
        let e = toggle_section_enabled(&abc(), "c").unwrap();
        let c = sections(&e).unwrap().into_iter().find(|s| s.key == "c").unwrap();
        assert!(c.is_enabled);
        assert_eq!(c.order, 2);
        let e = toggle_section_enabled(&e, "c").unwrap();
        assert_eq!(e, abc());
    }

    #[test]
    fn unknown_keys_error() {
        assert_eq!(
            toggle_section_enabled(&abc(), "zzz"),
            Err(EntityError::UnknownSection("zzz".to_string()))
        );
        assert_eq!(
            move_section(&abc(), "zzz", Direction::Up),
            Err(EntityError::UnknownSection("zzz".to_string()))
        );
    }

    #[test]
    fn malformed_entry() {
        let e = Entity::from_json(json!({ "id": "x", "sections": { "a": { "order": "first" } } }))
            .unwrap();
        assert!(matches!(sections(&e), Err(EntityError::MalformedSection { .. })));
    }

    #[test]
    fn no_registry_means_no_sections() {
        let e = Entity::new("x").unwrap();
        assert!(sections(&e).unwrap().is_empty());
        assert!(check_permutation(&e).unwrap());
    }

    #[test]
    fn defaults_form_a_permutation() {
        let e = Entity::new("x")
            .unwrap()
            .with(fields::SECTIONS, Attr::Map(default_sections()));
        let list = sections(&e).unwrap();
        assert_eq!(list.len(), 13);
        assert_eq!(list[0].key, "hero");
        assert_eq!(list[12].key, "blog");
        assert!(!list[10].is_enabled);
        assert!(list[9].is_enabled);
        assert!(list.iter().all(|s| s.priority == s.order));
        assert!(check_permutation(&e).unwrap());
    }

    #[test]
    fn gaps_are_not_a_permutation() {
        let e = Entity::from_json(json!({
            "id": "x",
            "sections": { "a": { "order": 0 }, "b": { "order": 2 } }
        }))
        .unwrap();
        assert!(!check_permutation(&e).unwrap());
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("up".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!(Direction::Down.to_string(), "down");
        assert!("sideways".parse::<Direction>().is_err());
    }
}
