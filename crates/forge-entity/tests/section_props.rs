use forge_entity::{
    check_permutation, default_sections, fields, move_section, sections, toggle_section_enabled,
    Attr, Direction, Entity,
};
use proptest::prelude::*;

const KEYS: [&str; 13] = [
    "hero", "media", "about", "features", "tech", "workflow", "faq", "trust", "services",
    "testimonials", "team", "contact", "blog",
];

fn product() -> Entity {
    Entity::new("p-1")
        .unwrap()
        .with(fields::SECTIONS, Attr::Map(default_sections()))
}

fn sorted_orders(entity: &Entity) -> Vec<i64> {
    let mut orders: Vec<i64> = sections(entity).unwrap().iter().map(|s| s.order).collect();
    orders.sort_unstable();
    orders
}

fn op() -> impl Strategy<Value = (usize, u8)> {
    (0..KEYS.len(), 0_u8..3)
}

proptest! {
    #[test]
    fn prop_moves_preserve_order_multiset(ops in prop::collection::vec(op(), 0..40)) {
        let start = product();
        let expected = sorted_orders(&start);
        let mut e = start;
        for (key, kind) in ops {
            e = match kind {
                0 => move_section(&e, KEYS[key], Direction::Up).unwrap(),
                1 => move_section(&e, KEYS[key], Direction::Down).unwrap(),
                _ => toggle_section_enabled(&e, KEYS[key]).unwrap(),
            };
        }
        prop_assert_eq!(sorted_orders(&e), expected);
        prop_assert!(check_permutation(&e).unwrap());
    }

    #[test]
    fn prop_up_then_down_restores(key in 1..KEYS.len()) {
        let e = product();
        let moved = move_section(&e, KEYS[key], Direction::Up).unwrap();
        let back = move_section(&moved, KEYS[key], Direction::Down).unwrap();
        prop_assert_eq!(back, e);
    }

    #[test]
    fn prop_toggle_keeps_order(key in 0..KEYS.len()) {
        let e = product();
        let toggled = toggle_section_enabled(&e, KEYS[key]).unwrap();
        let before: Vec<_> = sections(&e).unwrap().into_iter().map(|s| (s.key, s.order)).collect();
        let after: Vec<_> = sections(&toggled).unwrap().into_iter().map(|s| (s.key, s.order)).collect();
        prop_assert_eq!(before, after);
    }
}

#[test]
fn three_section_scenario() {
    let e = Entity::from_json(serde_json::json!({
        "id": "x",
        "sections": {
            "A": { "isEnabled": true, "order": 0, "priority": 0 },
            "B": { "isEnabled": true, "order": 1, "priority": 1 },
            "C": { "isEnabled": true, "order": 2, "priority": 2 }
        }
    }))
    .unwrap();
    let moved = move_section(&e, "B", Direction::Up).unwrap();
    let got: Vec<(String, i64)> = sections(&moved)
        .unwrap()
        .into_iter()
        .map(|s| (s.key, s.order))
        .collect();
    assert_eq!(
        got,
        vec![("B".to_string(), 0), ("A".to_string(), 1), ("C".to_string(), 2)]
    );
}
