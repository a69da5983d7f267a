//! Navigation properties

use std::sync::Arc;

use forge_test_utils::record;
use forge_wizard::{Advance, GotoMode, StepCatalog, StepGate};
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Nav {
    Next,
    Prev,
    Goto(usize, bool),
}

fn nav() -> impl Strategy<Value = Nav> {
    prop_oneof![
        Just(Nav::Next),
        Just(Nav::Prev),
        (0_usize..25, any::<bool>()).prop_map(|(step, validated)| Nav::Goto(step, validated)),
    ]
}

proptest! {
    #[test]
    fn prop_position_stays_in_range(name in "[a-z]{0,4}", moves in prop::collection::vec(nav(), 0..60)) {
        let entity = record(json!({ "id": "p-1", "name": name }));
        let mut gate = StepGate::new(Arc::new(StepCatalog::product_forge()));
        let passable = name.chars().count() > 2;

        for m in moves {
            let before = gate.current();
            match m {
                Nav::Next => match gate.next(&entity) {
                    Advance::Moved(step) => {
                        prop_assert_eq!(step, before + 1);
                    }
                    Advance::Blocked(step) => {
                        prop_assert_eq!(step, 1);
                        prop_assert!(!passable);
                        prop_assert_eq!(gate.current(), before);
                    }
                    Advance::AtEnd => {
                        prop_assert_eq!(before, 22);
                    }
                },
                Nav::Prev => {
                    prop_assert_eq!(gate.prev(), before.saturating_sub(1).max(1));
                }
                Nav::Goto(step, validated) => {
                    let mode = if validated { GotoMode::Validated } else { GotoMode::BypassValidation };
                    match gate.goto(step, mode, &entity) {
                        Ok(Advance::Moved(to)) => {
                            prop_assert_eq!(to, step);
                        }
                        Ok(_) => {
                            prop_assert!(validated && !passable && step > 1);
                            prop_assert_eq!(gate.current(), before);
                        }
                        Err(_) => {
                            prop_assert!(step == 0 || step > 22);
                            prop_assert_eq!(gate.current(), before);
                        }
                    }
                }
            }
            prop_assert!((1..=22).contains(&gate.current()));
            prop_assert!(gate.progress() <= 100);
        }
    }
}
