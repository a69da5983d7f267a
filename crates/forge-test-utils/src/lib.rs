//! Testing utilities for the Forge workspace
//!
//! Shared fixtures and proptest strategies.

#![allow(missing_docs)]

use forge_entity::{Attr, Entity, EntityStatus};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Entity from a JSON literal; panics on a missing id
pub fn record(value: Value) -> Entity {
    Entity::from_json(value).expect("fixture must carry a string id")
}

/// Committed product with a little of everything
pub fn sample_product(id: &str) -> Entity {
    record(json!({
        "id": id,
        "name": "Nexus UI Kit",
        "slug": "nexus-ui-kit",
        "sku": "SKU-NEXUS1",
        "status": EntityStatus::Published.as_str(),
        "price": 499,
        "currency": "INR",
        "createdAt": "2024-03-01T10:00:00.000Z",
        "updatedAt": "2024-03-02T10:00:00.000Z",
        "tags": ["ui", "kit"],
        "faqs": [{ "question": "Figma?", "answer": "Yes" }],
        "seo": { "metaTitle": "Nexus", "canonicalUrl": "" },
        "sections": {
            "hero": { "isEnabled": true, "order": 0, "priority": 0 },
            "media": { "isEnabled": true, "order": 1, "priority": 1 },
            "faq": { "isEnabled": false, "order": 2, "priority": 2 }
        }
    }))
}

/// Entity whose sections are `A`, `B`, `C` at orders 0, 1, 2
pub fn abc_sections() -> Entity {
    record(json!({
        "id": "p-abc",
        "sections": {
            "A": { "isEnabled": true, "order": 0, "priority": 0 },
            "B": { "isEnabled": true, "order": 1, "priority": 1 },
            "C": { "isEnabled": true, "order": 2, "priority": 2 }
        }
    }))
}

/// Entity with `count` enabled sections `s0..` in order
pub fn numbered_sections(count: usize) -> Entity {
    let sections: serde_json::Map<String, Value> = (0..count)
        .map(|i| {
            (
                format!("s{i}"),
                json!({ "isEnabled": true, "order": i, "priority": i }),
            )
        })
        .collect();
    record(json!({ "id": "p-num", "sections": sections }))
}

/// Field name segments
pub fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,5}"
}

/// Scalar attribute values
pub fn scalar_attr() -> impl Strategy<Value = Attr> {
    prop_oneof![
        Just(Attr::Null),
        any::<bool>().prop_map(Attr::from),
        any::<i64>().prop_map(Attr::from),
        "[ -~]{0,12}".prop_map(Attr::from),
    ]
}

/// Small JSON-shaped attribute trees
pub fn attr_tree() -> impl Strategy<Value = Attr> {
    scalar_attr().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|items| Attr::List(items.into_iter().collect())),
            prop::collection::btree_map(segment(), inner, 0..4)
                .prop_map(|map| Attr::Map(map.into_iter().collect())),
        ]
    })
}
