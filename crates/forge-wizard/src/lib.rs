//! Forge Wizard - gated build steps
//!
//! Drives one entity through a fixed sequence of steps grouped into phases.
//!
//! # Core Concepts
//!
//! - [`StepCatalog`]: statically defined steps, each optionally guarded by a
//!   [`StepValidator`]
//! - [`StepGate`]: current position; `next` is validated, `prev` and
//!   bypassing `goto` are not
//! - [`ForgeSession`]: the entity being built or edited, its draft autosave
//!   and the final commit
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use forge_wizard::{Advance, StepCatalog, StepGate};
//!
//! let mut gate = StepGate::new(Arc::new(StepCatalog::product_forge()));
//! let entity = forge_entity::Entity::from_json(serde_json::json!({ "id": "p-1", "name": "Ab" }))?;
//!
//! assert_eq!(gate.next(&entity), Advance::Blocked(1));
//! # Ok::<(), forge_entity::EntityError>(())
//! ```

#![warn(unreachable_pub)]

mod gate;
mod session;
mod step;

pub use gate::{Advance, GateError, GotoMode, PhaseStatus, StepGate};
pub use session::{
    CommitOutcome, ForgeSession, SessionError, SessionMode, SessionResult, PRODUCT_COLLECTION,
};
pub use step::{configure_step, Phase, StepCatalog, StepDef, StepValidator};
