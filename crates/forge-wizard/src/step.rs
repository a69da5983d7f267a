//! Step catalog
//!
//! Steps are numbered from 1 and grouped into contiguous phases. Each step
//! may carry a validator that decides whether the entity is ready to move
//! past it; steps without one are always passable.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::RangeInclusive;
use std::sync::Arc;

use forge_entity::Entity;
use serde::{Deserialize, Serialize};

/// Group of contiguous steps shown together in progress displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Identity, pricing and access
    Genesis,
    /// Narrative and attributes
    Abstraction,
    /// Technical make-up and supporting content
    Systems,
    /// Layout, discovery and release
    Launch,
}

impl Phase {
    /// All phases in display order
    pub const ALL: [Phase; 4] = [
        Phase::Genesis,
        Phase::Abstraction,
        Phase::Systems,
        Phase::Launch,
    ];

    /// Display label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Genesis => "Genesis",
            Self::Abstraction => "Abstraction",
            Self::Systems => "Systems",
            Self::Launch => "Launch",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decides whether an entity may move past a step
pub trait StepValidator: Send + Sync {
    /// `true` when the step is satisfied
    fn validate(&self, entity: &Entity) -> bool;
}

impl<F> StepValidator for F
where
    F: Fn(&Entity) -> bool + Send + Sync,
{
    fn validate(&self, entity: &Entity) -> bool {
        self(entity)
    }
}

/// One step of the catalog
#[derive(Clone)]
pub struct StepDef {
    index: usize,
    title: String,
    phase: Phase,
    validator: Option<Arc<dyn StepValidator>>,
}

impl StepDef {
    /// 1-based position
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Display title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Owning phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a validator guards this step
    #[inline]
    #[must_use]
    pub fn is_gated(&self) -> bool {
        self.validator.is_some()
    }

    /// Run the validator; ungated steps always pass
    #[must_use]
    pub fn can_advance(&self, entity: &Entity) -> bool {
        self.validator.as_ref().map_or(true, |v| v.validate(entity))
    }
}

impl Debug for StepDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDef")
            .field("index", &self.index)
            .field("title", &self.title)
            .field("phase", &self.phase)
            .field("gated", &self.is_gated())
            .finish()
    }
}

/// Ordered, statically defined steps
#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    steps: Vec<StepDef>,
}

impl StepCatalog {
    /// Empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an always-passable step
    #[must_use]
    pub fn step(self, title: impl Into<String>, phase: Phase) -> Self {
        self.push(title.into(), phase, None)
    }

    /// Append a step guarded by `validator`
    #[must_use]
    pub fn gated(
        self,
        title: impl Into<String>,
        phase: Phase,
        validator: impl StepValidator + 'static,
    ) -> Self {
        self.push(title.into(), phase, Some(Arc::new(validator)))
    }

    fn push(mut self, title: String, phase: Phase, validator: Option<Arc<dyn StepValidator>>) -> Self {
        let index = self.steps.len() + 1;
        self.steps.push(StepDef {
            index,
            title,
            phase,
            validator,
        });
        self
    }

    /// The 22-step product build
    #[must_use]
    pub fn product_forge() -> Self {
        use Phase::{Abstraction, Genesis, Launch, Systems};

        Self::new()
            .gated("Identity Genesis", Genesis, name_is_long_enough)
            .step("Categorization", Genesis)
            .step("Gallery", Genesis)
            .step("Price Matrix", Genesis)
            .step("Purchase Logic", Genesis)
            .step("Access Protocol", Genesis)
            .step("Product Abstract", Abstraction)
            .step("Core Attributes", Abstraction)
            .step("Objectives", Abstraction)
            .step("Future Scope", Abstraction)
            .step("Tech Stack", Abstraction)
            .step("Architecture", Abstraction)
            .step("Workflow", Systems)
            .step("System Modules", Systems)
            .step("Asset Vault", Systems)
            .step("Reputation Logic", Systems)
            .step("Knowledge Nodes", Systems)
            .step("Related Assets", Systems)
            .step("Neural Intelligence", Launch)
            .step("Layout Switchboard", Launch)
            .step("SEO Discovery", Launch)
            .step("Registry Launch", Launch)
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the catalog has no steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at 1-based `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StepDef> {
        index.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    /// Steps in order
    pub fn iter(&self) -> impl Iterator<Item = &StepDef> {
        self.steps.iter()
    }

    /// Whether `entity` may move past step `index`; unknown steps never pass
    #[must_use]
    pub fn can_advance(&self, index: usize, entity: &Entity) -> bool {
        self.get(index).is_some_and(|step| step.can_advance(entity))
    }

    /// Step range of `phase`, if any step belongs to it
    #[must_use]
    pub fn phase_range(&self, phase: Phase) -> Option<RangeInclusive<usize>> {
        let mut members = self.steps.iter().filter(|s| s.phase == phase).map(|s| s.index);
        let first = members.next()?;
        let last = members.last().unwrap_or(first);
        Some(first..=last)
    }
}

fn name_is_long_enough(entity: &Entity) -> bool {
    entity.name().is_some_and(|name| name.chars().count() > 2)
}

/// Build step that configures section `key`, for deep links from the layout
#[must_use]
pub fn configure_step(key: &str) -> Option<usize> {
    match key {
        "media" => Some(3),
        "about" => Some(7),
        "tech" => Some(11),
        "workflow" => Some(13),
        "services" => Some(14),
        "testimonials" => Some(16),
        "faq" => Some(17),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_test_utils::record;
    use serde_json::json;

    #[test]
    fn product_catalog_shape() {
        let catalog = StepCatalog::product_forge();
        assert_eq!(catalog.len(), 22);
        assert_eq!(catalog.get(1).unwrap().title(), "Identity Genesis");
        assert_eq!(catalog.get(22).unwrap().title(), "Registry Launch");
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(23).is_none());

        assert_eq!(catalog.phase_range(Phase::Genesis), Some(1..=6));
        assert_eq!(catalog.phase_range(Phase::Abstraction), Some(7..=12));
        assert_eq!(catalog.phase_range(Phase::Systems), Some(13..=18));
        assert_eq!(catalog.phase_range(Phase::Launch), Some(19..=22));

        let gated: Vec<usize> = catalog.iter().filter(|s| s.is_gated()).map(StepDef::index).collect();
        assert_eq!(gated, vec![1]);
    }

    #[test]
    fn identity_step_needs_three_characters() {
        let catalog = StepCatalog::product_forge();
        let named = |name: &str| record(json!({ "id": "p-1", "name": name }));
        assert!(!catalog.can_advance(1, &named("Ab")));
        assert!(catalog.can_advance(1, &named("Abc")));
        assert!(catalog.can_advance(1, &named("Åbç")));
        assert!(!catalog.can_advance(1, &record(json!({ "id": "p-1" }))));
        assert!(catalog.can_advance(2, &named("")));
        assert!(!catalog.can_advance(99, &named("Abc")));
    }

    #[test]
    fn custom_validators() {
        let catalog = StepCatalog::new()
            .gated("priced", Phase::Genesis, |e: &Entity| e.field("price").is_some())
            .step("done", Phase::Launch);
        assert!(!catalog.can_advance(1, &record(json!({ "id": "a" }))));
        assert!(catalog.can_advance(1, &record(json!({ "id": "a", "price": 1 }))));
        assert_eq!(catalog.phase_range(Phase::Systems), None);
    }

    #[test]
    fn deep_links() {
        assert_eq!(configure_step("media"), Some(3));
        assert_eq!(configure_step("faq"), Some(17));
        assert_eq!(configure_step("hero"), None);
    }
}
