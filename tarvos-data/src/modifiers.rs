//! Modifier records: tagged numeric effects contributed by buildings,
//! research, and focus effects.
//!
//! A modifier is a read-only fact. The stacking rules (flat sums, additive
//! percentage pools, the non-negative multiplier floor) live in the engine;
//! content only declares tag, kind, and magnitude.

use crate::resources::ResourceType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a modifier's magnitude enters the final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Added to the base value before the percentage pool applies.
    Flat,
    /// Contributes `+magnitude` to the percentage pool.
    Increased,
    /// Contributes `-magnitude` to the percentage pool.
    Decreased,
}

/// Domain concept a modifier affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModifierTag {
    WoodProduction,
    StoneProduction,
    MetalProduction,
    /// Matches any resource's production, regardless of type.
    ResourceProduction,
    Population,
    ConstructionSpeed,
    RecruitmentSpeed,
    ResearchSpeed,
    LootCapacity,
}

impl ModifierTag {
    /// The production tag specific to one resource.
    pub fn for_resource(resource: ResourceType) -> ModifierTag {
        match resource {
            ResourceType::Wood => ModifierTag::WoodProduction,
            ResourceType::Stone => ModifierTag::StoneProduction,
            ResourceType::Metal => ModifierTag::MetalProduction,
        }
    }
}

/// One tagged numeric effect. `source` is diagnostic only and never enters
/// the arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub tag: ModifierTag,
    pub kind: ModifierKind,
    pub magnitude: f64,
    pub source: String,
}

impl Modifier {
    pub fn flat(tag: ModifierTag, magnitude: f64, source: impl Into<String>) -> Self {
        Self {
            tag,
            kind: ModifierKind::Flat,
            magnitude,
            source: source.into(),
        }
    }

    pub fn increased(tag: ModifierTag, magnitude: f64, source: impl Into<String>) -> Self {
        Self {
            tag,
            kind: ModifierKind::Increased,
            magnitude,
            source: source.into(),
        }
    }

    pub fn decreased(tag: ModifierTag, magnitude: f64, source: impl Into<String>) -> Self {
        Self {
            tag,
            kind: ModifierKind::Decreased,
            magnitude,
            source: source.into(),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ModifierKind::Flat => write!(f, "+{} {:?} ({})", self.magnitude, self.tag, self.source),
            ModifierKind::Increased => write!(
                f,
                "+{:.0}% {:?} ({})",
                self.magnitude * 100.0,
                self.tag,
                self.source
            ),
            ModifierKind::Decreased => write!(
                f,
                "-{:.0}% {:?} ({})",
                self.magnitude * 100.0,
                self.tag,
                self.source
            ),
        }
    }
}
