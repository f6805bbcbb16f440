//! Research tree: nodes bought with research points that grant permanent
//! player-wide modifiers.

use crate::modifiers::{Modifier, ModifierTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ResearchId(pub u16);

impl fmt::Display for ResearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "research#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchNode {
    pub id: ResearchId,
    pub name: String,
    /// Research-point cost, debited at submission.
    pub cost: f64,
    pub duration_secs: f64,
    /// Permanent modifiers granted on completion.
    pub modifiers: Vec<Modifier>,
}

fn node(
    id: u16,
    name: &str,
    cost: f64,
    duration_secs: f64,
    modifiers: Vec<Modifier>,
) -> ResearchNode {
    ResearchNode {
        id: ResearchId(id),
        name: name.to_string(),
        cost,
        duration_secs,
        modifiers,
    }
}

pub(crate) fn standard_catalog() -> HashMap<ResearchId, ResearchNode> {
    let nodes = vec![
        node(
            1,
            "Forestry",
            120.0,
            1800.0,
            vec![Modifier::increased(ModifierTag::WoodProduction, 0.10, "forestry")],
        ),
        node(
            2,
            "Masonry",
            120.0,
            1800.0,
            vec![Modifier::increased(ModifierTag::StoneProduction, 0.10, "masonry")],
        ),
        node(
            3,
            "Metallurgy",
            140.0,
            2400.0,
            vec![Modifier::increased(ModifierTag::MetalProduction, 0.10, "metallurgy")],
        ),
        node(
            4,
            "Irrigation",
            150.0,
            2700.0,
            vec![Modifier::increased(ModifierTag::Population, 0.08, "irrigation")],
        ),
        node(
            5,
            "Conscription",
            180.0,
            3600.0,
            vec![Modifier::increased(ModifierTag::RecruitmentSpeed, 0.15, "conscription")],
        ),
        node(
            6,
            "Scholarship",
            200.0,
            3600.0,
            vec![Modifier::increased(ModifierTag::ResearchSpeed, 0.20, "scholarship")],
        ),
        node(
            7,
            "Saddlebags",
            160.0,
            3000.0,
            vec![Modifier::increased(ModifierTag::LootCapacity, 0.25, "saddlebags")],
        ),
        node(
            8,
            "Engineering",
            170.0,
            3200.0,
            vec![Modifier::increased(ModifierTag::ConstructionSpeed, 0.10, "engineering")],
        ),
    ];

    nodes.into_iter().map(|n| (n.id, n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_node_grants_a_modifier() {
        for node in standard_catalog().values() {
            assert!(!node.modifiers.is_empty(), "{} grants nothing", node.name);
            assert!(node.cost > 0.0);
            assert!(node.duration_secs > 0.0);
        }
    }
}
