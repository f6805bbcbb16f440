//! Modifier stacking engine.
//!
//! Any entity that can expose tagged bonuses — a building level, a player's
//! completed research, a city's focus effects — implements the narrow
//! [`ModifierProvider`] capability. [`combine`] aggregates every matching
//! modifier into a final value:
//!
//! ```text
//! final = (base + Σflat) × max(0, 1 + Σincreased − Σdecreased)
//! ```
//!
//! Summation is commutative, so the result is independent of provider order,
//! and decreases can drive a value to zero but never invert it.

use crate::state::{City, Player};
use crate::time::Timestamp;
use tarvos_data::{Modifier, ModifierKind, ModifierTag, StaticData};

/// Capability to contribute tagged modifiers to a calculation.
pub trait ModifierProvider {
    fn collect_modifiers(&self, out: &mut Vec<Modifier>);
}

impl ModifierProvider for &[Modifier] {
    fn collect_modifiers(&self, out: &mut Vec<Modifier>) {
        out.extend_from_slice(self);
    }
}

impl ModifierProvider for Vec<Modifier> {
    fn collect_modifiers(&self, out: &mut Vec<Modifier>) {
        out.extend_from_slice(self);
    }
}

/// Modifiers contributed by every built level of a city's buildings.
pub struct CityBuildings<'a> {
    pub city: &'a City,
    pub data: &'a StaticData,
}

impl ModifierProvider for CityBuildings<'_> {
    fn collect_modifiers(&self, out: &mut Vec<Modifier>) {
        for (&building, &level) in &self.city.buildings {
            if level == 0 {
                continue;
            }
            match self.data.building_level(building, level) {
                Ok(config) => out.extend_from_slice(&config.modifiers),
                Err(e) => log::warn!("{}: skipping modifiers of {building}: {e}", self.city.id),
            }
        }
    }
}

/// A city's focus effects that have not expired as of the given instant.
pub struct ActiveFocuses<'a> {
    pub city: &'a City,
    pub as_of: Timestamp,
}

impl ModifierProvider for ActiveFocuses<'_> {
    fn collect_modifiers(&self, out: &mut Vec<Modifier>) {
        for effect in &self.city.focus_effects {
            if effect.expires > self.as_of {
                out.extend_from_slice(&effect.modifiers);
            }
        }
    }
}

/// Permanent modifiers granted by a player's completed research.
///
/// Returned as a plain list so callers can hand it to [`combine`] as a slice
/// provider (and share one lookup across several calculations).
pub fn research_modifiers(player: &Player, data: &StaticData) -> Vec<Modifier> {
    let mut modifiers = Vec::new();
    for completed in &player.completed_research {
        match data.research(completed.node) {
            Ok(node) => modifiers.extend_from_slice(&node.modifiers),
            Err(e) => log::warn!("{}: skipping research modifiers: {e}", player.id),
        }
    }
    modifiers
}

/// Result of one modifier aggregation, with the applied modifiers kept for
/// diagnostics (battle reports, admin tooling).
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub base: f64,
    pub flat_bonus: f64,
    pub increased: f64,
    pub decreased: f64,
    pub final_value: f64,
    pub applied: Vec<Modifier>,
}

impl Combination {
    /// The percentage multiplier, floored at zero.
    pub fn multiplier(&self) -> f64 {
        (1.0 + self.increased - self.decreased).max(0.0)
    }
}

/// Aggregate every modifier matching `target_tags` from `providers` onto
/// `base`. Pure and order-independent; no provider is mutated.
pub fn combine(
    base: f64,
    target_tags: &[ModifierTag],
    providers: &[&dyn ModifierProvider],
) -> Combination {
    let mut pool = Vec::new();
    for provider in providers {
        provider.collect_modifiers(&mut pool);
    }

    let mut flat_bonus = 0.0;
    let mut increased = 0.0;
    let mut decreased = 0.0;
    let mut applied = Vec::new();

    for modifier in pool {
        if !target_tags.contains(&modifier.tag) {
            continue;
        }
        match modifier.kind {
            ModifierKind::Flat => flat_bonus += modifier.magnitude,
            ModifierKind::Increased => increased += modifier.magnitude,
            ModifierKind::Decreased => decreased += modifier.magnitude,
        }
        applied.push(modifier);
    }

    let multiplier = (1.0 + increased - decreased).max(0.0);
    Combination {
        base,
        flat_bonus,
        increased,
        decreased,
        final_value: (base + flat_bonus) * multiplier,
        applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mods(list: &[Modifier]) -> Vec<Modifier> {
        list.to_vec()
    }

    #[test]
    fn test_combine_flat_and_percent() {
        let provider = mods(&[
            Modifier::flat(ModifierTag::WoodProduction, 5.0, "test"),
            Modifier::increased(ModifierTag::WoodProduction, 0.25, "test"),
            Modifier::decreased(ModifierTag::WoodProduction, 0.05, "test"),
        ]);

        let result = combine(20.0, &[ModifierTag::WoodProduction], &[&provider]);
        assert_eq!(result.flat_bonus, 5.0);
        assert_eq!(result.multiplier(), 1.2);
        assert!((result.final_value - 30.0).abs() < 1e-9);
        assert_eq!(result.applied.len(), 3);
    }

    #[test]
    fn test_combine_ignores_other_tags() {
        let provider = mods(&[
            Modifier::increased(ModifierTag::StoneProduction, 0.5, "test"),
            Modifier::increased(ModifierTag::ResourceProduction, 0.1, "test"),
        ]);

        let result = combine(
            10.0,
            &[ModifierTag::WoodProduction, ModifierTag::ResourceProduction],
            &[&provider],
        );
        assert_eq!(result.applied.len(), 1);
        assert!((result.final_value - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_decreases_never_invert() {
        let provider = mods(&[Modifier::decreased(ModifierTag::Population, 3.0, "plague")]);
        let result = combine(100.0, &[ModifierTag::Population], &[&provider]);
        assert_eq!(result.final_value, 0.0);
    }

    #[test]
    fn test_no_modifiers_is_identity() {
        let result = combine(42.0, &[ModifierTag::LootCapacity], &[]);
        assert_eq!(result.final_value, 42.0);
        assert!(result.applied.is_empty());
    }

    fn arb_modifier() -> impl Strategy<Value = Modifier> {
        (0..3u8, 0.0f64..10.0).prop_map(|(kind, magnitude)| match kind {
            0 => Modifier::flat(ModifierTag::WoodProduction, magnitude, "prop"),
            1 => Modifier::increased(ModifierTag::WoodProduction, magnitude, "prop"),
            _ => Modifier::decreased(ModifierTag::WoodProduction, magnitude, "prop"),
        })
    }

    proptest! {
        /// Permuting the provider list never changes the outcome.
        #[test]
        fn prop_combine_is_order_independent(
            modifiers in proptest::collection::vec(arb_modifier(), 0..8),
            base in 0.0f64..1000.0,
        ) {
            let mut reversed = modifiers.clone();
            reversed.reverse();

            let split = modifiers.len() / 2;
            let (front, back) = modifiers.split_at(split);

            let forward = combine(base, &[ModifierTag::WoodProduction], &[&modifiers]);
            let backward = combine(base, &[ModifierTag::WoodProduction], &[&reversed]);
            let chunked = combine(
                base,
                &[ModifierTag::WoodProduction],
                &[&back.to_vec(), &front.to_vec()],
            );

            prop_assert!((forward.final_value - backward.final_value).abs() < 1e-9);
            prop_assert!((forward.final_value - chunked.final_value).abs() < 1e-9);
        }
    }
}
