//! Combat resolution for one engagement.
//!
//! Pure aside from the caller-supplied RNG: given two unit compositions, the
//! engine computes one simultaneous damage exchange and distributes
//! casualties front-to-back by reach. Units are conserved per type:
//! `remaining + losses == original` on both sides.

use crate::error::Result;
use crate::state::UnitStacks;
use rand::Rng;
use tarvos_data::{StaticData, UnitType};

/// Overall lethality of one exchange. Both directions of damage scale by
/// this before casualties are distributed.
pub const DAMAGE_SCALING: f64 = 0.5;

/// Outcome of one resolved engagement.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleOutcome {
    pub remaining_attackers: UnitStacks,
    pub remaining_defenders: UnitStacks,
    pub attacker_losses: UnitStacks,
    pub defender_losses: UnitStacks,
    /// The luck roll in `[0.8, 1.2]` that scaled this exchange.
    pub luck: f64,
}

impl BattleOutcome {
    pub fn attackers_remaining_total(&self) -> u32 {
        self.remaining_attackers.values().sum()
    }

    /// Attacker victory: any attacking unit left standing.
    pub fn attacker_victory(&self) -> bool {
        self.attackers_remaining_total() > 0
    }
}

/// Resolve one engagement with a fresh luck roll.
pub fn resolve(
    attackers: &UnitStacks,
    defenders: &UnitStacks,
    data: &StaticData,
    rng: &mut impl Rng,
) -> Result<BattleOutcome> {
    let luck = 0.8 + rng.gen::<f64>() * 0.4;
    resolve_with_luck(attackers, defenders, data, luck, rng)
}

/// Resolve one engagement with a fixed luck roll.
///
/// Luck is asymmetric by design: the attacker's power scales by `luck` and
/// the defender's by `1/luck`, so a single roll favours one side of the
/// exchange in both directions at once.
pub fn resolve_with_luck(
    attackers: &UnitStacks,
    defenders: &UnitStacks,
    data: &StaticData,
    luck: f64,
    rng: &mut impl Rng,
) -> Result<BattleOutcome> {
    let attacker_power = effective_power(attackers, data)?;
    let defender_power = effective_power(defenders, data)?;

    let damage_to_defender = attacker_power * luck * DAMAGE_SCALING;
    let damage_to_attacker = defender_power * (1.0 / luck) * DAMAGE_SCALING;

    let (remaining_attackers, attacker_losses) =
        distribute(attackers, damage_to_attacker, data, rng)?;
    let (remaining_defenders, defender_losses) =
        distribute(defenders, damage_to_defender, data, rng)?;

    log::debug!(
        "engagement: {attacker_power:.0} power vs {defender_power:.0} power, luck {luck:.3}"
    );

    Ok(BattleOutcome {
        remaining_attackers,
        remaining_defenders,
        attacker_losses,
        defender_losses,
        luck,
    })
}

/// Total power of a side: `quantity × base × (1 + discipline/100)` per stack.
fn effective_power(stacks: &UnitStacks, data: &StaticData) -> Result<f64> {
    let mut total = 0.0;
    for (&unit, &quantity) in stacks {
        let stats = data.unit(unit)?;
        total += quantity as f64 * stats.power * (1.0 + stats.discipline / 100.0);
    }
    Ok(total)
}

/// Stacks ordered for casualty distribution: lowest reach dies first, ties
/// broken by unit id so the walk is deterministic.
fn frontline_order(stacks: &UnitStacks, data: &StaticData) -> Result<Vec<(UnitType, u32)>> {
    let mut ordered: Vec<(UnitType, u32, u8)> = Vec::with_capacity(stacks.len());
    for (&unit, &quantity) in stacks {
        ordered.push((unit, quantity, data.unit(unit)?.reach));
    }
    ordered.sort_by_key(|&(unit, _, reach)| (reach, unit));
    Ok(ordered.into_iter().map(|(unit, q, _)| (unit, q)).collect())
}

/// Walk the frontline order spending `damage` on whole-unit kills.
///
/// When the leftover damage cannot guarantee another kill, exactly one
/// probabilistic "chip" kill is rolled with probability
/// `remaining_damage / armor_per_unit`, then the damage is exhausted.
fn distribute(
    stacks: &UnitStacks,
    damage: f64,
    data: &StaticData,
    rng: &mut impl Rng,
) -> Result<(UnitStacks, UnitStacks)> {
    let mut remaining = UnitStacks::default();
    let mut losses = UnitStacks::default();
    let mut damage_left = damage;

    for (unit, quantity) in frontline_order(stacks, data)? {
        let mut alive = quantity;

        if damage_left > 0.0 && alive > 0 {
            let stats = data.unit(unit)?;
            let armor_per_unit = stats.armor * (1.0 + stats.discipline / 100.0);

            let killed = ((damage_left / armor_per_unit).floor() as u32).min(alive);
            alive -= killed;
            damage_left -= killed as f64 * armor_per_unit;

            if killed > 0 {
                losses.insert(unit, killed);
            }

            // Leftover damage too small for a guaranteed kill: one chip roll,
            // then the exchange is spent.
            if alive > 0 && damage_left > 0.0 {
                let chip_chance = damage_left / armor_per_unit;
                if rng.gen::<f64>() < chip_chance {
                    alive -= 1;
                    *losses.entry(unit).or_insert(0) += 1;
                }
                damage_left = 0.0;
            }
        }

        if alive > 0 {
            remaining.insert(unit, alive);
        }
    }

    Ok((remaining, losses))
}
