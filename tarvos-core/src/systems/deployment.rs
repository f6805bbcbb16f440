//! Deployment orchestration: the once-per-tick pass over due army movements.
//!
//! Arrivals are grouped by target city; every combat-bound deployment in a
//! group fights as one coalition against the city's garrison plus its
//! previously stationed supporters, in a single resolution. Victors loot,
//! survivors turn around, and exactly one battle report is written per
//! resolved group. Returning deployments are processed independently and
//! unconditionally.

use crate::error::Result;
use crate::modifiers::{combine, research_modifiers, ModifierProvider};
use crate::state::{
    BattleReport, City, CityId, MovementStatus, PlayerId, ReportId, UnitDeployment, UnitStacks,
};
use crate::store::GameStore;
use crate::systems::{accrual, combat};
use crate::time::Timestamp;
use rand::Rng;
use rustc_hash::FxHashMap;
use tarvos_data::{ModifierTag, Resources, StaticData};

/// Travel time of the homeward leg after a battle.
pub const RETURN_TRAVEL_SECS: f64 = 1800.0;

/// Counters for one orchestrator pass, for the tick log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub groups_resolved: usize,
    pub returns_processed: usize,
    pub failures: usize,
}

/// Process every deployment due at `now`.
///
/// Failures are isolated per target-city group and per returning deployment:
/// the failing record keeps its persisted state and is retried next tick.
pub fn run_deployment_tick(
    store: &mut dyn GameStore,
    data: &StaticData,
    now: Timestamp,
    rng: &mut impl Rng,
) -> DeploymentSummary {
    let mut summary = DeploymentSummary::default();

    let due = store.due_deployments(now);
    let mut arriving_by_target: FxHashMap<CityId, Vec<UnitDeployment>> = FxHashMap::default();
    let mut returning = Vec::new();

    for deployment in due {
        match deployment.status {
            MovementStatus::Arriving => match deployment.target {
                Some(target) => arriving_by_target.entry(target).or_default().push(deployment),
                None => {
                    log::warn!("{}: arriving with no target, dropping", deployment.id);
                    let _ = store.delete_deployment(deployment.id);
                }
            },
            MovementStatus::Returning => returning.push(deployment),
            // due_deployments never returns stationed rows; tolerate a store
            // that violates that rather than poisoning the tick.
            MovementStatus::Stationed => {
                log::warn!("{}: stationed deployment reported due, skipping", deployment.id);
            }
        }
    }

    let mut targets: Vec<_> = arriving_by_target.keys().copied().collect();
    targets.sort();
    for target in targets {
        let group = &arriving_by_target[&target];
        match resolve_arrivals(store, data, target, group, now, rng) {
            Ok(()) => summary.groups_resolved += 1,
            Err(e) if e.is_not_found() => {
                log::debug!("skipping arrivals at {target}: {e}");
                summary.failures += 1;
            }
            Err(e) => {
                log::warn!("failed to resolve arrivals at {target}: {e}");
                summary.failures += 1;
            }
        }
    }

    for deployment in returning {
        match process_return(store, data, &deployment, now) {
            Ok(()) => summary.returns_processed += 1,
            Err(e) => {
                log::warn!("failed to process return of {}: {e}", deployment.id);
                summary.failures += 1;
            }
        }
    }

    summary
}

/// Resolve one target city's simultaneous arrivals.
fn resolve_arrivals(
    store: &mut dyn GameStore,
    data: &StaticData,
    target: CityId,
    group: &[UnitDeployment],
    now: Timestamp,
    rng: &mut impl Rng,
) -> Result<()> {
    let mut city = store.city(target)?;
    let defender_research = owner_research(store, data, city.owner);
    accrual::sync(&mut city, data, now, &defender_research)?;

    // Defense snapshot before this tick's supports station themselves: only
    // previously stationed entries fight alongside the garrison.
    let stationed = store.stationed_at(target);

    let (combat_bound, supports): (Vec<_>, Vec<_>) =
        group.iter().cloned().partition(|d| d.kind.is_combat());

    for mut support in supports {
        support.status = MovementStatus::Stationed;
        support.arrival_time = Timestamp::NEVER;
        log::info!("{}: {} {} stationed at {target}", support.id, support.quantity, support.unit);
        store.update_deployment(&support)?;
    }

    if combat_bound.is_empty() {
        store.put_city(city);
        return Ok(());
    }

    // One battle for the whole coalition, not one per attacker.
    let mut attackers = UnitStacks::default();
    for deployment in &combat_bound {
        *attackers.entry(deployment.unit).or_insert(0) += deployment.quantity;
    }
    let mut defenders = city.garrison.clone();
    for entry in &stationed {
        *defenders.entry(entry.unit).or_insert(0) += entry.quantity;
    }

    let outcome = combat::resolve(&attackers, &defenders, data, rng)?;
    let victory = outcome.attacker_victory();

    let stolen = if victory {
        loot_city(store, data, &mut city, &combat_bound, &outcome)
    } else {
        Resources::ZERO
    };

    persist_defenders(store, &mut city, &stationed, &defenders, &outcome)?;
    let surviving = dispatch_survivors(store, data, &combat_bound, &outcome, stolen, now)?;

    write_report(store, &city, &combat_bound, &outcome, stolen, now);
    store.put_city(city);

    log::info!(
        "battle at {target}: {} attackers vs {} defenders, {}, {} survivors returning",
        attackers.values().sum::<u32>(),
        defenders.values().sum::<u32>(),
        if victory { "attacker victory" } else { "defense held" },
        surviving,
    );
    Ok(())
}

/// Steal `take_ratio` of each resource, bounded by the survivors' carry
/// capacity. Debits the target immediately.
fn loot_city(
    store: &dyn GameStore,
    data: &StaticData,
    city: &mut City,
    combat_bound: &[UnitDeployment],
    outcome: &combat::BattleOutcome,
) -> Resources {
    let capacity = match carry_capacity(store, data, combat_bound, &outcome.remaining_attackers) {
        Ok(capacity) => capacity,
        Err(e) => {
            log::warn!("carry capacity unavailable, skipping loot: {e}");
            return Resources::ZERO;
        }
    };

    let available = city.resources.total();
    if available <= 0.0 || capacity <= 0.0 {
        return Resources::ZERO;
    }
    let take_ratio = (capacity / available).min(1.0);
    let stolen = city.resources.scaled(take_ratio);
    city.resources = city.resources.saturating_sub(&stolen);
    stolen
}

/// Coalition carry capacity: per-unit loot capacity of the survivors, scaled
/// by the `LootCapacity` modifier chain of the lead deployment's origin.
fn carry_capacity(
    store: &dyn GameStore,
    data: &StaticData,
    combat_bound: &[UnitDeployment],
    survivors: &UnitStacks,
) -> Result<f64> {
    let lead = &combat_bound[0];
    let origin_research = match store.city(lead.origin) {
        Ok(origin) => owner_research(store, data, origin.owner),
        Err(_) => Vec::new(),
    };
    let providers: [&dyn ModifierProvider; 1] = [&origin_research];
    let factor = combine(1.0, &[ModifierTag::LootCapacity], &providers).final_value;

    let mut capacity = 0.0;
    for (&unit, &quantity) in survivors {
        capacity += data.unit(unit)?.loot_capacity * factor * quantity as f64;
    }
    Ok(capacity)
}

/// Write surviving defenders back: stationed entries are updated (or deleted
/// when wiped) and the garrison takes the remainder, so nothing is counted
/// twice.
fn persist_defenders(
    store: &mut dyn GameStore,
    city: &mut City,
    stationed: &[UnitDeployment],
    pool: &UnitStacks,
    outcome: &combat::BattleOutcome,
) -> Result<()> {
    let mut new_garrison = UnitStacks::default();
    let mut stationed_updates: FxHashMap<crate::state::DeploymentId, u32> = FxHashMap::default();

    let mut units: Vec<_> = pool.keys().copied().collect();
    units.sort();
    for unit in units {
        let survivors = outcome
            .remaining_defenders
            .get(&unit)
            .copied()
            .unwrap_or(0);

        // Weights: garrison first, then each stationed entry of this type.
        let mut weights = vec![city.garrison.get(&unit).copied().unwrap_or(0)];
        let mut entries = Vec::new();
        for entry in stationed {
            if entry.unit == unit {
                weights.push(entry.quantity);
                entries.push(entry.id);
            }
        }

        let shares = proportional_split(&weights, survivors);
        if shares[0] > 0 {
            new_garrison.insert(unit, shares[0]);
        }
        for (id, share) in entries.into_iter().zip(shares.into_iter().skip(1)) {
            stationed_updates.insert(id, share);
        }
    }

    for entry in stationed {
        let share = stationed_updates.get(&entry.id).copied().unwrap_or(0);
        if share == 0 {
            store.delete_deployment(entry.id)?;
        } else if share != entry.quantity {
            let mut updated = entry.clone();
            updated.quantity = share;
            store.update_deployment(&updated)?;
        }
    }

    city.garrison = new_garrison;
    Ok(())
}

/// Turn surviving combat deployments around and split loot by carry
/// capacity. Wiped deployments are deleted outright. Returns the total
/// surviving quantity.
fn dispatch_survivors(
    store: &mut dyn GameStore,
    data: &StaticData,
    combat_bound: &[UnitDeployment],
    outcome: &combat::BattleOutcome,
    stolen: Resources,
    now: Timestamp,
) -> Result<u32> {
    // Survivors are attributed per unit type, proportional to each
    // deployment's original contribution of that type.
    let mut shares: FxHashMap<crate::state::DeploymentId, u32> = FxHashMap::default();
    let mut units: Vec<_> = outcome
        .remaining_attackers
        .keys()
        .chain(outcome.attacker_losses.keys())
        .copied()
        .collect();
    units.sort();
    units.dedup();

    for unit in units {
        let survivors = outcome
            .remaining_attackers
            .get(&unit)
            .copied()
            .unwrap_or(0);
        let members: Vec<_> = combat_bound.iter().filter(|d| d.unit == unit).collect();
        let weights: Vec<u32> = members.iter().map(|d| d.quantity).collect();
        let split = proportional_split(&weights, survivors);
        for (member, share) in members.into_iter().zip(split) {
            shares.insert(member.id, share);
        }
    }

    // Loot splits by surviving carry weight.
    let mut carry: FxHashMap<crate::state::DeploymentId, f64> = FxHashMap::default();
    let mut total_carry = 0.0;
    for deployment in combat_bound {
        let share = shares.get(&deployment.id).copied().unwrap_or(0);
        let weight = data.unit(deployment.unit)?.loot_capacity * share as f64;
        carry.insert(deployment.id, weight);
        total_carry += weight;
    }

    let mut surviving_total = 0;
    for deployment in combat_bound {
        let share = shares.get(&deployment.id).copied().unwrap_or(0);
        if share == 0 {
            store.delete_deployment(deployment.id)?;
            continue;
        }
        surviving_total += share;

        let mut updated = deployment.clone();
        updated.quantity = share;
        updated.status = MovementStatus::Returning;
        updated.target = None;
        updated.arrival_time = now.plus_secs(RETURN_TRAVEL_SECS);
        updated.loot = if total_carry > 0.0 {
            stolen.scaled(carry[&deployment.id] / total_carry)
        } else {
            Resources::ZERO
        };
        store.update_deployment(&updated)?;
    }
    Ok(surviving_total)
}

/// One report per resolved group, attributed to the lead attacker's owner.
fn write_report(
    store: &mut dyn GameStore,
    city: &City,
    combat_bound: &[UnitDeployment],
    outcome: &combat::BattleOutcome,
    stolen: Resources,
    now: Timestamp,
) {
    let lead = &combat_bound[0];
    let owner = match store.city(lead.origin).ok().and_then(|c| c.owner) {
        Some(owner) => owner,
        None => {
            log::debug!("no owner to attribute battle report at {}", city.id);
            return;
        }
    };

    let losses = |stacks: &UnitStacks| stacks.values().sum::<u32>();
    let title = if outcome.attacker_victory() {
        format!("Victory at {}", city.name)
    } else {
        format!("Defeat at {}", city.name)
    };
    let body = format!(
        "Attacked {} with a coalition of {} deployments. Losses: {} attackers, {} defenders. \
         Loot carried off: {}. Luck: {:.2}.",
        city.name,
        combat_bound.len(),
        losses(&outcome.attacker_losses),
        losses(&outcome.defender_losses),
        stolen,
        outcome.luck,
    );

    store.add_battle_report(BattleReport {
        id: ReportId(0),
        owner,
        title,
        body,
        created_at: now,
        read: false,
    });
}

/// Land a returning deployment: loot into the warehouse (capped), units back
/// into the garrison, record deleted.
fn process_return(
    store: &mut dyn GameStore,
    data: &StaticData,
    deployment: &UnitDeployment,
    now: Timestamp,
) -> Result<()> {
    let mut city = store.city(deployment.origin)?;
    let research = owner_research(store, data, city.owner);
    accrual::sync(&mut city, data, now, &research)?;

    let capacity = accrual::warehouse_capacity(&city, data)?;
    city.resources = (city.resources + deployment.loot).capped(capacity);
    city.add_units(deployment.unit, deployment.quantity);
    store.put_city(city);
    store.delete_deployment(deployment.id)?;

    log::info!(
        "{}: {} {} returned home to {} with {}",
        deployment.id,
        deployment.quantity,
        deployment.unit,
        deployment.origin,
        deployment.loot,
    );
    Ok(())
}

fn owner_research(
    store: &dyn GameStore,
    data: &StaticData,
    owner: Option<PlayerId>,
) -> Vec<tarvos_data::Modifier> {
    owner
        .and_then(|id| store.player(id).ok())
        .map(|player| research_modifiers(&player, data))
        .unwrap_or_default()
}

/// Split `total` across `weights` proportionally, conserving the sum.
///
/// Largest-remainder rounding; zero-weight entries never receive a share.
/// Requires `total <= sum(weights)`, which holds for survivor attribution.
fn proportional_split(weights: &[u32], total: u32) -> Vec<u32> {
    let sum: u64 = weights.iter().map(|&w| w as u64).sum();
    if sum == 0 || total == 0 {
        return vec![0; weights.len()];
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    let mut assigned: u32 = 0;
    for (index, &weight) in weights.iter().enumerate() {
        let exact = total as f64 * weight as f64 / sum as f64;
        let floor = exact.floor() as u32;
        shares.push(floor);
        assigned += floor;
        if weight > 0 {
            remainders.push((index, exact - floor as f64));
        }
    }

    remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        .then(a.0.cmp(&b.0)));
    let mut leftover = total - assigned;
    for (index, _) in remainders {
        if leftover == 0 {
            break;
        }
        shares[index] += 1;
        leftover -= 1;
    }
    shares
}
