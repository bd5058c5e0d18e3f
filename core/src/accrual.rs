//! Passive-production settlement.
//!
//! Two deliberately distinct settlement paths coexist:
//!   - `settle`: uncapped, runs before every balance check, keyed on
//!     `last_settlement`.
//!   - `apply_claim`: elapsed time capped at 24h, separate per-equipment
//!     rate table and a building-level multiplier, keyed on `last_claim`.
//! They are kept separate on purpose; do not unify them.

use crate::{
    account::PlayerAccount,
    catalog::Catalog,
    error::{GameError, GameResult},
    types::{Money, Timestamp},
};

/// Tier-A scaling: each level above 1 adds 10% of base production.
const TIER_A_STEP: f64 = 0.10;

/// Claim elapsed-hours cap.
const CLAIM_CAP_HOURS: f64 = 24.0;

/// Per-building-level claim multiplier step, capped at 2.0 overall.
const CLAIM_LEVEL_STEP: f64 = 0.02;

/// Passive production in units per hour across all owned equipment.
/// Equipment missing from the catalog contributes nothing.
pub fn settlement_rate(catalog: &Catalog, account: &PlayerAccount) -> f64 {
    account
        .equipment
        .iter()
        .filter_map(|owned| {
            let def = catalog.equipment.get(&owned.equipment_id)?;
            let base = def.base_production;
            Some(base + (owned.tier_a as f64 - 1.0) * base * TIER_A_STEP)
        })
        .sum()
}

/// Balance the account would hold at instant `t` if settled then.
/// Monotone non-decreasing in `t`; elapsed time is never negative.
pub fn projected_balance(catalog: &Catalog, account: &PlayerAccount, t: Timestamp) -> Money {
    let elapsed_secs = (t - account.last_settlement).num_seconds().max(0);
    let rate_per_hour = settlement_rate(catalog, account);
    let produced = (rate_per_hour / 3600.0 * elapsed_secs as f64).floor() as Money;
    account.dirty_money + produced
}

/// Crystallize elapsed production into the balance. Idempotent at a
/// fixed instant. Returns the settled delta.
pub fn settle(catalog: &Catalog, account: &mut PlayerAccount, t: Timestamp) -> Money {
    let projected = projected_balance(catalog, account, t);
    let delta = projected - account.dirty_money;
    account.dirty_money = projected;
    if t > account.last_settlement {
        account.last_settlement = t;
    }
    account.lifetime_earned += delta;
    delta
}

/// The claim-path rate: a separate per-hour table, not scaled by tiers.
pub fn claim_rate(catalog: &Catalog, account: &PlayerAccount) -> f64 {
    account
        .equipment
        .iter()
        .filter_map(|owned| catalog.equipment.get(&owned.equipment_id))
        .map(|def| def.claim_rate)
        .sum()
}

/// Account-level claim multiplier from building levels, capped at 2.0.
pub fn claim_multiplier(account: &PlayerAccount) -> f64 {
    (1.0 + account.building_level_sum() as f64 * CLAIM_LEVEL_STEP).min(2.0)
}

/// The amount a claim at `now` would farm, before mutation.
pub fn claim_amount(catalog: &Catalog, account: &PlayerAccount, now: Timestamp) -> Money {
    let elapsed_hours =
        ((now - account.last_claim).num_seconds().max(0) as f64 / 3600.0).min(CLAIM_CAP_HOURS);
    let base = elapsed_hours * claim_rate(catalog, account);
    (base * claim_multiplier(account)).floor() as Money
}

/// Execute the capped claim. Fails before mutation when there is
/// nothing to collect. Returns the farmed amount; the caller runs the
/// referral cascade and bonus unlock on it.
pub fn apply_claim(
    catalog: &Catalog,
    account: &mut PlayerAccount,
    now: Timestamp,
) -> GameResult<Money> {
    let farmed = claim_amount(catalog, account, now);
    if farmed <= 0 {
        return Err(GameError::StateConflict("nothing to claim".into()));
    }
    account.dirty_money += farmed;
    account.lifetime_earned += farmed;
    account.last_claim = now;
    account.claim_count += 1;
    log::debug!(
        "claim: account={} farmed={} count={}",
        account.account_id,
        farmed,
        account.claim_count
    );
    Ok(farmed)
}
