//! Bounded, lazily-computed regeneration of energy and ammo.
//!
//! Pull, not push: there is no background scheduler. Both resets run
//! on the next read of the account.

use crate::{
    account::{day_key, PlayerAccount},
    catalog::ENERGY_REFILL_INTERVAL_MS,
    types::Timestamp,
};

/// Regenerate energy: one point per full refill interval elapsed,
/// capped at max. The regen clock resets to `now` whenever at least
/// one point lands, so sub-interval progress is lost (bucket
/// truncation). No regeneration while shocked.
pub fn sync_energy(account: &mut PlayerAccount, now: Timestamp) {
    if account.is_shocked(now) {
        return;
    }
    let elapsed_ms = (now - account.last_energy_tick).num_milliseconds().max(0);
    let points = (elapsed_ms / ENERGY_REFILL_INTERVAL_MS) as u32;
    if points == 0 {
        return;
    }
    account.energy = (account.energy + points).min(account.energy_max);
    account.last_energy_tick = now;
}

/// Reset ammo to full capacity (5 + Σ(tier_b − 1)) once per UTC
/// calendar day, independently of energy.
pub fn reset_ammo_if_new_day(account: &mut PlayerAccount, now: Timestamp) {
    let today = day_key(now);
    if account.last_ammo_reset_day.as_deref() == Some(today.as_str()) {
        return;
    }
    account.ammo = account.ammo_capacity();
    account.last_ammo_reset_day = Some(today);
}

/// Run every lazy per-account reset. Called by the engine right after
/// load, before any balance or resource check.
pub fn sync(account: &mut PlayerAccount, now: Timestamp) {
    sync_energy(account, now);
    reset_ammo_if_new_day(account, now);

    // Per-day mission completions clear on day change.
    let today = day_key(now);
    if account.missions_day.as_deref() != Some(today.as_str()) {
        account.missions_done.clear();
        account.missions_day = Some(today);
    }
}
