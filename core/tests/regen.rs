//! Energy and ammo regeneration tests.

use chrono::{Duration, TimeZone, Utc};
use turf_core::{
    account::{OwnedEquipment, PlayerAccount},
    catalog::ENERGY_REFILL_INTERVAL_MS,
    regen,
    types::Timestamp,
};

fn t0() -> Timestamp {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn tired_account() -> PlayerAccount {
    let mut account = PlayerAccount::new("acct".into(), "pistol".into(), None, t0());
    account.energy = 2;
    account
}

fn interval() -> Duration {
    Duration::milliseconds(ENERGY_REFILL_INTERVAL_MS)
}

/// One point per full interval elapsed.
#[test]
fn energy_regenerates_per_interval() {
    let mut account = tired_account();
    regen::sync_energy(&mut account, t0() + interval() * 3);
    assert_eq!(account.energy, 5);
}

/// The regen clock resets to "now" whenever a point lands, so
/// sub-interval progress is lost.
#[test]
fn energy_bucket_truncation_drops_partial_progress() {
    let mut account = tired_account();

    // 2.5 intervals: +2, and the half interval is discarded.
    let first_sync = t0() + interval() * 5 / 2;
    regen::sync_energy(&mut account, first_sync);
    assert_eq!(account.energy, 4);
    assert_eq!(account.last_energy_tick, first_sync);

    // Another 0.9 interval later: still nothing.
    regen::sync_energy(&mut account, first_sync + interval() * 9 / 10);
    assert_eq!(account.energy, 4);
}

/// A sync below one full interval neither adds energy nor moves the
/// regen clock.
#[test]
fn energy_subinterval_sync_is_a_noop() {
    let mut account = tired_account();
    regen::sync_energy(&mut account, t0() + interval() / 2);
    assert_eq!(account.energy, 2);
    assert_eq!(account.last_energy_tick, t0(), "clock must not move on zero points");
}

/// Energy never exceeds the maximum.
#[test]
fn energy_caps_at_max() {
    let mut account = tired_account();
    regen::sync_energy(&mut account, t0() + interval() * 1_000);
    assert_eq!(account.energy, account.energy_max);
}

/// No regeneration while shocked; the status auto-clears at expiry
/// and regeneration resumes.
#[test]
fn shock_blocks_regeneration() {
    let mut account = tired_account();
    account.shock_until = Some(t0() + Duration::minutes(30));

    regen::sync_energy(&mut account, t0() + Duration::minutes(15));
    assert_eq!(account.energy, 2, "regen while shocked");
    assert!(account.shock_until.is_some());

    // Past expiry: shock clears and the elapsed time counts again.
    regen::sync_energy(&mut account, t0() + Duration::minutes(45));
    assert!(account.shock_until.is_none(), "shock must auto-clear");
    assert!(account.energy > 2);
}

/// Ammo resets to 5 + Σ(tier_b − 1) on the first sync of a new UTC
/// day: tiers {1, 3, 5} give 5 + 0 + 2 + 4 = 11.
#[test]
fn ammo_daily_reset_uses_tier_b() {
    let mut account = tired_account();
    account.equipment = vec![
        OwnedEquipment {
            equipment_id: "pistol".into(),
            tier_a: 1,
            tier_b: 1,
            tier_c: 1,
        },
        OwnedEquipment {
            equipment_id: "shotgun".into(),
            tier_a: 1,
            tier_b: 3,
            tier_c: 1,
        },
        OwnedEquipment {
            equipment_id: "rifle".into(),
            tier_a: 1,
            tier_b: 5,
            tier_c: 1,
        },
    ];
    account.ammo = 0;

    // Same day: no reset.
    regen::reset_ammo_if_new_day(&mut account, t0() + Duration::hours(1));
    assert_eq!(account.ammo, 0);

    // New UTC day: full capacity.
    regen::reset_ammo_if_new_day(&mut account, t0() + Duration::days(1));
    assert_eq!(account.ammo, 11);
}

/// Ammo and energy reset independently; the daily mission set clears
/// on day change too.
#[test]
fn daily_sync_resets_are_independent() {
    let mut account = tired_account();
    account.ammo = 1;
    account.missions_done.insert("collect-debts".into());

    let next_day = t0() + Duration::days(1);
    regen::sync(&mut account, next_day);

    assert_eq!(account.ammo, account.ammo_capacity());
    assert_eq!(account.energy, account.energy_max, "a day of energy regen caps out");
    assert!(account.missions_done.is_empty(), "mission set must clear daily");
}
