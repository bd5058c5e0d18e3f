//! Engine-level tests: registration, settlement flow, upgrades,
//! staffing, missions and the optimistic write guard.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use turf_core::{
    account::{BuildingId, PlayerAccount},
    clock::{Clock as _, FixedClock},
    engine::{GameEngine, TierTrack},
    error::GameError,
    types::Timestamp,
};

fn setup(seed: u64) -> (GameEngine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::at(
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    ));
    let engine = GameEngine::build_test(seed, clock.clone()).unwrap();
    (engine, clock)
}

fn edit(
    engine: &GameEngine,
    id: &str,
    now: Timestamp,
    f: impl FnOnce(&mut PlayerAccount),
) {
    let mut v = engine.store().require_account(id).unwrap();
    f(&mut v.account);
    engine.store().save_account(&v.account, v.version, now).unwrap();
}

fn account(engine: &GameEngine, id: &str) -> PlayerAccount {
    engine.store().require_account(id).unwrap().account
}

/// Registration creates a starter account: one equipment instance,
/// default resources, audit trail.
#[test]
fn registration_creates_starter_account() {
    let (mut engine, _clock) = setup(1);
    let id = engine.register(None).unwrap();
    let acct = account(&engine, &id);

    assert_eq!(acct.equipment.len(), 1);
    assert_eq!(acct.equipment[0].equipment_id, "pistol");
    assert_eq!(acct.ammo, 5);
    assert_eq!(acct.energy, 10);
    assert_eq!(acct.dirty_money, 0);

    assert_eq!(
        engine.store().count_events("account_registered").unwrap(),
        1
    );
}

/// Registering against an unknown referrer is refused.
#[test]
fn registration_validates_referrer() {
    let (mut engine, _clock) = setup(2);
    let err = engine.register(Some("no-such-account")).unwrap_err();
    assert!(matches!(err, GameError::NotFound { .. }));
}

/// Settle through the engine: production lands, the audit log records
/// the delta, and a second settle at the same instant adds nothing.
#[test]
fn settle_flow_end_to_end() {
    let (mut engine, clock) = setup(3);
    let id = engine.register(None).unwrap();

    clock.advance(Duration::hours(10));
    let first = engine.settle(&id).unwrap();
    assert_eq!(first.soft_balance, 1_000);
    assert_eq!(first.last_settlement, clock.now());

    let second = engine.settle(&id).unwrap();
    assert_eq!(second.soft_balance, 1_000, "same-instant settle must be zero");
}

/// Spending paths settle first: a claim right after a long absence
/// sees the produced balance before the spend-check.
#[test]
fn handlers_settle_before_balance_checks() {
    let (mut engine, clock) = setup(4);
    let id = engine.register(None).unwrap();
    clock.advance(Duration::hours(30));

    // Building upgrade costs 2000; passive production over 30h at
    // 100/hr covers it without an explicit settle call.
    let level = engine.upgrade_building(&id, BuildingId::Safehouse).unwrap();
    assert_eq!(level, 2);
    assert_eq!(account(&engine, &id).dirty_money, 1_000);
}

/// Equipment tier upgrades: cost, cap at 10, per-track bookkeeping.
#[test]
fn equipment_upgrades_cap_at_ten() {
    let (mut engine, clock) = setup(5);
    let id = engine.register(None).unwrap();
    let now = clock.now();
    edit(&engine, &id, now, |acct| {
        acct.dirty_money = 100_000;
        acct.equipment[0].tier_b = 9;
    });

    let level = engine
        .upgrade_equipment(&id, "pistol", 0, TierTrack::B)
        .unwrap();
    assert_eq!(level, 10);

    let err = engine
        .upgrade_equipment(&id, "pistol", 0, TierTrack::B)
        .unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));

    // Track A is untouched by track B upgrades.
    assert_eq!(account(&engine, &id).equipment[0].tier_a, 1);
}

/// An upgrade the player cannot afford is rejected before mutation.
#[test]
fn upgrades_require_funds() {
    let (mut engine, _clock) = setup(6);
    let id = engine.register(None).unwrap();
    let err = engine
        .upgrade_equipment(&id, "pistol", 0, TierTrack::A)
        .unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientResource { resource: "funds", .. }
    ));
    assert_eq!(account(&engine, &id).equipment[0].tier_a, 1);
}

/// Building levels stop at 5.
#[test]
fn building_levels_cap_at_five() {
    let (mut engine, clock) = setup(7);
    let id = engine.register(None).unwrap();
    edit(&engine, &id, clock.now(), |acct| {
        acct.dirty_money = 1_000_000;
    });

    for expected in 2..=5 {
        let level = engine.upgrade_building(&id, BuildingId::Safehouse).unwrap();
        assert_eq!(level, expected);
    }
    let err = engine.upgrade_building(&id, BuildingId::Safehouse).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}

/// Staff slots: out-of-range refused, occupied refused, expiry frees
/// the slot lazily.
#[test]
fn staff_slots_validated_and_pruned() {
    let (mut engine, clock) = setup(8);
    let id = engine.register(None).unwrap();
    edit(&engine, &id, clock.now(), |acct| {
        acct.dirty_money = 50_000;
    });

    // Safehouse has 2 slots.
    let err = engine
        .hire_staff(&id, "lookout", BuildingId::Safehouse, 2)
        .unwrap_err();
    assert!(matches!(err, GameError::Validation(_)));

    engine
        .hire_staff(&id, "lookout", BuildingId::Safehouse, 0)
        .unwrap();
    let err = engine
        .hire_staff(&id, "enforcer", BuildingId::Safehouse, 0)
        .unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));

    // Same slot index in another building is fine.
    engine
        .hire_staff(&id, "enforcer", BuildingId::Warehouse, 0)
        .unwrap();

    // After the 7-day contract expires the slot frees up on read.
    clock.advance(Duration::days(8));
    engine
        .hire_staff(&id, "lookout", BuildingId::Safehouse, 0)
        .unwrap();
    assert_eq!(account(&engine, &id).staff.len(), 1, "expired contracts pruned");
}

/// Missions: energy is spent, rewards cascade, repeats are blocked for
/// the day, and failure shocks the runner.
#[test]
fn missions_pay_or_shock() {
    let clock = Arc::new(FixedClock::at(
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    ));
    // Deterministic success.
    let mut catalog = turf_core::catalog::Catalog::default_test();
    catalog
        .missions
        .get_mut("collect-debts")
        .unwrap()
        .fail_chance = 0.0;
    let store = turf_core::store::LedgerStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut engine = GameEngine::new(store, catalog, clock.clone(), 9);

    let referrer = engine.register(None).unwrap();
    let id = engine.register(Some(&referrer)).unwrap();

    let response = engine.complete_mission(&id, "collect-debts").unwrap();
    assert!(response.succeeded);
    assert_eq!(response.reward, 400);
    assert_eq!(response.energy, 7);

    // Cascade on the mission reward: 7% of 400.
    assert_eq!(account(&engine, &referrer).dirty_money, 28);

    // Same mission again today: refused.
    let err = engine.complete_mission(&id, "collect-debts").unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));

    // Tomorrow it runs again.
    clock.advance(Duration::days(1));
    engine.complete_mission(&id, "collect-debts").unwrap();
}

/// A guaranteed-failure mission applies Shock and blocks further
/// missions until expiry.
#[test]
fn failed_mission_shocks() {
    let clock = Arc::new(FixedClock::at(
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    ));
    let mut catalog = turf_core::catalog::Catalog::default_test();
    catalog
        .missions
        .get_mut("collect-debts")
        .unwrap()
        .fail_chance = 1.0;
    let store = turf_core::store::LedgerStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut engine = GameEngine::new(store, catalog, clock.clone(), 10);
    let id = engine.register(None).unwrap();

    let response = engine.complete_mission(&id, "collect-debts").unwrap();
    assert!(!response.succeeded);
    assert_eq!(response.reward, 0);
    assert!(response.shocked_until.is_some());

    let err = engine.complete_mission(&id, "collect-debts").unwrap_err();
    assert!(matches!(err, GameError::Incapacitated { .. }));

    // Shock also blocks heists.
    let err = engine.heist(&id, "corner-store").unwrap_err();
    assert!(matches!(err, GameError::Incapacitated { .. }));

    // Past expiry the runner is free again.
    clock.advance(Duration::hours(1));
    let response = engine.complete_mission(&id, "collect-debts").unwrap();
    assert!(!response.succeeded, "fail_chance 1.0 always shocks");
}

/// Banned accounts are refused all gameplay operations.
#[test]
fn banned_accounts_are_refused() {
    let (mut engine, clock) = setup(11);
    let id = engine.register(None).unwrap();
    edit(&engine, &id, clock.now(), |acct| {
        acct.banned = true;
    });
    let err = engine.claim(&id).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}

/// The versioned write refuses a stale save.
#[test]
fn optimistic_version_guard() {
    let (mut engine, clock) = setup(12);
    let id = engine.register(None).unwrap();
    let now = clock.now();

    let stale = engine.store().require_account(&id).unwrap();
    // A concurrent writer bumps the row.
    edit(&engine, &id, now, |acct| {
        acct.dirty_money = 123;
    });

    let err = engine
        .store()
        .save_account(&stale.account, stale.version, now)
        .unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
    assert_eq!(account(&engine, &id).dirty_money, 123, "stale write must not land");
}

/// Withdrawals come out of cash, never soft currency, and respect the
/// balance.
#[test]
fn withdraw_respects_cash_balance() {
    let (mut engine, _clock) = setup(13);
    let id = engine.register(None).unwrap();
    engine.deposit(&id, 500).unwrap();

    let err = engine.withdraw(&id, 100_000).unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientResource { resource: "funds", .. }
    ));

    let acct = account(&engine, &id);
    let cash = acct.cash;
    let remaining = engine.withdraw(&id, 100).unwrap();
    assert_eq!(remaining, cash - 100);
}
