//! Referral cascade and bonus-gate tests.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use turf_core::{
    account::PlayerAccount,
    clock::{Clock as _, FixedClock},
    engine::GameEngine,
    error::GameError,
    referral,
    types::{Money, Timestamp},
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

fn balance(engine: &GameEngine, id: &str) -> Money {
    account(engine, id).dirty_money
}

/// Chain A←B←C←D: a 1000-unit earn by A credits B 70, C 20, D 10.
#[test]
fn cascade_pays_three_levels() {
    let (mut engine, clock) = setup(42);
    let d = engine.register(None).unwrap();
    let c = engine.register(Some(&d)).unwrap();
    let b = engine.register(Some(&c)).unwrap();
    let a = engine.register(Some(&b)).unwrap();

    let earner = account(&engine, &a);
    referral::cascade(engine.store(), &earner, 1_000, clock.now()).unwrap();

    assert_eq!(balance(&engine, &b), 70);
    assert_eq!(balance(&engine, &c), 20);
    assert_eq!(balance(&engine, &d), 10);
    assert_eq!(balance(&engine, &a), 0, "the earner keeps its own credit path");

    let d_acct = account(&engine, &d);
    assert_eq!(d_acct.referrals.earnings, [0, 0, 10]);
}

/// A 2-hop chain grants the first two levels and stops without error.
#[test]
fn cascade_stops_at_missing_hop() {
    let (mut engine, clock) = setup(7);
    let y = engine.register(None).unwrap();
    let x = engine.register(Some(&y)).unwrap();

    let earner = account(&engine, &x);
    referral::cascade(engine.store(), &earner, 1_000, clock.now()).unwrap();

    assert_eq!(balance(&engine, &y), 70);
    let y_acct = account(&engine, &y);
    assert_eq!(y_acct.referrals.earnings, [70, 0, 0]);
}

/// A cyclic chain (corrupt data) never loops and never double-credits.
#[test]
fn cascade_survives_cycles() {
    let (mut engine, clock) = setup(9);
    let p = engine.register(None).unwrap();
    let q = engine.register(Some(&p)).unwrap();
    let now = clock.now();
    edit(&engine, &p, now, |acct| {
        acct.referred_by = Some(q.clone());
    });

    let earner = account(&engine, &q);
    referral::cascade(engine.store(), &earner, 1_000, now).unwrap();

    assert_eq!(balance(&engine, &p), 70);
    assert_eq!(balance(&engine, &q), 0, "cycle back to the earner must stop");
}

/// Registration bumps signup counters three levels up and parks the
/// 5000 bonus on the direct referrer only.
#[test]
fn registration_records_signups_and_parks_bonus() {
    let (mut engine, _clock) = setup(11);
    let d = engine.register(None).unwrap();
    let c = engine.register(Some(&d)).unwrap();
    let b = engine.register(Some(&c)).unwrap();
    let _a = engine.register(Some(&b)).unwrap();

    let d_acct = account(&engine, &d);
    assert_eq!(d_acct.referrals.signups, [1, 1, 1]);
    assert_eq!(d_acct.pending_referral_bonus, 5_000);

    let b_acct = account(&engine, &b);
    assert_eq!(b_acct.referrals.signups, [1, 0, 0]);
    assert_eq!(b_acct.pending_referral_bonus, 5_000);
    assert_eq!(b_acct.dirty_money, 0, "parked bonus is locked, not liquid");
}

/// The third claim releases the parked bonus into the referrer's
/// liquid balance; later claims release nothing further.
#[test]
fn third_claim_releases_parked_bonus() {
    let (mut engine, clock) = setup(13);
    let referrer = engine.register(None).unwrap();
    let referred = engine.register(Some(&referrer)).unwrap();
    let now = clock.now();

    edit(&engine, &referred, now, |acct| {
        acct.claim_count = 2;
        acct.last_claim = now - Duration::hours(1);
    });

    engine.claim(&referred).unwrap();

    let ref_acct = account(&engine, &referrer);
    assert_eq!(ref_acct.pending_referral_bonus, 0);
    assert!(
        ref_acct.dirty_money >= 5_000,
        "bonus (plus cascade share) must be liquid"
    );
    assert!(account(&engine, &referred).referrer_bonus_paid);

    // A fourth claim releases nothing more.
    let liquid_after_release = balance(&engine, &referrer);
    edit(&engine, &referred, now, |acct| {
        acct.last_claim = now - Duration::hours(1);
    });
    engine.claim(&referred).unwrap();
    let ref_acct = account(&engine, &referrer);
    assert_eq!(ref_acct.pending_referral_bonus, 0);
    assert!(ref_acct.dirty_money - liquid_after_release < 5_000);
}

/// Manual channel: pays a flat 5000 once the referred account has 10
/// completed duels.
#[test]
fn duel_bonus_channel_pays_once() {
    let (mut engine, clock) = setup(17);
    let referrer = engine.register(None).unwrap();
    let referred = engine.register(Some(&referrer)).unwrap();
    let now = clock.now();

    // Not enough duels yet.
    let err = engine.claim_referral_bonus(&referrer, &referred).unwrap_err();
    assert!(matches!(err, GameError::InsufficientResource { .. }));

    edit(&engine, &referred, now, |acct| {
        acct.duels_total = 10;
    });
    let paid_balance = engine.claim_referral_bonus(&referrer, &referred).unwrap();
    assert_eq!(paid_balance, 5_000);

    let ref_acct = account(&engine, &referrer);
    assert_eq!(ref_acct.pending_referral_bonus, 0, "parked amount is cleared");

    // Second claim: already paid.
    let err = engine.claim_referral_bonus(&referrer, &referred).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}

/// The claim for an account referred by someone else is rejected.
#[test]
fn duel_bonus_requires_the_real_referrer() {
    let (mut engine, clock) = setup(19);
    let referrer = engine.register(None).unwrap();
    let stranger = engine.register(None).unwrap();
    let referred = engine.register(Some(&referrer)).unwrap();
    edit(&engine, &referred, clock.now(), |acct| {
        acct.duels_total = 10;
    });

    let err = engine.claim_referral_bonus(&stranger, &referred).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}

/// The two unlock channels are mutually exclusive: after the
/// three-claims release, the duel channel refuses to double-pay.
#[test]
fn bonus_channels_are_mutually_exclusive() {
    let (mut engine, clock) = setup(23);
    let referrer = engine.register(None).unwrap();
    let referred = engine.register(Some(&referrer)).unwrap();
    let now = clock.now();

    edit(&engine, &referred, now, |acct| {
        acct.claim_count = 2;
        acct.last_claim = now - Duration::hours(1);
        acct.duels_total = 10;
    });
    engine.claim(&referred).unwrap();
    assert!(account(&engine, &referred).referrer_bonus_paid);

    let err = engine.claim_referral_bonus(&referrer, &referred).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}
