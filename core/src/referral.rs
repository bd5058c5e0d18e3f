//! Referral cascade and the anti-fraud bonus gate.
//!
//! RULE: Each hop up the referrer chain is an independent
//! read-modify-write with no cross-hop atomicity. A failed hop is
//! logged and skipped, never rolled back — the audit log is the
//! reconciliation source.
//!
//! The 5000-unit referral bonus has two unlock channels (3 claims by
//! the referred account, or 10 completed duels). They are mutually
//! exclusive: both check and set the referred account's
//! `referrer_bonus_paid` flag, so the bonus pays at most once.

use crate::{
    account::PlayerAccount,
    error::{GameError, GameResult},
    event::GameEvent,
    store::LedgerStore,
    types::{AccountId, Money, Timestamp},
};

/// Earn-share per referrer level (direct, grand, great-grand).
pub const CASCADE_RATES: [f64; 3] = [0.07, 0.02, 0.01];

/// One-time bonus parked at registration, released by the gate.
pub const REFERRAL_BONUS: Money = 5_000;

/// Claims the referred account must complete for the auto-release.
pub const CLAIMS_FOR_RELEASE: u32 = 3;

/// Completed duels required by the manual claim channel.
pub const DUELS_FOR_RELEASE: u32 = 10;

/// Propagate `floor(amount · rate)` of an earn event up to 3 referrer
/// hops. Stops at the first missing hop; hard-capped at 3 even when the
/// stored chain is longer or cyclic.
pub fn cascade(
    store: &LedgerStore,
    earner: &PlayerAccount,
    amount: Money,
    now: Timestamp,
) -> GameResult<()> {
    let mut seen: Vec<AccountId> = vec![earner.account_id.clone()];
    let mut next = earner.referred_by.clone();

    for (level, rate) in CASCADE_RATES.iter().enumerate() {
        let Some(referrer_id) = next else { break };
        if seen.contains(&referrer_id) {
            log::warn!(
                "cascade: cycle through '{referrer_id}' at level {}, stopping",
                level + 1
            );
            break;
        }

        let share = (amount as f64 * rate).floor() as Money;
        match credit_hop(store, &referrer_id, level, share, now) {
            Ok(parent) => {
                store.append_event(
                    &GameEvent::ReferralCredited {
                        earner: earner.account_id.clone(),
                        referrer: referrer_id.clone(),
                        level: level as u8 + 1,
                        amount: share,
                    },
                    now,
                )?;
                seen.push(referrer_id);
                next = parent;
            }
            Err(GameError::NotFound { .. }) => break,
            Err(err) => {
                // Best effort: hops already applied stand.
                log::warn!(
                    "cascade: hop {} to '{referrer_id}' failed, stopping: {err}",
                    level + 1
                );
                break;
            }
        }
    }
    Ok(())
}

/// One hop: credit the referrer and return its own parent id.
fn credit_hop(
    store: &LedgerStore,
    referrer_id: &str,
    level: usize,
    share: Money,
    now: Timestamp,
) -> GameResult<Option<AccountId>> {
    let mut versioned = store.require_account(referrer_id)?;
    let referrer = &mut versioned.account;
    referrer.dirty_money += share;
    referrer.referrals.earnings[level] += share;
    let parent = referrer.referred_by.clone();
    store.save_account(referrer, versioned.version, now)?;
    Ok(parent)
}

/// Registration-time gate: bump signup counters up the chain and park
/// the bonus on the direct referrer. Same best-effort hop semantics as
/// the earnings cascade.
pub fn record_signup(
    store: &LedgerStore,
    new_account: &PlayerAccount,
    now: Timestamp,
) -> GameResult<()> {
    let mut seen: Vec<AccountId> = vec![new_account.account_id.clone()];
    let mut next = new_account.referred_by.clone();

    for level in 0..CASCADE_RATES.len() {
        let Some(referrer_id) = next else { break };
        if seen.contains(&referrer_id) {
            break;
        }

        let mut versioned = match store.load_account(&referrer_id)? {
            Some(v) => v,
            None => break,
        };
        let referrer = &mut versioned.account;
        referrer.referrals.signups[level] += 1;
        if level == 0 {
            referrer.pending_referral_bonus += REFERRAL_BONUS;
        }
        let parent = referrer.referred_by.clone();
        store.save_account(referrer, versioned.version, now)?;

        if level == 0 {
            store.append_event(
                &GameEvent::ReferralBonusParked {
                    referrer: referrer_id.clone(),
                    referred: new_account.account_id.clone(),
                    amount: REFERRAL_BONUS,
                },
                now,
            )?;
        }
        seen.push(referrer_id);
        next = parent;
    }
    Ok(())
}

/// Auto-release channel: fires when the referred account's claim count
/// first reaches 3. Unlocks up to 5000 from the direct referrer's
/// pending bonus. The pending-balance guard prevents double release.
pub fn release_on_third_claim(
    store: &LedgerStore,
    referred: &mut PlayerAccount,
    now: Timestamp,
) -> GameResult<()> {
    if referred.claim_count != CLAIMS_FOR_RELEASE || referred.referrer_bonus_paid {
        return Ok(());
    }
    let Some(referrer_id) = referred.referred_by.clone() else {
        return Ok(());
    };
    let Some(mut versioned) = store.load_account(&referrer_id)? else {
        return Ok(());
    };
    let referrer = &mut versioned.account;
    if referrer.pending_referral_bonus < REFERRAL_BONUS {
        return Ok(());
    }
    referrer.pending_referral_bonus -= REFERRAL_BONUS;
    referrer.dirty_money += REFERRAL_BONUS;
    store.save_account(referrer, versioned.version, now)?;
    referred.referrer_bonus_paid = true;

    store.append_event(
        &GameEvent::ReferralBonusReleased {
            referrer: referrer_id.clone(),
            referred: referred.account_id.clone(),
            amount: REFERRAL_BONUS,
            channel: "three_claims".into(),
        },
        now,
    )?;
    log::info!(
        "referral bonus released to '{referrer_id}' (referred '{}' reached {} claims)",
        referred.account_id,
        CLAIMS_FOR_RELEASE
    );
    Ok(())
}

/// Manual claim channel: a flat 5000 once the referred account has
/// completed 10 duels. Fails NotEligible / AlreadyPaid; never pays on
/// top of the three-claims release.
pub fn claim_duel_bonus(
    store: &LedgerStore,
    referrer_id: &str,
    referred_id: &str,
    now: Timestamp,
) -> GameResult<Money> {
    let mut referred_v = store.require_account(referred_id)?;
    let referred = &mut referred_v.account;

    if referred.referred_by.as_deref() != Some(referrer_id) {
        return Err(GameError::StateConflict(format!(
            "'{referred_id}' was not referred by '{referrer_id}'"
        )));
    }
    if referred.referrer_bonus_paid {
        return Err(GameError::StateConflict("referral bonus already paid".into()));
    }
    if referred.duels_total < DUELS_FOR_RELEASE {
        return Err(GameError::InsufficientResource {
            resource: "completed duels",
            have: referred.duels_total as i64,
            need: DUELS_FOR_RELEASE as i64,
        });
    }

    referred.referrer_bonus_paid = true;
    store.save_account(referred, referred_v.version, now)?;

    let mut referrer_v = store.require_account(referrer_id)?;
    let referrer = &mut referrer_v.account;
    // Clear the parked amount so the books match the flat payout.
    referrer.pending_referral_bonus =
        (referrer.pending_referral_bonus - REFERRAL_BONUS).max(0);
    referrer.dirty_money += REFERRAL_BONUS;
    let balance = referrer.dirty_money;
    store.save_account(referrer, referrer_v.version, now)?;

    store.append_event(
        &GameEvent::ReferralBonusReleased {
            referrer: referrer_id.to_string(),
            referred: referred_id.to_string(),
            amount: REFERRAL_BONUS,
            channel: "ten_duels".into(),
        },
        now,
    )?;
    Ok(balance)
}
