//! Contest resolution: duels against other players, heists against
//! static catalog targets.
//!
//! RULE: Costs are taken before the roll. Ammo (duel) and the daily
//! attempt (heist) are consumed win or lose.

use crate::{
    account::{day_key, BattleRecord, BuffId, PlayerAccount},
    catalog::{Catalog, HeistDef, BASE_STATUS, DAILY_HEIST_ATTEMPTS},
    error::{GameError, GameResult},
    rng::GameRng,
    types::{Money, Timestamp},
};

/// Tier-C scaling: each level above 1 adds 10% of base firepower.
const TIER_C_STEP: f64 = 0.10;

/// Share of the defender's soft balance at stake on an attacker win.
const LOOT_RATE: f64 = 0.10;

/// Share of the loot the attacker actually receives; the rest is sunk.
const LOOT_TRANSFER_RATE: f64 = 0.80;

/// Attacker's loss share on defeat, without and with kevlar.
const LOSS_RATE: f64 = 0.10;
const LOSS_RATE_KEVLAR: f64 = 0.01;

/// Probability that a won heist actually pays out.
const HEIST_LUCK: f64 = 0.60;

#[derive(Debug, Clone)]
pub struct DuelOutcome {
    pub won: bool,
    /// Amount credited to the attacker (win) — zero on loss.
    pub reward: Money,
    /// Amount debited from the attacker (loss) — zero on win.
    pub attacker_loss: Money,
    /// Amount debited from the defender (win) — zero on loss.
    pub defender_loss: Money,
    pub kevlar_used: bool,
}

#[derive(Debug, Clone)]
pub struct HeistOutcome {
    pub won: bool,
    pub lucky: bool,
    pub reward: Money,
    pub heists_left: u32,
}

/// Total battle power: scaled equipment firepower times 100, plus the
/// flat base status every account carries.
pub fn battle_power(catalog: &Catalog, account: &PlayerAccount) -> f64 {
    let firepower: f64 = account
        .equipment
        .iter()
        .filter_map(|owned| {
            let def = catalog.equipment.get(&owned.equipment_id)?;
            Some(def.firepower + (owned.tier_c as f64 - 1.0) * def.firepower * TIER_C_STEP)
        })
        .sum();
    firepower * 100.0 + BASE_STATUS as f64
}

/// Resolve one duel. Both accounts must already be settled. Consumes
/// one ammo unconditionally before the roll; appends one history entry
/// to both ring buffers. `attacker_mult` carries any pre-consumed buff
/// boost (1.0 when none).
pub fn resolve_duel(
    catalog: &Catalog,
    attacker: &mut PlayerAccount,
    defender: &mut PlayerAccount,
    attacker_mult: f64,
    rng: &mut GameRng,
    now: Timestamp,
) -> GameResult<DuelOutcome> {
    if attacker.ammo < 1 {
        return Err(GameError::InsufficientResource {
            resource: "ammo",
            have: attacker.ammo as i64,
            need: 1,
        });
    }
    attacker.ammo -= 1;

    let attacker_roll = battle_power(catalog, attacker) * attacker_mult * rng.uniform(0.9, 1.1);
    let defender_roll = battle_power(catalog, defender) * rng.uniform(0.9, 1.1);
    let won = attacker_roll > defender_roll;

    let outcome = if won {
        let loot = (defender.dirty_money as f64 * LOOT_RATE).floor() as Money;
        let reward = (loot as f64 * LOOT_TRANSFER_RATE).floor() as Money;
        defender.dirty_money -= loot;
        attacker.dirty_money += reward;
        DuelOutcome {
            won: true,
            reward,
            attacker_loss: 0,
            defender_loss: loot,
            kevlar_used: false,
        }
    } else {
        // Kevlar softens the hit; discount and charge spend together.
        let kevlar_used = attacker.consume_buff(BuffId::Kevlar);
        let rate = if kevlar_used { LOSS_RATE_KEVLAR } else { LOSS_RATE };
        let loss = (attacker.dirty_money as f64 * rate).floor() as Money;
        attacker.dirty_money -= loss;
        DuelOutcome {
            won: false,
            reward: 0,
            attacker_loss: loss,
            defender_loss: 0,
            kevlar_used,
        }
    };

    attacker.duels_total += 1;
    if won {
        attacker.duels_won += 1;
    }

    attacker.push_battle_record(BattleRecord {
        opponent: defender.account_id.clone(),
        won,
        amount: if won { outcome.reward } else { outcome.attacker_loss },
        at: now,
    });
    defender.push_battle_record(BattleRecord {
        opponent: attacker.account_id.clone(),
        won: !won,
        amount: outcome.defender_loss,
        at: now,
    });

    log::debug!(
        "duel: {} vs {} rolls {:.0}/{:.0} won={}",
        attacker.account_id,
        defender.account_id,
        attacker_roll,
        defender_roll,
        won
    );
    Ok(outcome)
}

/// Lazy daily reset of heist attempts, on the first action of a new
/// UTC day.
pub fn reset_heists_if_new_day(account: &mut PlayerAccount, now: Timestamp) {
    let today = day_key(now);
    if account.heists_day.as_deref() != Some(today.as_str()) {
        account.heists_left = DAILY_HEIST_ATTEMPTS;
        account.heists_day = Some(today);
    }
}

/// Resolve one heist against a static catalog target. The attempt is
/// consumed before the roll; a raw win still needs the luck draw to
/// pay out, and a win without luck costs nothing either.
pub fn resolve_heist(
    catalog: &Catalog,
    heist: &HeistDef,
    attacker: &mut PlayerAccount,
    rng: &mut GameRng,
    now: Timestamp,
) -> GameResult<HeistOutcome> {
    reset_heists_if_new_day(attacker, now);
    if attacker.heists_left == 0 {
        return Err(GameError::InsufficientResource {
            resource: "heist attempts",
            have: 0,
            need: 1,
        });
    }
    attacker.heists_left -= 1;

    let attacker_roll = battle_power(catalog, attacker) * rng.uniform(0.8, 1.2);
    let heist_roll = heist.firepower * 100.0 * rng.uniform(0.9, 1.1);
    let won = attacker_roll > heist_roll;
    let lucky = won && rng.chance(HEIST_LUCK);

    let reward = if lucky { heist.reward } else { 0 };
    attacker.dirty_money += reward;

    Ok(HeistOutcome {
        won,
        lucky,
        reward,
        heists_left: attacker.heists_left,
    })
}
