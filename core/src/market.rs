//! Commodity market: deterministic hourly pricing plus probabilistic
//! seizure on large sales.

use crate::{
    account::PlayerAccount,
    error::{GameError, GameResult},
    rng::GameRng,
    types::Money,
};

/// Sales above this size enter the raid branch.
const RAID_THRESHOLD_GRAMS: i64 = 100;
const RAID_CHANCE: f64 = 0.05;
const RAID_SEIZURE_RATE: f64 = 0.50;

#[derive(Debug, Clone)]
pub struct SellOutcome {
    pub earnings: Money,
    pub raided: bool,
    pub stock: i64,
}

/// Global price per gram for a given UTC hour. Deterministic and
/// recomputed, never stored; always within [8, 15].
pub fn hourly_price(hour: u32) -> Money {
    8 + ((hour as i64 * 37) % 100) * 8 / 100
}

/// Sell stock at the current hour's price. Selling more than 100 grams
/// risks a raid that seizes half the gross before credit; exactly 100
/// never does.
pub fn sell(
    account: &mut PlayerAccount,
    grams: i64,
    hour: u32,
    rng: &mut GameRng,
) -> GameResult<SellOutcome> {
    if grams <= 0 || grams > account.drug_stock_grams {
        return Err(GameError::InsufficientResource {
            resource: "stock",
            have: account.drug_stock_grams,
            need: grams,
        });
    }

    let gross = grams * hourly_price(hour);
    let raided = grams > RAID_THRESHOLD_GRAMS && rng.chance(RAID_CHANCE);
    let earnings = if raided {
        gross - (gross as f64 * RAID_SEIZURE_RATE).floor() as Money
    } else {
        gross
    };

    account.drug_stock_grams -= grams;
    account.dirty_money += earnings;

    if raided {
        log::info!(
            "market: account={} raided on {}g sale, seized {}",
            account.account_id,
            grams,
            gross - earnings
        );
    }
    Ok(SellOutcome {
        earnings,
        raided,
        stock: account.drug_stock_grams,
    })
}
