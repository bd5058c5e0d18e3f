//! Daily "bonus hour" windows boosting deposit crediting.
//!
//! One schedule per UTC day, globally shared. Generation is guarded by
//! a single-writer-wins insert: a caller that loses the race re-reads
//! the winner's schedule instead of regenerating.

use crate::{
    account::day_key,
    error::GameResult,
    event::GameEvent,
    rng::GameRng,
    store::LedgerStore,
    types::{Money, Timestamp},
};
use serde::{Deserialize, Serialize};

pub const WINDOWS_PER_DAY: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusWindow {
    /// UTC start hour; the window covers [start_hour, start_hour + 1).
    pub start_hour: u32,
    /// Multiplier fraction: a deposit credits floor(amount · (1 + bonus)).
    pub bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusSchedule {
    pub day: String,
    pub windows: Vec<BonusWindow>,
}

impl BonusSchedule {
    /// The bonus active at `at`, if any window covers its hour.
    pub fn active_bonus(&self, at: Timestamp) -> Option<f64> {
        use chrono::Timelike;
        let hour = at.hour();
        self.windows
            .iter()
            .find(|w| w.start_hour == hour)
            .map(|w| w.bonus)
    }
}

/// Draw a bonus percentage from the 4-tier weighted distribution.
fn draw_bonus(rng: &mut GameRng) -> f64 {
    let tier = rng.next_f64();
    if tier < 0.50 {
        rng.uniform(0.05, 0.10)
    } else if tier < 0.80 {
        rng.uniform(0.10, 0.25)
    } else if tier < 0.95 {
        rng.uniform(0.25, 0.50)
    } else {
        rng.uniform(0.50, 1.00)
    }
}

/// Generate the day's schedule: exactly 3 one-hour windows at distinct
/// random start hours (distinct starts make 1h windows non-overlapping),
/// each with an independently drawn bonus.
pub fn generate(day: &str, rng: &mut GameRng) -> BonusSchedule {
    let mut hours: Vec<u32> = Vec::with_capacity(WINDOWS_PER_DAY);
    while hours.len() < WINDOWS_PER_DAY {
        let hour = rng.next_u64_below(24) as u32;
        if !hours.contains(&hour) {
            hours.push(hour);
        }
    }
    let windows = hours
        .into_iter()
        .map(|start_hour| BonusWindow {
            start_hour,
            bonus: draw_bonus(rng),
        })
        .collect();
    BonusSchedule {
        day: day.to_string(),
        windows,
    }
}

/// Fetch the schedule for `now`'s day, generating it on first demand.
/// Safe under concurrent first-requests: the insert is first-writer-wins
/// and losers re-read.
pub fn ensure_for_day(
    store: &LedgerStore,
    now: Timestamp,
    rng: &mut GameRng,
) -> GameResult<BonusSchedule> {
    let day = day_key(now);
    if let Some(existing) = store.load_bonus_schedule(&day)? {
        return Ok(existing);
    }

    let fresh = generate(&day, rng);
    if store.try_insert_bonus_schedule(&day, &fresh)? {
        store.append_event(&GameEvent::BonusScheduleGenerated { day: day.clone() }, now)?;
        log::info!("bonus schedule generated for {day}");
        return Ok(fresh);
    }

    // Lost the race; the winner's schedule is authoritative.
    store.load_bonus_schedule(&day)?.ok_or_else(|| {
        crate::error::GameError::StateConflict(format!(
            "bonus schedule for {day} vanished after conflicting insert"
        ))
    })
}

/// Amount credited for a deposit of `amount` under an optional bonus.
pub fn credited_amount(amount: Money, bonus: Option<f64>) -> Money {
    match bonus {
        Some(b) => (amount as f64 * (1.0 + b)).floor() as Money,
        None => amount,
    }
}
