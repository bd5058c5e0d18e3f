//! Audit events — the append-only record of every economic mutation.
//!
//! RULE: Multi-account sequences (cascade hops, duel transfers) log one
//! event per leg. There is no in-request rollback; a crash mid-sequence
//! is reconciled offline from this log.

use crate::types::{AccountId, CatalogId, Money, Timestamp};
use serde::{Deserialize, Serialize};

/// Every audit event emitted by the engine.
/// Variants are added as features land — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    AccountRegistered {
        account_id: AccountId,
        referred_by: Option<AccountId>,
    },
    Settled {
        account_id: AccountId,
        delta: Money,
        balance: Money,
    },
    MissionClaimed {
        account_id: AccountId,
        farmed: Money,
        claim_count: u32,
    },
    ReferralCredited {
        earner: AccountId,
        referrer: AccountId,
        level: u8,
        amount: Money,
    },
    ReferralBonusParked {
        referrer: AccountId,
        referred: AccountId,
        amount: Money,
    },
    ReferralBonusReleased {
        referrer: AccountId,
        referred: AccountId,
        amount: Money,
        channel: String, // "three_claims" | "ten_duels"
    },
    DuelResolved {
        attacker: AccountId,
        defender: AccountId,
        won: bool,
        attacker_delta: Money,
        defender_delta: Money,
    },
    HeistResolved {
        attacker: AccountId,
        heist_id: CatalogId,
        won: bool,
        lucky: bool,
        reward: Money,
    },
    DrugsSold {
        account_id: AccountId,
        grams: i64,
        earnings: Money,
        raided: bool,
    },
    DrugsBought {
        account_id: AccountId,
        grams: i64,
        cost: Money,
    },
    DepositCredited {
        account_id: AccountId,
        amount: Money,
        credited: Money,
        bonus_pct: f64,
    },
    Withdrawal {
        account_id: AccountId,
        amount: Money,
    },
    EquipmentUpgraded {
        account_id: AccountId,
        equipment_id: CatalogId,
        tier: char,
        level: u8,
    },
    BuildingUpgraded {
        account_id: AccountId,
        building: crate::account::BuildingId,
        level: u8,
    },
    StaffHired {
        account_id: AccountId,
        staff_id: CatalogId,
        building: crate::account::BuildingId,
        slot_index: u8,
    },
    MissionCompleted {
        account_id: AccountId,
        mission_id: CatalogId,
        reward: Money,
    },
    ShockApplied {
        account_id: AccountId,
        until: Timestamp,
    },
    BonusScheduleGenerated {
        day: String,
    },
}

/// A persisted audit-log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Option<i64>,
    pub account_id: AccountId,
    pub event_type: String,
    pub payload: String,
    pub created_at: Timestamp,
}

/// Extract a stable string name from a GameEvent variant.
/// Used for the event_type column in audit_log.
pub fn event_type_name(event: &GameEvent) -> &'static str {
    match event {
        GameEvent::AccountRegistered { .. } => "account_registered",
        GameEvent::Settled { .. } => "settled",
        GameEvent::MissionClaimed { .. } => "mission_claimed",
        GameEvent::ReferralCredited { .. } => "referral_credited",
        GameEvent::ReferralBonusParked { .. } => "referral_bonus_parked",
        GameEvent::ReferralBonusReleased { .. } => "referral_bonus_released",
        GameEvent::DuelResolved { .. } => "duel_resolved",
        GameEvent::HeistResolved { .. } => "heist_resolved",
        GameEvent::DrugsSold { .. } => "drugs_sold",
        GameEvent::DrugsBought { .. } => "drugs_bought",
        GameEvent::DepositCredited { .. } => "deposit_credited",
        GameEvent::Withdrawal { .. } => "withdrawal",
        GameEvent::EquipmentUpgraded { .. } => "equipment_upgraded",
        GameEvent::BuildingUpgraded { .. } => "building_upgraded",
        GameEvent::StaffHired { .. } => "staff_hired",
        GameEvent::MissionCompleted { .. } => "mission_completed",
        GameEvent::ShockApplied { .. } => "shock_applied",
        GameEvent::BonusScheduleGenerated { .. } => "bonus_schedule_generated",
    }
}

impl GameEvent {
    /// The account this event is filed under in the audit log.
    /// Globally-scoped events (bonus schedule) file under "".
    pub fn subject(&self) -> &str {
        match self {
            GameEvent::AccountRegistered { account_id, .. }
            | GameEvent::Settled { account_id, .. }
            | GameEvent::MissionClaimed { account_id, .. }
            | GameEvent::DrugsSold { account_id, .. }
            | GameEvent::DrugsBought { account_id, .. }
            | GameEvent::DepositCredited { account_id, .. }
            | GameEvent::Withdrawal { account_id, .. }
            | GameEvent::EquipmentUpgraded { account_id, .. }
            | GameEvent::BuildingUpgraded { account_id, .. }
            | GameEvent::StaffHired { account_id, .. }
            | GameEvent::MissionCompleted { account_id, .. }
            | GameEvent::ShockApplied { account_id, .. } => account_id,
            GameEvent::ReferralCredited { referrer, .. }
            | GameEvent::ReferralBonusParked { referrer, .. }
            | GameEvent::ReferralBonusReleased { referrer, .. } => referrer,
            GameEvent::DuelResolved { attacker, .. }
            | GameEvent::HeistResolved { attacker, .. } => attacker,
            GameEvent::BonusScheduleGenerated { .. } => "",
        }
    }
}
