//! The player account record — the single unit of persisted state.
//!
//! Every gameplay operation is a read-modify-write against one (or,
//! for duels and cascades, a short sequence of) account records. No
//! server-side session state exists outside these records.

use crate::types::{AccountId, CatalogId, Money, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Most-recent-first duel history, capped.
pub const BATTLE_HISTORY_CAP: usize = 20;

/// Closed set of inventory buff ids. String-keyed maps from the wire
/// are validated into this enum at the boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuffId {
    /// One charge softens a duel loss from 10% to 1%.
    Kevlar,
    Adrenaline,
    Silencer,
}

/// Closed set of building ids. Levels run 1..=5, monotone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildingId {
    Safehouse,
    Warehouse,
    Club,
}

pub const MAX_BUILDING_LEVEL: u8 = 5;
pub const MAX_EQUIPMENT_TIER: u8 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedEquipment {
    pub equipment_id: CatalogId,
    /// Production track.
    pub tier_a: u8,
    /// Ammo-capacity track.
    pub tier_b: u8,
    /// Firepower track.
    pub tier_c: u8,
}

impl OwnedEquipment {
    pub fn new(equipment_id: CatalogId) -> Self {
        Self {
            equipment_id,
            tier_a: 1,
            tier_b: 1,
            tier_c: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffContract {
    pub staff_id: CatalogId,
    pub building: BuildingId,
    pub slot_index: u8,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRecord {
    pub opponent: AccountId,
    pub won: bool,
    /// Amount gained (attacker win) or lost, from this account's view.
    pub amount: Money,
    pub at: Timestamp,
}

/// Per-level referral aggregates, levels 1..=3. Monotone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferralStats {
    pub signups: [u32; 3],
    pub earnings: [Money; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerAccount {
    pub account_id: AccountId,

    /// Deposit/withdraw-backed currency tied to the payment rail.
    pub cash: Money,
    /// Freely-farmed currency, produced passively by equipment.
    pub dirty_money: Money,
    pub lifetime_earned: Money,

    pub equipment: Vec<OwnedEquipment>,

    pub energy: u32,
    pub energy_max: u32,
    pub ammo: u32,

    pub last_settlement: Timestamp,
    pub last_claim: Timestamp,
    pub last_energy_tick: Timestamp,
    /// UTC day of the last daily ammo reset, as YYYY-MM-DD.
    #[serde(default)]
    pub last_ammo_reset_day: Option<String>,

    pub referred_by: Option<AccountId>,
    #[serde(default)]
    pub referrals: ReferralStats,
    pub pending_referral_bonus: Money,
    pub referrer_bonus_paid: bool,
    pub claim_count: u32,

    pub duels_won: u32,
    pub duels_total: u32,
    pub battle_history: VecDeque<BattleRecord>,

    #[serde(default)]
    pub missions_done: BTreeSet<CatalogId>,
    #[serde(default)]
    pub missions_day: Option<String>,

    #[serde(default)]
    pub inventory: BTreeMap<BuffId, u32>,
    #[serde(default)]
    pub buildings: BTreeMap<BuildingId, u8>,
    #[serde(default)]
    pub staff: Vec<StaffContract>,

    pub heists_left: u32,
    #[serde(default)]
    pub heists_day: Option<String>,

    pub drug_stock_grams: i64,

    pub shock_until: Option<Timestamp>,
    pub banned: bool,
}

impl PlayerAccount {
    /// A fresh account with defaults and one starter equipment instance.
    pub fn new(
        account_id: AccountId,
        starter_equipment: CatalogId,
        referred_by: Option<AccountId>,
        now: Timestamp,
    ) -> Self {
        let mut buildings = BTreeMap::new();
        buildings.insert(BuildingId::Safehouse, 1);
        buildings.insert(BuildingId::Warehouse, 1);
        buildings.insert(BuildingId::Club, 1);
        Self {
            account_id,
            cash: 0,
            dirty_money: 0,
            lifetime_earned: 0,
            equipment: vec![OwnedEquipment::new(starter_equipment)],
            energy: 10,
            energy_max: 10,
            ammo: 5,
            last_settlement: now,
            last_claim: now,
            last_energy_tick: now,
            last_ammo_reset_day: Some(day_key(now)),
            referred_by,
            referrals: ReferralStats::default(),
            pending_referral_bonus: 0,
            referrer_bonus_paid: false,
            claim_count: 0,
            duels_won: 0,
            duels_total: 0,
            battle_history: VecDeque::new(),
            missions_done: BTreeSet::new(),
            missions_day: Some(day_key(now)),
            inventory: BTreeMap::new(),
            buildings,
            staff: Vec::new(),
            heists_left: crate::catalog::DAILY_HEIST_ATTEMPTS,
            heists_day: Some(day_key(now)),
            drug_stock_grams: 0,
            shock_until: None,
            banned: false,
        }
    }

    /// Ammo capacity: 5 plus one per tier-B level above 1, across all
    /// equipment.
    pub fn ammo_capacity(&self) -> u32 {
        5 + self
            .equipment
            .iter()
            .map(|e| (e.tier_b as u32).saturating_sub(1))
            .sum::<u32>()
    }

    /// Sum of building levels; drives the claim multiplier.
    pub fn building_level_sum(&self) -> u32 {
        self.buildings.values().map(|&l| l as u32).sum()
    }

    /// Shock blocks mission-type actions. Auto-clears once expired.
    pub fn is_shocked(&mut self, now: Timestamp) -> bool {
        match self.shock_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.shock_until = None;
                false
            }
            None => false,
        }
    }

    /// Drop contracts whose expiry has passed. Called on read; the
    /// store never sees an expired contract survive a write.
    pub fn prune_expired_staff(&mut self, now: Timestamp) {
        self.staff.retain(|c| c.expires_at > now);
    }

    /// Most-recent-first, capped at BATTLE_HISTORY_CAP.
    pub fn push_battle_record(&mut self, record: BattleRecord) {
        self.battle_history.push_front(record);
        self.battle_history.truncate(BATTLE_HISTORY_CAP);
    }

    /// Consume one charge of a buff if held. Returns whether a charge
    /// was spent.
    pub fn consume_buff(&mut self, buff: BuffId) -> bool {
        match self.inventory.get_mut(&buff) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.inventory.remove(&buff);
                }
                true
            }
            _ => false,
        }
    }
}

/// Canonical UTC day key used for all lazy daily resets.
pub fn day_key(at: Timestamp) -> String {
    at.format("%Y-%m-%d").to_string()
}
