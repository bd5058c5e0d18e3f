//! The request surface of the economy core.
//!
//! FLOW (fixed, documented, never reordered):
//!   1. Load the acting account (and target, for duels).
//!   2. Run lazy resets (energy, ammo, daily counters) and settle
//!      passive production — before any balance or resource check.
//!   3. Validate; every domain failure rejects before mutation.
//!   4. Execute the operation.
//!   5. Persist (optimistic versioned write) and append audit events.
//!
//! RULES:
//!   - No server-side session state between requests; everything lives
//!     in the account record.
//!   - Cross-account sequences (duel legs, cascade hops) are sequential
//!     independent writes; the write-write window is kept minimal and
//!     each leg is audit-logged.
//!   - All randomness flows through the engine's seeded streams.

use crate::{
    account::{BuffId, BuildingId, PlayerAccount, StaffContract, MAX_BUILDING_LEVEL,
              MAX_EQUIPMENT_TIER, OwnedEquipment},
    accrual, bonus,
    catalog::Catalog,
    clock::Clock,
    combat,
    error::{GameError, GameResult},
    event::GameEvent,
    market, referral, regen,
    rng::{GameRng, RngBank, RngStream},
    store::{LedgerStore, VersionedAccount},
    types::{AccountId, Money, Timestamp},
};
use chrono::Timelike;
use serde::Serialize;
use std::sync::Arc;

/// Which equipment tier track an upgrade targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierTrack {
    /// Production.
    A,
    /// Ammo capacity.
    B,
    /// Firepower.
    C,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettleResponse {
    pub soft_balance: Money,
    pub last_settlement: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimResponse {
    pub soft_balance: Money,
    pub farmed: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuelResponse {
    pub won: bool,
    pub reward: Money,
    pub soft_balance: Money,
    pub ammo: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeistResponse {
    pub won: bool,
    pub reward: Money,
    pub heists_left: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellResponse {
    pub earnings: Money,
    pub raided: bool,
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositResponse {
    pub credited: Money,
    pub bonus_pct: f64,
    pub cash: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionResponse {
    pub succeeded: bool,
    pub reward: Money,
    pub energy: u32,
    pub shocked_until: Option<Timestamp>,
}

struct Streams {
    duel: GameRng,
    heist: GameRng,
    market: GameRng,
    bonus_hour: GameRng,
    mission: GameRng,
}

pub struct GameEngine {
    store: LedgerStore,
    catalog: Catalog,
    clock: Arc<dyn Clock>,
    streams: Streams,
}

impl GameEngine {
    pub fn new(store: LedgerStore, catalog: Catalog, clock: Arc<dyn Clock>, seed: u64) -> Self {
        let bank = RngBank::new(seed);
        Self {
            store,
            catalog,
            clock,
            streams: Streams {
                duel: bank.for_stream(RngStream::Duel),
                heist: bank.for_stream(RngStream::Heist),
                market: bank.for_stream(RngStream::Market),
                bonus_hour: bank.for_stream(RngStream::BonusHour),
                mission: bank.for_stream(RngStream::Mission),
            },
        }
    }

    /// In-memory engine with the test catalog and a pinned clock.
    /// Used by the test suite and the demo runner.
    pub fn build_test(seed: u64, clock: Arc<dyn Clock>) -> GameResult<Self> {
        let store = LedgerStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(store, Catalog::default_test(), clock, seed))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Load an account, apply lazy resets and settle production.
    /// Every handler starts here.
    fn load_ready(&self, account_id: &str, now: Timestamp) -> GameResult<VersionedAccount> {
        let mut versioned = self.store.require_account(account_id)?;
        if versioned.account.banned {
            return Err(GameError::StateConflict(format!(
                "account '{account_id}' is banned"
            )));
        }
        regen::sync(&mut versioned.account, now);
        accrual::settle(&self.catalog, &mut versioned.account, now);
        Ok(versioned)
    }

    // ── Registration ──────────────────────────────────────────────

    /// Create an account with defaults and one starter equipment
    /// instance, then run the registration-time referral gate.
    pub fn register(&mut self, referred_by: Option<&str>) -> GameResult<AccountId> {
        let now = self.now();
        if let Some(referrer_id) = referred_by {
            if self.store.load_account(referrer_id)?.is_none() {
                return Err(GameError::not_found("account", referrer_id));
            }
        }
        let account_id = uuid::Uuid::new_v4().to_string();
        let account = PlayerAccount::new(
            account_id.clone(),
            self.catalog.starter_equipment.clone(),
            referred_by.map(str::to_string),
            now,
        );
        self.store.insert_account(&account, now)?;
        self.store.append_event(
            &GameEvent::AccountRegistered {
                account_id: account_id.clone(),
                referred_by: account.referred_by.clone(),
            },
            now,
        )?;
        referral::record_signup(&self.store, &account, now)?;
        log::info!("registered account {account_id}");
        Ok(account_id)
    }

    // ── Settlement ────────────────────────────────────────────────

    pub fn settle(&mut self, account_id: &str) -> GameResult<SettleResponse> {
        let now = self.now();
        let mut v = self.store.require_account(account_id)?;
        regen::sync(&mut v.account, now);
        let delta = accrual::settle(&self.catalog, &mut v.account, now);
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::Settled {
                account_id: account_id.to_string(),
                delta,
                balance: v.account.dirty_money,
            },
            now,
        )?;
        Ok(SettleResponse {
            soft_balance: v.account.dirty_money,
            last_settlement: v.account.last_settlement,
        })
    }

    /// The 24h-capped claim path. Triggers the referral cascade on the
    /// farmed amount and, on the third claim, the bonus auto-release.
    pub fn claim(&mut self, account_id: &str) -> GameResult<ClaimResponse> {
        let now = self.now();
        let mut v = self.load_ready(account_id, now)?;
        let farmed = accrual::apply_claim(&self.catalog, &mut v.account, now)?;
        referral::release_on_third_claim(&self.store, &mut v.account, now)?;
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::MissionClaimed {
                account_id: account_id.to_string(),
                farmed,
                claim_count: v.account.claim_count,
            },
            now,
        )?;
        referral::cascade(&self.store, &v.account, farmed, now)?;
        Ok(ClaimResponse {
            soft_balance: v.account.dirty_money,
            farmed,
        })
    }

    // ── Combat ────────────────────────────────────────────────────

    pub fn duel(
        &mut self,
        attacker_id: &str,
        defender_id: &str,
        used_buffs: &[BuffId],
    ) -> GameResult<DuelResponse> {
        let now = self.now();
        if attacker_id == defender_id {
            return Err(GameError::Validation("cannot duel yourself".into()));
        }
        let mut attacker = self.load_ready(attacker_id, now)?;
        let mut defender = self.load_ready(defender_id, now)?;

        // Pre-roll buffs are validated and spent before the dice.
        let mut attacker_mult = 1.0;
        for buff in used_buffs {
            match buff {
                BuffId::Adrenaline => {
                    if !attacker.account.consume_buff(BuffId::Adrenaline) {
                        return Err(GameError::InsufficientResource {
                            resource: "adrenaline",
                            have: 0,
                            need: 1,
                        });
                    }
                    attacker_mult *= 1.10;
                }
                BuffId::Kevlar | BuffId::Silencer => {
                    return Err(GameError::Validation(format!(
                        "buff {buff:?} cannot be activated in a duel"
                    )));
                }
            }
        }

        let outcome = combat::resolve_duel(
            &self.catalog,
            &mut attacker.account,
            &mut defender.account,
            attacker_mult,
            &mut self.streams.duel,
            now,
        )?;

        // Two sequential independent writes; a crash between them is a
        // partially-applied duel, reconciled from the audit log.
        self.store.save_account(&attacker.account, attacker.version, now)?;
        self.store.save_account(&defender.account, defender.version, now)?;
        self.store.append_event(
            &GameEvent::DuelResolved {
                attacker: attacker_id.to_string(),
                defender: defender_id.to_string(),
                won: outcome.won,
                attacker_delta: outcome.reward - outcome.attacker_loss,
                defender_delta: -outcome.defender_loss,
            },
            now,
        )?;

        Ok(DuelResponse {
            won: outcome.won,
            reward: outcome.reward,
            soft_balance: attacker.account.dirty_money,
            ammo: attacker.account.ammo,
        })
    }

    pub fn heist(&mut self, attacker_id: &str, heist_id: &str) -> GameResult<HeistResponse> {
        let now = self.now();
        let mut v = self.load_ready(attacker_id, now)?;
        if v.account.is_shocked(now) {
            return Err(GameError::Incapacitated {
                until: v.account.shock_until.unwrap_or(now),
            });
        }
        let heist = self
            .catalog
            .heists
            .get(heist_id)
            .ok_or_else(|| GameError::not_found("heist", heist_id))?
            .clone();

        let outcome = combat::resolve_heist(
            &self.catalog,
            &heist,
            &mut v.account,
            &mut self.streams.heist,
            now,
        )?;
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::HeistResolved {
                attacker: attacker_id.to_string(),
                heist_id: heist_id.to_string(),
                won: outcome.won,
                lucky: outcome.lucky,
                reward: outcome.reward,
            },
            now,
        )?;
        Ok(HeistResponse {
            won: outcome.won,
            reward: outcome.reward,
            heists_left: outcome.heists_left,
        })
    }

    // ── Market ────────────────────────────────────────────────────

    pub fn sell(&mut self, account_id: &str, grams: i64) -> GameResult<SellResponse> {
        let now = self.now();
        let mut v = self.load_ready(account_id, now)?;
        let outcome = market::sell(&mut v.account, grams, now.hour(), &mut self.streams.market)?;
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::DrugsSold {
                account_id: account_id.to_string(),
                grams,
                earnings: outcome.earnings,
                raided: outcome.raided,
            },
            now,
        )?;
        Ok(SellResponse {
            earnings: outcome.earnings,
            raided: outcome.raided,
            stock: outcome.stock,
        })
    }

    /// Buy stock at the current hourly price, paid from soft currency.
    pub fn buy_stock(&mut self, account_id: &str, grams: i64) -> GameResult<i64> {
        let now = self.now();
        if grams <= 0 {
            return Err(GameError::Validation("grams must be positive".into()));
        }
        let mut v = self.load_ready(account_id, now)?;
        let cost = grams * market::hourly_price(now.hour());
        if v.account.dirty_money < cost {
            return Err(GameError::InsufficientResource {
                resource: "funds",
                have: v.account.dirty_money,
                need: cost,
            });
        }
        v.account.dirty_money -= cost;
        v.account.drug_stock_grams += grams;
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::DrugsBought {
                account_id: account_id.to_string(),
                grams,
                cost,
            },
            now,
        )?;
        Ok(v.account.drug_stock_grams)
    }

    // ── Payments ──────────────────────────────────────────────────

    /// Credit a deposit, boosted when it lands inside an active bonus
    /// window. The ledger transfer itself happens outside the core.
    pub fn deposit(&mut self, account_id: &str, amount: Money) -> GameResult<DepositResponse> {
        let now = self.now();
        if amount <= 0 {
            return Err(GameError::Validation("deposit must be positive".into()));
        }
        let mut v = self.load_ready(account_id, now)?;
        let schedule = bonus::ensure_for_day(&self.store, now, &mut self.streams.bonus_hour)?;
        let active = schedule.active_bonus(now);
        let credited = bonus::credited_amount(amount, active);
        v.account.cash += credited;
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::DepositCredited {
                account_id: account_id.to_string(),
                amount,
                credited,
                bonus_pct: active.unwrap_or(0.0),
            },
            now,
        )?;
        Ok(DepositResponse {
            credited,
            bonus_pct: active.unwrap_or(0.0),
            cash: v.account.cash,
        })
    }

    pub fn withdraw(&mut self, account_id: &str, amount: Money) -> GameResult<Money> {
        let now = self.now();
        if amount <= 0 {
            return Err(GameError::Validation("withdrawal must be positive".into()));
        }
        let mut v = self.load_ready(account_id, now)?;
        if v.account.cash < amount {
            return Err(GameError::InsufficientResource {
                resource: "funds",
                have: v.account.cash,
                need: amount,
            });
        }
        v.account.cash -= amount;
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::Withdrawal {
                account_id: account_id.to_string(),
                amount,
            },
            now,
        )?;
        Ok(v.account.cash)
    }

    // ── Progression ───────────────────────────────────────────────

    pub fn buy_equipment(&mut self, account_id: &str, equipment_id: &str) -> GameResult<()> {
        let now = self.now();
        let mut v = self.load_ready(account_id, now)?;
        let def = self
            .catalog
            .equipment
            .get(equipment_id)
            .ok_or_else(|| GameError::not_found("equipment", equipment_id))?;
        if v.account.dirty_money < def.price {
            return Err(GameError::InsufficientResource {
                resource: "funds",
                have: v.account.dirty_money,
                need: def.price,
            });
        }
        v.account.dirty_money -= def.price;
        v.account
            .equipment
            .push(OwnedEquipment::new(equipment_id.to_string()));
        self.store.save_account(&v.account, v.version, now)?;
        Ok(())
    }

    /// Upgrade one tier track of one owned equipment instance.
    /// `index` selects among duplicates of the same catalog item.
    pub fn upgrade_equipment(
        &mut self,
        account_id: &str,
        equipment_id: &str,
        index: usize,
        track: TierTrack,
    ) -> GameResult<u8> {
        let now = self.now();
        let mut v = self.load_ready(account_id, now)?;
        let cost = self
            .catalog
            .equipment
            .get(equipment_id)
            .ok_or_else(|| GameError::not_found("equipment", equipment_id))?
            .upgrade_cost;

        let idx = v
            .account
            .equipment
            .iter()
            .enumerate()
            .filter(|(_, e)| e.equipment_id == equipment_id)
            .map(|(i, _)| i)
            .nth(index)
            .ok_or_else(|| GameError::not_found("owned equipment", equipment_id))?;
        let current = {
            let owned = &v.account.equipment[idx];
            match track {
                TierTrack::A => owned.tier_a,
                TierTrack::B => owned.tier_b,
                TierTrack::C => owned.tier_c,
            }
        };
        if current >= MAX_EQUIPMENT_TIER {
            return Err(GameError::StateConflict("tier already at maximum".into()));
        }
        if v.account.dirty_money < cost {
            return Err(GameError::InsufficientResource {
                resource: "funds",
                have: v.account.dirty_money,
                need: cost,
            });
        }
        let owned = &mut v.account.equipment[idx];
        let level = current + 1;
        match track {
            TierTrack::A => owned.tier_a = level,
            TierTrack::B => owned.tier_b = level,
            TierTrack::C => owned.tier_c = level,
        }
        v.account.dirty_money -= cost;
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::EquipmentUpgraded {
                account_id: account_id.to_string(),
                equipment_id: equipment_id.to_string(),
                tier: match track {
                    TierTrack::A => 'A',
                    TierTrack::B => 'B',
                    TierTrack::C => 'C',
                },
                level,
            },
            now,
        )?;
        Ok(level)
    }

    /// Raise a building one level. Levels are monotone, capped at 5.
    pub fn upgrade_building(
        &mut self,
        account_id: &str,
        building: BuildingId,
    ) -> GameResult<u8> {
        let now = self.now();
        let mut v = self.load_ready(account_id, now)?;
        let def = self
            .catalog
            .buildings
            .get(&building)
            .ok_or_else(|| GameError::not_found("building", format!("{building:?}")))?;

        let level = v.account.buildings.get(&building).copied().unwrap_or(1);
        if level >= MAX_BUILDING_LEVEL {
            return Err(GameError::StateConflict("building at max level".into()));
        }
        let cost = def
            .upgrade_costs
            .get((level - 1) as usize)
            .copied()
            .ok_or_else(|| GameError::StateConflict("no upgrade defined".into()))?;
        if v.account.dirty_money < cost {
            return Err(GameError::InsufficientResource {
                resource: "funds",
                have: v.account.dirty_money,
                need: cost,
            });
        }
        v.account.dirty_money -= cost;
        v.account.buildings.insert(building, level + 1);
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::BuildingUpgraded {
                account_id: account_id.to_string(),
                building,
                level: level + 1,
            },
            now,
        )?;
        Ok(level + 1)
    }

    /// Hire staff into a building slot. Slot indices must be valid for
    /// the building and free among non-expired contracts.
    pub fn hire_staff(
        &mut self,
        account_id: &str,
        staff_id: &str,
        building: BuildingId,
        slot_index: u8,
    ) -> GameResult<Timestamp> {
        let now = self.now();
        let mut v = self.load_ready(account_id, now)?;
        let staff = self
            .catalog
            .staff
            .get(staff_id)
            .ok_or_else(|| GameError::not_found("staff", staff_id))?;
        let def = self
            .catalog
            .buildings
            .get(&building)
            .ok_or_else(|| GameError::not_found("building", format!("{building:?}")))?;

        if slot_index >= def.staff_slots {
            return Err(GameError::Validation(format!(
                "slot {slot_index} out of range for {building:?}"
            )));
        }
        v.account.prune_expired_staff(now);
        if v.account
            .staff
            .iter()
            .any(|c| c.building == building && c.slot_index == slot_index)
        {
            return Err(GameError::StateConflict(format!(
                "slot {slot_index} in {building:?} is occupied"
            )));
        }
        if v.account.dirty_money < staff.hire_cost {
            return Err(GameError::InsufficientResource {
                resource: "funds",
                have: v.account.dirty_money,
                need: staff.hire_cost,
            });
        }
        v.account.dirty_money -= staff.hire_cost;
        let expires_at = now + chrono::Duration::days(staff.contract_days);
        v.account.staff.push(StaffContract {
            staff_id: staff_id.to_string(),
            building,
            slot_index,
            expires_at,
        });
        self.store.save_account(&v.account, v.version, now)?;
        self.store.append_event(
            &GameEvent::StaffHired {
                account_id: account_id.to_string(),
                staff_id: staff_id.to_string(),
                building,
                slot_index,
            },
            now,
        )?;
        Ok(expires_at)
    }

    // ── Missions ──────────────────────────────────────────────────

    /// Run a mission: costs energy up front, pays on success, and on
    /// failure applies the Shock incapacitation penalty. Once per
    /// mission per UTC day.
    pub fn complete_mission(
        &mut self,
        account_id: &str,
        mission_id: &str,
    ) -> GameResult<MissionResponse> {
        let now = self.now();
        let mut v = self.load_ready(account_id, now)?;
        if v.account.is_shocked(now) {
            return Err(GameError::Incapacitated {
                until: v.account.shock_until.unwrap_or(now),
            });
        }
        let mission = self
            .catalog
            .missions
            .get(mission_id)
            .ok_or_else(|| GameError::not_found("mission", mission_id))?
            .clone();
        if v.account.missions_done.contains(mission_id) {
            return Err(GameError::StateConflict(
                "mission already completed today".into(),
            ));
        }
        if v.account.energy < mission.energy_cost {
            return Err(GameError::InsufficientResource {
                resource: "energy",
                have: v.account.energy as i64,
                need: mission.energy_cost as i64,
            });
        }
        v.account.energy -= mission.energy_cost;

        let failed = self.streams.mission.chance(mission.fail_chance);
        let response = if failed {
            let until = now + chrono::Duration::minutes(mission.shock_minutes);
            v.account.shock_until = Some(until);
            self.store.save_account(&v.account, v.version, now)?;
            self.store.append_event(
                &GameEvent::ShockApplied {
                    account_id: account_id.to_string(),
                    until,
                },
                now,
            )?;
            MissionResponse {
                succeeded: false,
                reward: 0,
                energy: v.account.energy,
                shocked_until: Some(until),
            }
        } else {
            v.account.dirty_money += mission.reward;
            v.account.lifetime_earned += mission.reward;
            v.account.missions_done.insert(mission_id.to_string());
            self.store.save_account(&v.account, v.version, now)?;
            self.store.append_event(
                &GameEvent::MissionCompleted {
                    account_id: account_id.to_string(),
                    mission_id: mission_id.to_string(),
                    reward: mission.reward,
                },
                now,
            )?;
            referral::cascade(&self.store, &v.account, mission.reward, now)?;
            MissionResponse {
                succeeded: true,
                reward: mission.reward,
                energy: v.account.energy,
                shocked_until: None,
            }
        };
        Ok(response)
    }

    // ── Referral bonus ────────────────────────────────────────────

    /// Manual referral-bonus claim: the ten-duels unlock channel.
    pub fn claim_referral_bonus(
        &mut self,
        referrer_id: &str,
        referred_id: &str,
    ) -> GameResult<Money> {
        let now = self.now();
        referral::claim_duel_bonus(&self.store, referrer_id, referred_id, now)
    }
}
