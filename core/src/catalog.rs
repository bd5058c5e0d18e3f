//! Static catalog data: equipment, buildings, staff, heists, missions.
//!
//! The catalog is external configuration consumed, not computed, by the
//! core. It is loaded once from a JSON data directory; tests use
//! `Catalog::default_test()`.

use crate::account::BuildingId;
use crate::types::{CatalogId, Money};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flat battle-power floor every account has before equipment.
pub const BASE_STATUS: i64 = 50;

/// Energy refill: one point per interval, bucket-truncated.
pub const ENERGY_REFILL_INTERVAL_MS: i64 = 180_000; // 3 minutes

/// Daily heist attempts, reset on first action of a new UTC day.
pub const DAILY_HEIST_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentDef {
    pub equipment_id: CatalogId,
    pub label: String,
    /// Passive production per hour at tier A = 1 (uncapped settle path).
    pub base_production: f64,
    /// Separate per-hour rate used by the 24h-capped claim path.
    pub claim_rate: f64,
    /// Combat contribution at tier C = 1.
    pub firepower: f64,
    pub price: Money,
    /// Cost of one tier upgrade, any of the three tracks.
    pub upgrade_cost: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDef {
    pub building: BuildingId,
    pub label: String,
    /// Cost to reach level N is upgrade_costs[N - 2]; level 1 is free
    /// at registration. Levels cap at 5.
    pub upgrade_costs: Vec<Money>,
    pub staff_slots: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffDef {
    pub staff_id: CatalogId,
    pub label: String,
    pub hire_cost: Money,
    pub contract_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeistDef {
    pub heist_id: CatalogId,
    pub label: String,
    /// Static opposition strength; the heist rolls this against the
    /// attacker's battle power.
    pub firepower: f64,
    pub reward: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionDef {
    pub mission_id: CatalogId,
    pub label: String,
    pub energy_cost: u32,
    pub reward: Money,
    /// Probability the mission goes wrong and the runner is shocked.
    pub fail_chance: f64,
    pub shock_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct EquipmentFile {
    equipment: Vec<EquipmentDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct BuildingsFile {
    buildings: Vec<BuildingDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct StaffFile {
    staff: Vec<StaffDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct HeistsFile {
    heists: Vec<HeistDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct MissionsFile {
    missions: Vec<MissionDef>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub equipment: HashMap<CatalogId, EquipmentDef>,
    pub buildings: HashMap<BuildingId, BuildingDef>,
    pub staff: HashMap<CatalogId, StaffDef>,
    pub heists: HashMap<CatalogId, HeistDef>,
    pub missions: HashMap<CatalogId, MissionDef>,
    /// Equipment granted to every new account at registration.
    pub starter_equipment: CatalogId,
}

impl Catalog {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let equipment: EquipmentFile =
            serde_json::from_str(&std::fs::read_to_string(format!("{data_dir}/equipment.json"))?)?;
        let buildings: BuildingsFile =
            serde_json::from_str(&std::fs::read_to_string(format!("{data_dir}/buildings.json"))?)?;
        let staff: StaffFile =
            serde_json::from_str(&std::fs::read_to_string(format!("{data_dir}/staff.json"))?)?;
        let heists: HeistsFile =
            serde_json::from_str(&std::fs::read_to_string(format!("{data_dir}/heists.json"))?)?;
        let missions: MissionsFile =
            serde_json::from_str(&std::fs::read_to_string(format!("{data_dir}/missions.json"))?)?;

        let starter_equipment = equipment
            .equipment
            .first()
            .map(|e| e.equipment_id.clone())
            .ok_or_else(|| anyhow::anyhow!("equipment catalog is empty"))?;

        Ok(Self {
            equipment: equipment
                .equipment
                .into_iter()
                .map(|e| (e.equipment_id.clone(), e))
                .collect(),
            buildings: buildings
                .buildings
                .into_iter()
                .map(|b| (b.building, b))
                .collect(),
            staff: staff
                .staff
                .into_iter()
                .map(|s| (s.staff_id.clone(), s))
                .collect(),
            heists: heists
                .heists
                .into_iter()
                .map(|h| (h.heist_id.clone(), h))
                .collect(),
            missions: missions
                .missions
                .into_iter()
                .map(|m| (m.mission_id.clone(), m))
                .collect(),
            starter_equipment,
        })
    }

    /// Small fixed catalog used by the test suite and the demo runner.
    pub fn default_test() -> Self {
        let equipment = vec![
            EquipmentDef {
                equipment_id: "pistol".into(),
                label: "Pistol".into(),
                base_production: 100.0,
                claim_rate: 100.0,
                firepower: 10.0,
                price: 0,
                upgrade_cost: 500,
            },
            EquipmentDef {
                equipment_id: "shotgun".into(),
                label: "Shotgun".into(),
                base_production: 250.0,
                claim_rate: 220.0,
                firepower: 35.0,
                price: 5_000,
                upgrade_cost: 1_200,
            },
            EquipmentDef {
                equipment_id: "rifle".into(),
                label: "Rifle".into(),
                base_production: 600.0,
                claim_rate: 500.0,
                firepower: 90.0,
                price: 20_000,
                upgrade_cost: 3_000,
            },
        ];
        let buildings = vec![
            BuildingDef {
                building: BuildingId::Safehouse,
                label: "Safehouse".into(),
                upgrade_costs: vec![2_000, 6_000, 18_000, 50_000],
                staff_slots: 2,
            },
            BuildingDef {
                building: BuildingId::Warehouse,
                label: "Warehouse".into(),
                upgrade_costs: vec![3_000, 9_000, 27_000, 80_000],
                staff_slots: 3,
            },
            BuildingDef {
                building: BuildingId::Club,
                label: "Club".into(),
                upgrade_costs: vec![5_000, 15_000, 45_000, 120_000],
                staff_slots: 4,
            },
        ];
        let staff = vec![
            StaffDef {
                staff_id: "lookout".into(),
                label: "Lookout".into(),
                hire_cost: 1_000,
                contract_days: 7,
            },
            StaffDef {
                staff_id: "enforcer".into(),
                label: "Enforcer".into(),
                hire_cost: 4_000,
                contract_days: 7,
            },
        ];
        let heists = vec![
            HeistDef {
                heist_id: "corner-store".into(),
                label: "Corner Store".into(),
                firepower: 8.0,
                reward: 1_500,
            },
            HeistDef {
                heist_id: "armored-truck".into(),
                label: "Armored Truck".into(),
                firepower: 60.0,
                reward: 12_000,
            },
        ];
        let missions = vec![
            MissionDef {
                mission_id: "collect-debts".into(),
                label: "Collect Debts".into(),
                energy_cost: 3,
                reward: 400,
                fail_chance: 0.10,
                shock_minutes: 30,
            },
            MissionDef {
                mission_id: "smuggle-crates".into(),
                label: "Smuggle Crates".into(),
                energy_cost: 6,
                reward: 1_100,
                fail_chance: 0.25,
                shock_minutes: 60,
            },
        ];

        Self {
            starter_equipment: "pistol".into(),
            equipment: equipment
                .into_iter()
                .map(|e| (e.equipment_id.clone(), e))
                .collect(),
            buildings: buildings.into_iter().map(|b| (b.building, b)).collect(),
            staff: staff.into_iter().map(|s| (s.staff_id.clone(), s)).collect(),
            heists: heists.into_iter().map(|h| (h.heist_id.clone(), h)).collect(),
            missions: missions
                .into_iter()
                .map(|m| (m.mission_id.clone(), m))
                .collect(),
        }
    }
}
