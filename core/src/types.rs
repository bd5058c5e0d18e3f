//! Shared primitive types used across the entire economy core.

use chrono::{DateTime, Utc};

/// A stable, unique identifier for a player account.
pub type AccountId = String;

/// A catalog identifier (equipment, staff, heist, mission).
pub type CatalogId = String;

/// Currency amounts. Whole units; persisted balances are never negative.
pub type Money = i64;

/// All timestamps in the core are UTC wall-clock instants.
pub type Timestamp = DateTime<Utc>;
