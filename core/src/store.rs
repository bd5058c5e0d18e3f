//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Engine and components call store methods — they never execute SQL
//! directly. One row per account; the whole record travels as JSON
//! with an integer version column for optimistic CAS.

use crate::{
    account::PlayerAccount,
    bonus::BonusSchedule,
    error::{GameError, GameResult},
    event::{event_type_name, AuditEntry, GameEvent},
    types::Timestamp,
};
use rusqlite::{params, Connection, OptionalExtension};

/// An account together with the version its row carried at read time.
/// Pass the version back to `save_account` unchanged.
pub struct VersionedAccount {
    pub account: PlayerAccount,
    pub version: i64,
}

pub struct LedgerStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl LedgerStore {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Account ───────────────────────────────────────────────────

    pub fn insert_account(&self, account: &PlayerAccount, now: Timestamp) -> GameResult<()> {
        let payload = serde_json::to_string(account)?;
        self.conn.execute(
            "INSERT INTO account (account_id, payload, version, updated_at)
             VALUES (?1, ?2, 0, ?3)",
            params![account.account_id, payload, now.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_account(&self, account_id: &str) -> GameResult<Option<VersionedAccount>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT payload, version FROM account WHERE account_id = ?1",
                params![account_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((payload, version)) => Ok(Some(VersionedAccount {
                account: serde_json::from_str(&payload)?,
                version,
            })),
            None => Ok(None),
        }
    }

    /// Load an account or fail NotFound.
    pub fn require_account(&self, account_id: &str) -> GameResult<VersionedAccount> {
        self.load_account(account_id)?
            .ok_or_else(|| GameError::not_found("account", account_id))
    }

    /// Optimistic write: succeeds only if the row still carries
    /// `expected_version`, then bumps it. A lost race is a
    /// StateConflict the caller may retry from a fresh read.
    pub fn save_account(
        &self,
        account: &PlayerAccount,
        expected_version: i64,
        now: Timestamp,
    ) -> GameResult<()> {
        let payload = serde_json::to_string(account)?;
        let changed = self.conn.execute(
            "UPDATE account SET payload = ?1, version = version + 1, updated_at = ?2
             WHERE account_id = ?3 AND version = ?4",
            params![
                payload,
                now.to_rfc3339(),
                account.account_id,
                expected_version
            ],
        )?;
        if changed == 0 {
            return Err(GameError::StateConflict(format!(
                "account '{}' was modified concurrently",
                account.account_id
            )));
        }
        Ok(())
    }

    // ── Bonus schedule ────────────────────────────────────────────

    /// First writer wins. Returns true when this call inserted the
    /// row; false means another writer got there first and the caller
    /// must re-read.
    pub fn try_insert_bonus_schedule(
        &self,
        day: &str,
        schedule: &BonusSchedule,
    ) -> GameResult<bool> {
        let payload = serde_json::to_string(schedule)?;
        let changed = self.conn.execute(
            "INSERT INTO bonus_schedule (day, payload, version)
             VALUES (?1, ?2, 1)
             ON CONFLICT (day) DO NOTHING",
            params![day, payload],
        )?;
        Ok(changed == 1)
    }

    pub fn load_bonus_schedule(&self, day: &str) -> GameResult<Option<BonusSchedule>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM bonus_schedule WHERE day = ?1",
                params![day],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    // ── Audit log ─────────────────────────────────────────────────

    pub fn append_event(&self, event: &GameEvent, now: Timestamp) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO audit_log (account_id, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.subject(),
                event_type_name(event),
                serde_json::to_string(event)?,
                now.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn events_for_account(&self, account_id: &str) -> GameResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, account_id, event_type, payload, created_at
             FROM audit_log WHERE account_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![account_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        entries
            .into_iter()
            .map(|(id, account_id, event_type, payload, created_at)| {
                Ok(AuditEntry {
                    id: Some(id),
                    account_id,
                    event_type,
                    payload,
                    created_at: created_at
                        .parse()
                        .map_err(|e| GameError::Other(anyhow::anyhow!("bad timestamp: {e}")))?,
                })
            })
            .collect()
    }

    pub fn count_events(&self, event_type: &str) -> GameResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE event_type = ?1",
            params![event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> GameResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }
}
