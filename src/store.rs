//! SQLite ledger store.
//!
//! Durable record of users, events, and bets. All monetary columns are
//! integer cents. The store owns every SQL statement in the crate and
//! exposes the two compound operations that must be atomic: debit-and-
//! insert-bet at placement, and status-guarded credit at settlement.

use crate::markets::Outcome;
use crate::money::Amount;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors that can occur during ledger store operations
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

// ============================================================================
// STATUS ENUMS
// ============================================================================

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Open,
    Closed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(EventStatus::Open),
            "closed" => Some(EventStatus::Closed),
            _ => None,
        }
    }
}

/// Bet lifecycle status. Transitions only open -> won or open -> lost,
/// exactly once, at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetStatus {
    Open,
    Won,
    Lost,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Open => "open",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(BetStatus::Open),
            "won" => Some(BetStatus::Won),
            "lost" => Some(BetStatus::Lost),
            _ => None,
        }
    }
}

// ============================================================================
// ROW TYPES
// ============================================================================

/// User record. The credential hash is compared, never logged or exposed.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

/// Event record
#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub status: EventStatus,
}

/// Bet record. `potential_win` is frozen at placement and never
/// recomputed.
#[derive(Debug, Clone)]
pub struct BetRow {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub outcome: Outcome,
    pub stake: Amount,
    pub potential_win: Amount,
    pub status: BetStatus,
    pub placed_at: DateTime<Utc>,
}

// ============================================================================
// DATABASE IMPLEMENTATION
// ============================================================================

/// Thread-safe ledger store handle.
///
/// A single connection behind a mutex: every operation, including the
/// compound transactions, holds the lock for its full duration, so a
/// debit's read-check-write can never interleave with another debit on
/// the same user.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initialize the schema from the migration file
    pub fn initialize(&self) -> DbResult<()> {
        let schema = include_str!("../migrations/001_initial.sql");
        let conn = self.lock()?;
        conn.execute_batch(schema)?;
        Ok(())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    /// Insert a new user with zero balance and return the full row.
    /// A duplicate email fails with [`DbError::Duplicate`].
    pub fn insert_user(&self, email: &str, password_hash: &str) -> DbResult<UserRow> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
            params![email, password_hash],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::Duplicate(format!("email already registered: {}", email))
            }
            other => DbError::Sqlite(other),
        })?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, email, password_hash, balance, created_at FROM users WHERE id = ?1",
            [id],
            Self::row_to_user,
        )
        .map_err(DbError::Sqlite)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> DbResult<Option<UserRow>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, email, password_hash, balance, created_at
                 FROM users WHERE id = ?1",
                [id],
                Self::row_to_user,
            )
            .optional()?;

        Ok(result)
    }

    /// Get a user by email (for login)
    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<UserRow>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, email, password_hash, balance, created_at
                 FROM users WHERE email = ?1",
                [email],
                Self::row_to_user,
            )
            .optional()?;

        Ok(result)
    }

    /// Add to a user's balance and return the new balance. Used for
    /// deposits and settlement payouts.
    pub fn credit_balance(&self, user_id: i64, amount: Amount) -> DbResult<Amount> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "UPDATE users SET balance = balance + ?1 WHERE id = ?2",
            params![amount.cents(), user_id],
        )?;
        if rows == 0 {
            return Err(DbError::NotFound(format!("user {}", user_id)));
        }

        let balance: i64 =
            conn.query_row("SELECT balance FROM users WHERE id = ?1", [user_id], |row| {
                row.get(0)
            })?;
        Ok(Amount::from_cents(balance))
    }

    /// Atomically check-and-debit a user's balance, returning the new
    /// balance. The sufficient-funds check and the subtraction are a
    /// single guarded UPDATE, so two concurrent debits can never both
    /// pass the check against a stale balance.
    pub fn debit_balance(&self, user_id: i64, amount: Amount) -> DbResult<Amount> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "UPDATE users SET balance = balance - ?1 WHERE id = ?2 AND balance >= ?1",
            params![amount.cents(), user_id],
        )?;
        if rows == 0 {
            return Err(Self::debit_failure(&conn, user_id)?);
        }

        let balance: i64 =
            conn.query_row("SELECT balance FROM users WHERE id = ?1", [user_id], |row| {
                row.get(0)
            })?;
        Ok(Amount::from_cents(balance))
    }

    /// Distinguish a missing user from an insufficient balance after a
    /// guarded debit touched zero rows.
    fn debit_failure(conn: &Connection, user_id: i64) -> DbResult<DbError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(if exists {
            DbError::InsufficientFunds
        } else {
            DbError::NotFound(format!("user {}", user_id))
        })
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<UserRow> {
        let created_at_str: String = row.get(4)?;
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            balance: Amount::from_cents(row.get(3)?),
            created_at: parse_sqlite_ts(&created_at_str),
        })
    }

    // ========================================================================
    // EVENT OPERATIONS
    // ========================================================================

    /// Insert a new event (open) and return its ID
    pub fn insert_event(&self, title: &str, start_time: DateTime<Utc>) -> DbResult<i64> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO events (title, start_time) VALUES (?1, ?2)",
            params![title, start_time.to_rfc3339()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get an event by ID
    pub fn get_event(&self, id: i64) -> DbResult<Option<EventRow>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, title, start_time, status FROM events WHERE id = ?1",
                [id],
                Self::row_to_event,
            )
            .optional()?;

        Ok(result)
    }

    /// All open events, in insertion order
    pub fn open_events(&self) -> DbResult<Vec<EventRow>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, title, start_time, status FROM events
             WHERE status = 'open' ORDER BY id",
        )?;

        let events = stmt
            .query_map([], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Close an event. Returns true if this call performed the
    /// open -> closed transition; closing an already-closed event is a
    /// no-op returning false.
    pub fn close_event(&self, id: i64) -> DbResult<bool> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "UPDATE events SET status = 'closed' WHERE id = ?1 AND status = 'open'",
            [id],
        )?;

        Ok(rows > 0)
    }

    /// Total number of events (for startup seeding)
    pub fn event_count(&self) -> DbResult<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_event(row: &Row) -> rusqlite::Result<EventRow> {
        let start_time_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;

        Ok(EventRow {
            id: row.get(0)?,
            title: row.get(1)?,
            start_time: parse_sqlite_ts(&start_time_str),
            status: EventStatus::from_str(&status_str)
                .ok_or_else(|| text_conversion_error(3, &status_str))?,
        })
    }

    // ========================================================================
    // BET OPERATIONS
    // ========================================================================

    /// Debit the stake and insert the bet as one transaction.
    ///
    /// Either both apply or neither does: an insert failure rolls the
    /// debit back, so no debit can exist without its bet record. Returns
    /// the new bet's ID.
    pub fn place_bet(
        &self,
        user_id: i64,
        event_id: i64,
        outcome: Outcome,
        stake: Amount,
        potential_win: Amount,
    ) -> DbResult<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE users SET balance = balance - ?1 WHERE id = ?2 AND balance >= ?1",
            params![stake.cents(), user_id],
        )?;
        if rows == 0 {
            let err = Self::debit_failure(&tx, user_id)?;
            tx.rollback()?;
            return Err(err);
        }

        tx.execute(
            "INSERT INTO bets (user_id, event_id, outcome, stake, potential_win)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                event_id,
                outcome.as_str(),
                stake.cents(),
                potential_win.cents(),
            ],
        )?;

        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// Get a bet by ID
    pub fn get_bet(&self, id: i64) -> DbResult<Option<BetRow>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, user_id, event_id, outcome, stake, potential_win, status, placed_at
                 FROM bets WHERE id = ?1",
                [id],
                Self::row_to_bet,
            )
            .optional()?;

        Ok(result)
    }

    /// Unsettled bets for an event. Settlement reads only these, which
    /// makes a repeated settle call a no-op for balances.
    pub fn open_bets_for_event(&self, event_id: i64) -> DbResult<Vec<BetRow>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, event_id, outcome, stake, potential_win, status, placed_at
             FROM bets WHERE event_id = ?1 AND status = 'open' ORDER BY id",
        )?;

        let bets = stmt
            .query_map([event_id], Self::row_to_bet)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(bets)
    }

    /// Mark a bet won and credit the payout, as one transaction guarded
    /// on status = 'open'. Returns true if the payout was applied; false
    /// means the bet was already settled and nothing changed.
    pub fn settle_bet_won(&self, bet_id: i64, user_id: i64, payout: Amount) -> DbResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE bets SET status = 'won' WHERE id = ?1 AND status = 'open'",
            [bet_id],
        )?;
        if rows == 0 {
            tx.rollback()?;
            return Ok(false);
        }

        tx.execute(
            "UPDATE users SET balance = balance + ?1 WHERE id = ?2",
            params![payout.cents(), user_id],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Mark a bet lost, guarded on status = 'open'. Returns true if the
    /// transition happened.
    pub fn settle_bet_lost(&self, bet_id: i64) -> DbResult<bool> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "UPDATE bets SET status = 'lost' WHERE id = ?1 AND status = 'open'",
            [bet_id],
        )?;

        Ok(rows > 0)
    }

    fn row_to_bet(row: &Row) -> rusqlite::Result<BetRow> {
        let outcome_str: String = row.get(3)?;
        let status_str: String = row.get(6)?;
        let placed_at_str: String = row.get(7)?;

        Ok(BetRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            event_id: row.get(2)?,
            outcome: Outcome::from_str(&outcome_str)
                .ok_or_else(|| text_conversion_error(3, &outcome_str))?,
            stake: Amount::from_cents(row.get(4)?),
            potential_win: Amount::from_cents(row.get(5)?),
            status: BetStatus::from_str(&status_str)
                .ok_or_else(|| text_conversion_error(6, &status_str))?,
            placed_at: parse_sqlite_ts(&placed_at_str),
        })
    }
}

/// Parse timestamps stored as either RFC 3339 (our inserts) or SQLite's
/// CURRENT_TIMESTAMP format (column defaults).
fn parse_sqlite_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

fn text_conversion_error(column: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        format!("unrecognized value: {}", value).into(),
    )
}

// ============================================================================
// TESTS
// ============================================================================
