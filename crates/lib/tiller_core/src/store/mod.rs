//! Entity store: typed queries over the SQLite schema.
//!
//! Query functions take a `&mut SqliteConnection` so callers decide the
//! transaction boundary; the manager runs every operation inside one
//! transaction and the functions compose within it.
//!
//! Get-or-create is race-safe without table locks: on a unique-constraint
//! violation the lookup is retried a bounded number of times, and only
//! then does the conflict surface as an error.

use sqlx::SqliteConnection;

use crate::error::{Error, Result};
use crate::models::{City, PermissionGrant, PermissionType, User};

pub mod cities;
pub mod grants;
pub mod permission_types;
pub mod users;

/// Attempts per get-or-create before giving up with `StorageConflict`.
pub const MAX_CONFLICT_RETRIES: usize = 3;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// A stored entity that generic availability handling can operate on.
pub trait Record {
    const TABLE: &'static str;
    /// The soft-delete flag column, for entities that have one.
    const AVAILABLE_COLUMN: Option<&'static str>;

    fn id(&self) -> i64;
}

impl Record for User {
    const TABLE: &'static str = "users";
    const AVAILABLE_COLUMN: Option<&'static str> = Some("available");

    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for City {
    const TABLE: &'static str = "cities";
    const AVAILABLE_COLUMN: Option<&'static str> = None;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for PermissionType {
    const TABLE: &'static str = "permission_types";
    const AVAILABLE_COLUMN: Option<&'static str> = None;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for PermissionGrant {
    const TABLE: &'static str = "permission_grants";
    const AVAILABLE_COLUMN: Option<&'static str> = Some("available");

    fn id(&self) -> i64 {
        self.id
    }
}

/// Soft-delete a record: flip its availability flag, or hard-delete when
/// the entity has no flag.
pub async fn soft_delete<R: Record + Sync>(conn: &mut SqliteConnection, record: &R) -> Result<()> {
    match R::AVAILABLE_COLUMN {
        Some(column) => {
            let sql = format!("UPDATE {} SET {} = FALSE WHERE id = ?", R::TABLE, column);
            sqlx::query(&sql).bind(record.id()).execute(&mut *conn).await?;
        }
        None => {
            let sql = format!("DELETE FROM {} WHERE id = ?", R::TABLE);
            sqlx::query(&sql).bind(record.id()).execute(&mut *conn).await?;
        }
    }
    Ok(())
}

/// Restore a soft-deleted record. Fails with `UnsupportedOperation` when
/// the entity has no availability flag, or when the row is not currently
/// soft-deleted.
pub async fn restore<R: Record + Sync>(conn: &mut SqliteConnection, record: &R) -> Result<()> {
    let Some(column) = R::AVAILABLE_COLUMN else {
        return Err(Error::UnsupportedOperation(format!(
            "{} records have no availability flag",
            R::TABLE
        )));
    };
    let table = R::TABLE;
    let sql = format!("UPDATE {table} SET {column} = TRUE WHERE id = ? AND {column} = FALSE");
    let result = sqlx::query(&sql).bind(record.id()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(Error::UnsupportedOperation(format!(
            "{} record {} is not restorable",
            R::TABLE,
            record.id()
        )));
    }
    Ok(())
}
