//! Permission type queries: the stored side of the role catalog.

use sqlx::SqliteConnection;

use super::{MAX_CONFLICT_RETRIES, is_unique_violation};
use crate::error::{Error, Result};
use crate::models::PermissionType;

/// Fetch a permission type by role name.
pub async fn get_by_role(conn: &mut SqliteConnection, role: &str) -> Result<Option<PermissionType>> {
    let permission_type = sqlx::query_as::<_, PermissionType>(
        "SELECT id, role, priority FROM permission_types WHERE role = ? LIMIT 1",
    )
    .bind(role)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(permission_type)
}

/// Number of stored permission types.
pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permission_types")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

async fn insert(conn: &mut SqliteConnection, role: &str, priority: i64) -> sqlx::Result<PermissionType> {
    sqlx::query_as::<_, PermissionType>(
        "INSERT INTO permission_types (role, priority) VALUES (?, ?) RETURNING id, role, priority",
    )
    .bind(role)
    .bind(priority)
    .fetch_one(&mut *conn)
    .await
}

/// Get the permission type for `role`, creating it with `priority` if
/// absent.
pub async fn get_or_create(
    conn: &mut SqliteConnection,
    role: &str,
    priority: i64,
) -> Result<PermissionType> {
    for _ in 0..MAX_CONFLICT_RETRIES {
        if let Some(permission_type) = get_by_role(&mut *conn, role).await? {
            return Ok(permission_type);
        }
        match insert(&mut *conn, role, priority).await {
            Ok(permission_type) => return Ok(permission_type),
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::StorageConflict("permission_types"))
}
