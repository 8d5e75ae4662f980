//! User queries.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::is_unique_violation;
use crate::error::{Error, Result};
use crate::models::User;

const USER_COLUMNS: &str = "id, name, surname, phone, password_hash, city_id, available";

/// Equality filter over `users`; unset fields do not constrain the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilter<'a> {
    pub name: Option<&'a str>,
    pub surname: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub city_id: Option<i64>,
    pub password_hash: Option<&'a str>,
    pub available: Option<bool>,
}

/// Fetch the first user matching `filter`.
pub async fn get(conn: &mut SqliteConnection, filter: &UserFilter<'_>) -> Result<Option<User>> {
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"
    ));
    if let Some(name) = filter.name {
        query.push(" AND name = ").push_bind(name);
    }
    if let Some(surname) = filter.surname {
        query.push(" AND surname = ").push_bind(surname);
    }
    if let Some(phone) = filter.phone {
        query.push(" AND phone = ").push_bind(phone);
    }
    if let Some(city_id) = filter.city_id {
        query.push(" AND city_id = ").push_bind(city_id);
    }
    if let Some(password_hash) = filter.password_hash {
        query.push(" AND password_hash = ").push_bind(password_hash);
    }
    if let Some(available) = filter.available {
        query.push(" AND available = ").push_bind(available);
    }
    query.push(" LIMIT 1");

    let user = query
        .build_query_as::<User>()
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

/// Insert a user. `available` defaults to TRUE. A lost uniqueness race
/// (callers pre-check name/surname and phone) surfaces as a conflict.
pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    surname: &str,
    phone: &str,
    password_hash: &str,
    city_id: i64,
) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, surname, phone, password_hash, city_id) \
         VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(name)
    .bind(surname)
    .bind(phone)
    .bind(password_hash)
    .bind(city_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::StorageConflict("users")
        } else {
            e.into()
        }
    })
}

/// True when any user (soft-deleted ones included) holds this phone.
pub async fn phone_exists(conn: &mut SqliteConnection, phone: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE phone = ?)")
        .bind(phone)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}
