//! User manager: registration, authentication, authorization and role
//! changes, composed out of the store, the permission catalog and the
//! token claims.
//!
//! Every public operation runs inside a single transaction; an early
//! error return drops the transaction and rolls it back, so a partially
//! applied registration or role change never becomes visible.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{Claims, Credentials, NewUser, User};
use crate::password;
use crate::permissions::{self, Role};
use crate::store::users::UserFilter;
use crate::store::{cities, grants, permission_types, users};

/// Direction of a role change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    /// client → moderator
    Upgrade,
    /// moderator → client
    Downgrade,
}

#[derive(Clone)]
pub struct UserManager {
    pool: SqlitePool,
    bcrypt_cost: u32,
}

impl UserManager {
    pub fn new(pool: SqlitePool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    // @zen-impl: AUTH-1_AC-1
    /// Register a user: hash the password, resolve (or create) the city,
    /// insert the user and attach an available `client` grant, all in one
    /// transaction.
    ///
    /// Fails with `AlreadyRegistered` when an available user with the same
    /// name and surname exists, and with `PhoneInUse` when any user
    /// (soft-deleted ones included) already holds the phone number.
    pub async fn register_user(&self, input: &NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let duplicate = users::get(
            &mut tx,
            &UserFilter {
                name: Some(&input.name),
                surname: Some(&input.surname),
                available: Some(true),
                ..UserFilter::default()
            },
        )
        .await?;
        if duplicate.is_some() {
            return Err(Error::AlreadyRegistered);
        }
        if users::phone_exists(&mut tx, &input.phone).await? {
            return Err(Error::PhoneInUse);
        }

        let password_hash = password::hash(&input.password, self.bcrypt_cost)?;
        let city = cities::get_or_create(&mut tx, &input.city).await?;
        let user = users::insert(
            &mut tx,
            &input.name,
            &input.surname,
            &input.phone,
            &password_hash,
            city.id,
        )
        .await?;

        let client = permission_types::get_or_create(
            &mut tx,
            Role::Client.as_str(),
            Role::Client.priority(),
        )
        .await?;
        grants::get_or_create(&mut tx, user.id, client.id).await?;

        tx.commit().await?;
        info!(user_id = user.id, city_id = city.id, "user registered");
        Ok(user)
    }

    // -------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------

    // @zen-impl: AUTH-2_AC-1
    /// Authenticate against stored credentials. Identification is by phone
    /// when one is supplied, otherwise by name and surname together.
    pub async fn authenticate_user(&self, credentials: &Credentials) -> Result<User> {
        let Some(password) = credentials.password.as_deref() else {
            return Err(Error::InvalidRequest(
                "authorization is not possible without a password".to_string(),
            ));
        };

        let mut tx = self.pool.begin().await?;
        let user = Self::resolve_identity(
            &mut tx,
            credentials.name.as_deref(),
            credentials.surname.as_deref(),
            credentials.phone.as_deref(),
        )
        .await?;
        tx.commit().await?;

        if !password::verify(password, &user.password_hash)? {
            return Err(Error::InvalidCredentials);
        }
        Ok(user)
    }

    /// Find a user by phone, or by name and surname together. Shares the
    /// identification rules with authentication.
    pub async fn find_user(
        &self,
        name: Option<&str>,
        surname: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        let user = Self::resolve_identity(&mut tx, name, surname, phone).await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Re-resolve the user a token was issued for. The full claim snapshot
    /// must still match a stored row; claims go stale when the password or
    /// identity changed after issue.
    pub async fn current_user(&self, claims: &Claims) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        let user = Self::user_for_claims(&mut tx, claims).await?;
        tx.commit().await?;
        Ok(user)
    }

    // -------------------------------------------------------------------
    // Authorization
    // -------------------------------------------------------------------

    // @zen-impl: PERM-1_AC-1
    /// Whether the user behind `claims` may perform `action`. The user's
    /// highest-priority available grant decides; a user without any
    /// available grant is allowed nothing.
    pub async fn is_action_allowed(&self, claims: &Claims, action: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let user = Self::user_for_claims(&mut tx, claims).await?;
        let grant = grants::current_for_user(&mut tx, user.id).await?;
        tx.commit().await?;

        let Some(grant) = grant else {
            warn!(user_id = user.id, "user has no available permission grant");
            return Ok(false);
        };
        let Some(permission) = permissions::resolve(&grant.role) else {
            warn!(
                user_id = user.id,
                role = %grant.role,
                "stored grant role is missing from the catalog"
            );
            return Ok(false);
        };
        Ok(permission.allows(action))
    }

    /// Whether the user behind `claims` holds an elevated (moderator or
    /// administrator) grant.
    pub async fn is_elevated_permission(&self, claims: &Claims) -> Result<bool> {
        let user = self.current_user(claims).await?;
        self.is_user_elevated(&user).await
    }

    /// Elevation check against a resolved user row.
    pub async fn is_user_elevated(&self, user: &User) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let grant = grants::current_for_user(&mut tx, user.id).await?;
        tx.commit().await?;

        Ok(matches!(
            grant.and_then(|g| Role::parse(&g.role)),
            Some(Role::Moderator | Role::Administrator)
        ))
    }

    // -------------------------------------------------------------------
    // Role changes
    // -------------------------------------------------------------------

    // @zen-impl: PERM-2_AC-1, PERM-2_AC-3
    /// Move a user between the client and moderator roles. The outgoing
    /// grant is deactivated and the incoming one reactivated (or created
    /// on first use) so repeated changes reuse the same grant rows.
    ///
    /// Administrators are protected: their role cannot be changed here.
    pub async fn change_user_role(&self, user: &User, change: RoleChange) -> Result<()> {
        let (from_role, to_role) = match change {
            RoleChange::Upgrade => (Role::Client, Role::Moderator),
            RoleChange::Downgrade => (Role::Moderator, Role::Client),
        };

        let mut tx = self.pool.begin().await?;
        let current = grants::current_for_user(&mut tx, user.id)
            .await?
            .ok_or(Error::NoPermission)?;
        if current.role == Role::Administrator.as_str() {
            return Err(Error::ProtectedRole);
        }

        if let Some(outgoing) = permission_types::get_by_role(&mut tx, from_role.as_str()).await?
            && let Some(grant) = grants::get(&mut tx, user.id, outgoing.id).await?
            && grant.available
        {
            grants::set_available(&mut tx, grant.id, false).await?;
        }

        let incoming =
            permission_types::get_or_create(&mut tx, to_role.as_str(), to_role.priority()).await?;
        let grant = grants::get_or_create(&mut tx, user.id, incoming.id).await?;
        if !grant.available {
            grants::set_available(&mut tx, grant.id, true).await?;
        }

        tx.commit().await?;
        info!(user_id = user.id, role = to_role.as_str(), "user role changed");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Catalog seeding
    // -------------------------------------------------------------------

    /// Reconcile the stored permission types with the compiled catalog.
    /// Missing roles are inserted with their priorities; existing rows are
    /// left untouched. Safe to run on every startup.
    pub async fn ensure_permission_types_seeded(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let expected = permissions::catalog().len() as i64;
        let stored = permission_types::count(&mut tx).await?;
        if stored != expected {
            for permission in permissions::catalog() {
                permission_types::get_or_create(
                    &mut tx,
                    permission.role.as_str(),
                    permission.role.priority(),
                )
                .await?;
            }
            info!(stored, expected, "seeded missing permission types");
        }
        tx.commit().await?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    async fn resolve_identity(
        conn: &mut SqliteConnection,
        name: Option<&str>,
        surname: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User> {
        match (name, surname) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::InvalidRequest(format!(
                    "name: {name:?} | surname: {surname:?} | phone: {phone:?}"
                )));
            }
            (None, None) if phone.is_none() => {
                return Err(Error::InvalidRequest(
                    "either a phone or a full name and surname is required".to_string(),
                ));
            }
            _ => {}
        }

        let filter = if let Some(phone) = phone {
            UserFilter {
                phone: Some(phone),
                ..UserFilter::default()
            }
        } else {
            UserFilter {
                name,
                surname,
                ..UserFilter::default()
            }
        };
        users::get(&mut *conn, &filter).await?.ok_or(Error::NotFound)
    }

    async fn user_for_claims(conn: &mut SqliteConnection, claims: &Claims) -> Result<User> {
        users::get(
            &mut *conn,
            &UserFilter {
                name: Some(&claims.name),
                surname: Some(&claims.surname),
                phone: Some(&claims.phone),
                city_id: Some(claims.city_id),
                password_hash: Some(&claims.password_hash),
                ..UserFilter::default()
            },
        )
        .await?
        .ok_or(Error::NotFound)
    }
}
