use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::dto::{Identity, Role};
use crate::store::{StoreError, StoreResult};

/// User record as stored by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub email_address: String,
    pub password_hash: String, // Argon2 PHC string, never serialized
    pub role: Role,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            email_address: self.email_address.clone(),
            role: self.role,
        }
    }
}

/// Persistence for identity records. `username` and `email_address` are
/// unique; a violating write fails with [`StoreError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list(&self) -> StoreResult<Vec<User>>;
    async fn insert(&self, user: &User) -> StoreResult<()>;
    /// Returns `false` when no record with that username exists.
    async fn update(&self, user: &User) -> StoreResult<bool>;
    /// Returns `false` when no record with that username exists.
    async fn delete(&self, username: &str) -> StoreResult<bool>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    username: String,
    email_address: String,
    password_hash: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(StoreError::Corrupt)?;
        Ok(User {
            username: row.username,
            email_address: row.email_address,
            password_hash: row.password_hash,
            role,
        })
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT username, email_address, password_hash, role
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT username, email_address, password_hash, role
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (username, email_address, password_hash, role)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email_address)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update(&self, user: &User) -> StoreResult<bool> {
        let done = sqlx::query(
            r#"
            UPDATE users
               SET email_address = $2, password_hash = $3, role = $4
             WHERE username = $1
            "#,
        )
        .bind(&user.username)
        .bind(&user.email_address)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.db)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete(&self, username: &str) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
