use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

pub static IDENTITY_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/identity");
pub static CATALOG_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/catalog");

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

/// Applies `migrator`, logging instead of failing so a pre-provisioned
/// schema still boots.
pub async fn migrate(db: &PgPool, migrator: &Migrator) {
    if let Err(e) = migrator.run(db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
}
