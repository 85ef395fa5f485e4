use std::{sync::Arc, time::Duration};

use crate::{
    catalog::{
        cache::ReadCache,
        gate::Gate,
        identity_client::{IdentityClient, TokenValidator},
        memory::MemoryCatalogStore,
        repo::{CatalogStore, PgCatalogStore},
    },
    config::{CatalogConfig, IdentityConfig, StoreKind},
    db,
    identity::{
        jwt::JwtKeys,
        memory::MemoryUserStore,
        repo::{PgUserStore, UserStore},
        Role,
    },
};

#[derive(Clone)]
pub struct IdentityState {
    pub config: Arc<IdentityConfig>,
    pub users: Arc<dyn UserStore>,
    pub keys: JwtKeys,
}

impl IdentityState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = IdentityConfig::from_env()?;
        let users: Arc<dyn UserStore> = match config.store {
            StoreKind::Postgres => {
                let pool = db::connect(&config.database_url).await?;
                db::migrate(&pool, &db::IDENTITY_MIGRATIONS).await;
                Arc::new(PgUserStore::new(pool))
            }
            StoreKind::Memory => Arc::new(MemoryUserStore::new()),
        };
        Ok(Self::from_parts(Arc::new(config), users))
    }

    pub fn from_parts(config: Arc<IdentityConfig>, users: Arc<dyn UserStore>) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        Self { config, users, keys }
    }
}

#[derive(Clone)]
pub struct CatalogState {
    pub config: Arc<CatalogConfig>,
    pub store: Arc<dyn CatalogStore>,
    pub identity: IdentityClient,
    pub validator: Arc<dyn TokenValidator>,
    pub cache: ReadCache,
}

impl CatalogState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = CatalogConfig::from_env()?;
        let store: Arc<dyn CatalogStore> = match config.store {
            StoreKind::Postgres => {
                let pool = db::connect(&config.database_url).await?;
                db::migrate(&pool, &db::CATALOG_MIGRATIONS).await;
                Arc::new(PgCatalogStore::new(pool))
            }
            StoreKind::Memory => Arc::new(MemoryCatalogStore::new()),
        };
        Self::from_parts(Arc::new(config), store)
    }

    pub fn from_parts(config: Arc<CatalogConfig>, store: Arc<dyn CatalogStore>) -> anyhow::Result<Self> {
        let identity = IdentityClient::new(
            config.identity_url.clone(),
            Duration::from_secs(config.identity_timeout_secs),
        )?;
        let validator = Arc::new(identity.clone()) as Arc<dyn TokenValidator>;
        let cache = ReadCache::new(Duration::from_secs(config.cache_ttl_secs));
        Ok(Self {
            config,
            store,
            identity,
            validator,
            cache,
        })
    }

    /// Authorization gate admitting identities that satisfy `required`.
    pub fn gate(&self, required: Role) -> Gate {
        Gate::new(self.validator.clone(), required)
    }
}
