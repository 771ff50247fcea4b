use std::sync::Arc;

use crate::config::Config;
use crate::stores::{
    CacheTier, MemoryModuleStore, MemoryProgressStore, MemoryTaskStore, MongoModuleStore,
    MongoProgressStore, MongoTaskStore, RedisCacheTier, TaskStore,
};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::retry::RetryConfig;
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;

pub mod cache;
pub mod content_import;
pub mod event_unlock;
pub mod lesson_access;
pub mod levels;
pub mod module_service;
pub mod selection;
pub mod task_service;
pub mod unlock;

use module_service::ModuleService;
use task_service::TaskService;

pub struct AppState {
    pub config: Config,
    pub tasks: TaskService,
    pub modules: ModuleService,
    pub task_store: Arc<dyn TaskStore>,
    pub redis: Option<RedisCacheTier>,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: Option<redis::Client>,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        let redis = match redis_client {
            Some(client) => connect_redis(client).await,
            None => {
                tracing::info!("No Redis configured, caches stay in process");
                None
            }
        };
        let tier = redis
            .clone()
            .map(|redis| Arc::new(redis) as Arc<dyn CacheTier>);

        let task_store: Arc<dyn TaskStore> = Arc::new(MongoTaskStore::new(mongo.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let tasks = TaskService::new(
            task_store.clone(),
            tier.clone(),
            clock.clone(),
            config.tasks.clone(),
        );
        let modules = ModuleService::new(
            Arc::new(MongoModuleStore::new(mongo.clone())),
            Arc::new(MongoProgressStore::new(mongo)),
            tier,
            clock,
            config.modules.clone(),
        );

        Ok(Self {
            config,
            tasks,
            modules,
            task_store,
            redis,
        })
    }

    /// State over in-memory stores, without retries; used by tests and local
    /// runs without MongoDB.
    pub fn in_memory(
        config: Config,
        task_store: Arc<MemoryTaskStore>,
        module_store: Arc<MemoryModuleStore>,
        progress_store: Arc<MemoryProgressStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tasks = TaskService::new(
            task_store.clone(),
            None,
            clock.clone(),
            config.tasks.clone(),
        )
        .with_retry(RetryConfig::none());
        let modules = ModuleService::new(
            module_store,
            progress_store,
            None,
            clock,
            config.modules.clone(),
        )
        .with_retry(RetryConfig::none());

        Self {
            config,
            tasks,
            modules,
            task_store,
            redis: None,
        }
    }
}

/// Connects the shared cache tier. Failures are logged and the service
/// continues without it.
async fn connect_redis(client: redis::Client) -> Option<RedisCacheTier> {
    tracing::info!("Attempting to connect to Redis...");

    let manager = match tokio::time::timeout(
        std::time::Duration::from_secs(10),
        ConnectionManager::new(client),
    )
    .await
    {
        Ok(Ok(manager)) => manager,
        Ok(Err(e)) => {
            tracing::warn!("Redis unavailable, continuing without shared cache: {}", e);
            return None;
        }
        Err(_) => {
            tracing::warn!("Redis connection timeout after 10s, continuing without shared cache");
            return None;
        }
    };

    let tier = RedisCacheTier::new(manager);
    match tokio::time::timeout(std::time::Duration::from_secs(5), tier.ping()).await {
        Ok(Ok(())) => {
            tracing::info!("Redis connection established successfully");
            Some(tier)
        }
        Ok(Err(e)) => {
            tracing::warn!("Redis PING failed, continuing without shared cache: {}", e);
            None
        }
        Err(_) => {
            tracing::warn!("Redis PING timeout after 5s, continuing without shared cache");
            None
        }
    }
}
