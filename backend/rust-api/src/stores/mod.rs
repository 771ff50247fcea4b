//! Persistence collaborators. Services only talk to these traits; MongoDB and
//! Redis back them in production, the in-memory versions back tests and
//! local runs.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::{LearningModule, LearningTask, ModuleProgress};

pub mod memory;
pub mod mongo;
pub mod redis_tier;

pub use memory::{MemoryCacheTier, MemoryModuleStore, MemoryProgressStore, MemoryTaskStore};
pub use mongo::{MongoModuleStore, MongoProgressStore, MongoTaskStore};
pub use redis_tier::RedisCacheTier;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Active tasks, least used first, at most `limit`.
    async fn fetch_active(&self, limit: usize) -> Result<Vec<LearningTask>, StoreError>;

    /// Bumps `usageCount` and moves `lastUsedDate` forward to `used_on`.
    /// Returns `false` when no task has that id.
    async fn increment_usage(&self, task_id: &str, used_on: NaiveDate)
        -> Result<bool, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn insert_many(&self, tasks: &[LearningTask]) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait ModuleStore: Send + Sync {
    /// All modules ordered by their `order` field.
    async fn list_modules(&self) -> Result<Vec<LearningModule>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn insert_many(&self, modules: &[LearningModule]) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ModuleProgress>, StoreError>;

    async fn get(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<ModuleProgress>, StoreError>;

    /// Writes the whole record. Without `expected_version` the last writer
    /// wins; with it, the write only lands if the stored version matches.
    async fn save(
        &self,
        progress: &ModuleProgress,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError>;
}

/// Shared second cache level holding serialized cache envelopes.
#[async_trait]
pub trait CacheTier: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn store(&self, key: &str, payload: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    async fn clear(&self, key: &str) -> Result<(), StoreError>;
}
