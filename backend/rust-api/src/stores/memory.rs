use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{CacheTier, ModuleStore, ProgressStore, TaskStore};
use crate::error::StoreError;
use crate::models::{progress::progress_key, LearningModule, LearningTask, ModuleProgress, TaskStatus};

/// Switch shared by the in-memory stores to simulate an unreachable backend.
#[derive(Debug, Default)]
struct FailureSwitch(AtomicBool);

impl FailureSwitch {
    fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    fn check(&self, what: &str) -> Result<(), StoreError> {
        if self.0.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("{} is offline", what)))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<LearningTask>>,
    failing: FailureSwitch,
}

impl MemoryTaskStore {
    pub fn new(tasks: Vec<LearningTask>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            failing: FailureSwitch::default(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub async fn snapshot(&self) -> Vec<LearningTask> {
        self.tasks.read().await.clone()
    }

    pub async fn task(&self, task_id: &str) -> Option<LearningTask> {
        self.tasks
            .read()
            .await
            .iter()
            .find(|task| task.id == task_id)
            .cloned()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.failing.check("task store")
    }

    async fn fetch_active(&self, limit: usize) -> Result<Vec<LearningTask>, StoreError> {
        self.failing.check("task store")?;
        let mut active: Vec<LearningTask> = self
            .tasks
            .read()
            .await
            .iter()
            .filter(|task| task.task_status == TaskStatus::Active)
            .cloned()
            .collect();
        active.sort_by_key(|task| task.usage_count);
        active.truncate(limit);
        Ok(active)
    }

    async fn increment_usage(
        &self,
        task_id: &str,
        used_on: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.failing.check("task store")?;
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|task| task.id == task_id) {
            Some(task) => {
                task.mark_used(used_on);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.failing.check("task store")?;
        Ok(self.tasks.read().await.len() as u64)
    }

    async fn insert_many(&self, tasks: &[LearningTask]) -> Result<usize, StoreError> {
        self.failing.check("task store")?;
        self.tasks.write().await.extend_from_slice(tasks);
        Ok(tasks.len())
    }
}

#[derive(Debug, Default)]
pub struct MemoryModuleStore {
    modules: RwLock<Vec<LearningModule>>,
    failing: FailureSwitch,
}

impl MemoryModuleStore {
    pub fn new(modules: Vec<LearningModule>) -> Self {
        Self {
            modules: RwLock::new(modules),
            failing: FailureSwitch::default(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

#[async_trait]
impl ModuleStore for MemoryModuleStore {
    async fn list_modules(&self) -> Result<Vec<LearningModule>, StoreError> {
        self.failing.check("module store")?;
        let mut modules = self.modules.read().await.clone();
        modules.sort_by_key(|module| module.order);
        Ok(modules)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.failing.check("module store")?;
        Ok(self.modules.read().await.len() as u64)
    }

    async fn insert_many(&self, modules: &[LearningModule]) -> Result<usize, StoreError> {
        self.failing.check("module store")?;
        self.modules.write().await.extend_from_slice(modules);
        Ok(modules.len())
    }
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: RwLock<HashMap<String, ModuleProgress>>,
    failing: FailureSwitch,
}

impl MemoryProgressStore {
    pub fn new(records: Vec<ModuleProgress>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|record| (record.id.clone(), record))
                    .collect(),
            ),
            failing: FailureSwitch::default(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ModuleProgress>, StoreError> {
        self.failing.check("progress store")?;
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<ModuleProgress>, StoreError> {
        self.failing.check("progress store")?;
        Ok(self
            .records
            .read()
            .await
            .get(&progress_key(user_id, module_id))
            .cloned())
    }

    async fn save(
        &self,
        progress: &ModuleProgress,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        self.failing.check("progress store")?;
        let mut records = self.records.write().await;

        if let Some(expected) = expected_version {
            let actual = records.get(&progress.id).map(|r| r.version).unwrap_or(0);
            if actual != expected {
                return Err(StoreError::Conflict {
                    key: progress.id.clone(),
                    expected,
                    actual,
                });
            }
        }

        records.insert(progress.id.clone(), progress.clone());
        Ok(())
    }
}

/// Cache tier kept in process memory; TTLs are ignored because the cache
/// envelope carries its own timestamp.
#[derive(Debug, Default)]
pub struct MemoryCacheTier {
    entries: RwLock<HashMap<String, String>>,
    failing: FailureSwitch,
}

impl MemoryCacheTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

#[async_trait]
impl CacheTier for MemoryCacheTier {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.failing.check("cache tier")?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, payload: &str, _ttl_seconds: u64) -> Result<(), StoreError> {
        self.failing.check("cache tier")?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.failing.check("cache tier")?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
