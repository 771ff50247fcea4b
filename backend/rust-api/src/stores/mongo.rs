use async_trait::async_trait;
use chrono::NaiveDate;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Document},
    options::FindOptions,
    Collection, Database,
};

use super::{ModuleStore, ProgressStore, TaskStore};
use crate::error::StoreError;
use crate::metrics::track_store_operation;
use crate::models::{progress::progress_key, LearningModule, LearningTask, ModuleProgress};

pub const TASKS_COLLECTION: &str = "ecg_tasks";
pub const MODULES_COLLECTION: &str = "learning_modules";
pub const PROGRESS_COLLECTION: &str = "learning_progress";

pub struct MongoTaskStore {
    mongo: Database,
}

impl MongoTaskStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<LearningTask> {
        self.mongo.collection(TASKS_COLLECTION)
    }
}

#[async_trait]
impl TaskStore for MongoTaskStore {
    async fn ping(&self) -> Result<(), StoreError> {
        track_store_operation("ping", "admin", async {
            self.mongo.run_command(doc! { "ping": 1 }).await?;
            Ok(())
        })
        .await
    }

    async fn fetch_active(&self, limit: usize) -> Result<Vec<LearningTask>, StoreError> {
        track_store_operation("find", TASKS_COLLECTION, async {
            let options = FindOptions::builder()
                .sort(doc! { "usageCount": 1 })
                .limit(limit as i64)
                .build();

            let cursor = self
                .collection()
                .find(doc! { "taskStatus": "active" })
                .with_options(options)
                .await?;

            let tasks: Vec<LearningTask> = cursor.try_collect().await?;
            tracing::debug!("Fetched {} active tasks from MongoDB", tasks.len());
            Ok(tasks)
        })
        .await
    }

    async fn increment_usage(
        &self,
        task_id: &str,
        used_on: NaiveDate,
    ) -> Result<bool, StoreError> {
        track_store_operation("update", TASKS_COLLECTION, async {
            // ISO dates compare lexically, so $max keeps lastUsedDate monotonic.
            let result = self
                .collection()
                .update_one(
                    doc! { "_id": task_id },
                    doc! {
                        "$inc": { "usageCount": 1 },
                        "$max": { "lastUsedDate": used_on.format("%Y-%m-%d").to_string() },
                    },
                )
                .await?;
            Ok(result.matched_count > 0)
        })
        .await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        track_store_operation("count", TASKS_COLLECTION, async {
            Ok(self.collection().count_documents(doc! {}).await?)
        })
        .await
    }

    async fn insert_many(&self, tasks: &[LearningTask]) -> Result<usize, StoreError> {
        if tasks.is_empty() {
            return Ok(0);
        }
        track_store_operation("insert", TASKS_COLLECTION, async {
            let result = self.collection().insert_many(tasks).await?;
            Ok(result.inserted_ids.len())
        })
        .await
    }
}

pub struct MongoModuleStore {
    mongo: Database,
}

impl MongoModuleStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<LearningModule> {
        self.mongo.collection(MODULES_COLLECTION)
    }
}

#[async_trait]
impl ModuleStore for MongoModuleStore {
    async fn list_modules(&self) -> Result<Vec<LearningModule>, StoreError> {
        track_store_operation("find", MODULES_COLLECTION, async {
            let options = FindOptions::builder().sort(doc! { "order": 1 }).build();
            let cursor = self
                .collection()
                .find(doc! {})
                .with_options(options)
                .await?;
            Ok(cursor.try_collect().await?)
        })
        .await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        track_store_operation("count", MODULES_COLLECTION, async {
            Ok(self.collection().count_documents(doc! {}).await?)
        })
        .await
    }

    async fn insert_many(&self, modules: &[LearningModule]) -> Result<usize, StoreError> {
        if modules.is_empty() {
            return Ok(0);
        }
        track_store_operation("insert", MODULES_COLLECTION, async {
            let result = self.collection().insert_many(modules).await?;
            Ok(result.inserted_ids.len())
        })
        .await
    }
}

pub struct MongoProgressStore {
    mongo: Database,
}

impl MongoProgressStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<ModuleProgress> {
        self.mongo.collection(PROGRESS_COLLECTION)
    }

    async fn stored_version(&self, key: &str) -> Result<u64, StoreError> {
        let raw: Collection<Document> = self.mongo.collection(PROGRESS_COLLECTION);
        let found = raw.find_one(doc! { "_id": key }).await?;
        match found.and_then(|d| d.get("version").cloned()) {
            Some(version) => {
                bson::from_bson::<u64>(version).map_err(|e| StoreError::Serialization {
                    what: "progress version",
                    message: e.to_string(),
                })
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl ProgressStore for MongoProgressStore {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ModuleProgress>, StoreError> {
        track_store_operation("find", PROGRESS_COLLECTION, async {
            let cursor = self.collection().find(doc! { "userId": user_id }).await?;
            Ok(cursor.try_collect().await?)
        })
        .await
    }

    async fn get(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<ModuleProgress>, StoreError> {
        track_store_operation("find_one", PROGRESS_COLLECTION, async {
            Ok(self
                .collection()
                .find_one(doc! { "_id": progress_key(user_id, module_id) })
                .await?)
        })
        .await
    }

    async fn save(
        &self,
        progress: &ModuleProgress,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        track_store_operation("replace", PROGRESS_COLLECTION, async {
            match expected_version {
                None => {
                    self.collection()
                        .replace_one(doc! { "_id": &progress.id }, progress)
                        .upsert(true)
                        .await?;
                }
                Some(0) => {
                    // First write: succeeds only if nobody created the record meanwhile.
                    if let Err(err) = self.collection().insert_one(progress).await {
                        let actual = self.stored_version(&progress.id).await?;
                        if actual == 0 {
                            return Err(err.into());
                        }
                        return Err(StoreError::Conflict {
                            key: progress.id.clone(),
                            expected: 0,
                            actual,
                        });
                    }
                }
                Some(expected) => {
                    let result = self
                        .collection()
                        .replace_one(
                            doc! { "_id": &progress.id, "version": expected as i64 },
                            progress,
                        )
                        .await?;
                    if result.matched_count == 0 {
                        let actual = self.stored_version(&progress.id).await?;
                        return Err(StoreError::Conflict {
                            key: progress.id.clone(),
                            expected,
                            actual,
                        });
                    }
                }
            }
            Ok(())
        })
        .await
    }
}
