use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::config::TaskSettings;
use crate::data::{sample_tasks, sample_videos};
use crate::metrics::{record_pool_source, DAILY_TASKS_SERVED_TOTAL, TASK_USAGE_UPDATES_TOTAL};
use crate::models::{DailyTask, DailyTasksResponse, LearningTask, PoolBreakdown};
use crate::services::cache::{CacheInfo, ExpiringCache};
use crate::services::selection::select_daily_tasks;
use crate::stores::{CacheTier, TaskStore};
use crate::utils::clock::Clock;
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::rng::seed_for_date;

const POOL_CACHE_NAME: &str = "ecg_tasks_cache";

/// Where a task pool came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
    Cache,
    Store,
    StaleCache,
    Samples,
}

impl PoolSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolSource::Cache => "cache",
            PoolSource::Store => "store",
            PoolSource::StaleCache => "stale_cache",
            PoolSource::Samples => "samples",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskPool {
    pub tasks: Vec<LearningTask>,
    pub source: PoolSource,
    /// Sample videos added to a guest pool; never counted in the store.
    pub supplemented: HashSet<String>,
}

impl TaskPool {
    fn new(tasks: Vec<LearningTask>, source: PoolSource) -> Self {
        Self {
            tasks,
            source,
            supplemented: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    Recorded,
    UnknownTask,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRefresh {
    pub source: PoolSource,
    pub pool: PoolBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDiagnostics {
    pub cache: CacheInfo,
    pub store_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
    pub stored_tasks: Option<u64>,
    pub pool_source: PoolSource,
    pub pool: PoolBreakdown,
    pub guest_pool: PoolBreakdown,
}

/// Task ids already counted for one serving date.
#[derive(Debug, Default)]
struct ServedLedger {
    date: Option<NaiveDate>,
    ids: HashSet<String>,
}

impl ServedLedger {
    /// True the first time `task_id` is seen for `date`.
    fn first_serve(&mut self, date: NaiveDate, task_id: &str) -> bool {
        if self.date != Some(date) {
            self.date = Some(date);
            self.ids.clear();
        }
        self.ids.insert(task_id.to_string())
    }
}

/// Serves the daily task list from the content store through an expiring
/// cache, degrading to stale data and then to built-in samples.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    cache: ExpiringCache<Vec<LearningTask>>,
    clock: Arc<dyn Clock>,
    settings: TaskSettings,
    retry: RetryConfig,
    served: Mutex<ServedLedger>,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        tier: Option<Arc<dyn CacheTier>>,
        clock: Arc<dyn Clock>,
        settings: TaskSettings,
    ) -> Self {
        let cache = ExpiringCache::new(
            POOL_CACHE_NAME,
            settings.cache_ttl_seconds,
            settings.cache_version.clone(),
            clock.clone(),
        )
        .with_tier(tier);

        Self {
            store,
            cache,
            clock,
            settings,
            retry: RetryConfig::default(),
            served: Mutex::new(ServedLedger::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Active task pool for selection. Never fails.
    pub async fn fetch_all_active_tasks(&self, guest: bool) -> Vec<LearningTask> {
        self.load_pool(guest).await.tasks
    }

    pub async fn load_pool(&self, guest: bool) -> TaskPool {
        let mut pool = self.base_pool().await;
        record_pool_source(pool.source.as_str());

        if guest {
            pool.supplemented = self.supplement_guest_pool(&mut pool.tasks);
        }
        pool
    }

    async fn base_pool(&self) -> TaskPool {
        if let Some(tasks) = self.cache.get().await {
            tracing::debug!("Using cached task pool ({} tasks)", tasks.len());
            return TaskPool::new(tasks, PoolSource::Cache);
        }

        let limit = self.settings.fetch_limit;
        let fetched = retry_async_with_config("fetch active tasks", &self.retry, || {
            self.store.fetch_active(limit)
        })
        .await;

        match fetched {
            Ok(tasks) if tasks.is_empty() => {
                tracing::warn!("Task store has no active tasks, serving samples");
                TaskPool::new(sample_tasks(), PoolSource::Samples)
            }
            Ok(tasks) => {
                tracing::info!("Loaded {} active tasks from store", tasks.len());
                self.cache.put(tasks.clone()).await;
                TaskPool::new(tasks, PoolSource::Store)
            }
            Err(e) => {
                tracing::error!("Failed to fetch task pool: {}", e);
                match self.cache.get_stale().await {
                    Some(tasks) => {
                        tracing::warn!("Serving stale task pool ({} tasks)", tasks.len());
                        TaskPool::new(tasks, PoolSource::StaleCache)
                    }
                    None => {
                        tracing::warn!("No cached task pool, serving samples");
                        TaskPool::new(sample_tasks(), PoolSource::Samples)
                    }
                }
            }
        }
    }

    /// Tops guest pools up with sample videos until `guest_min_videos` is met.
    /// Returns the ids that were added.
    fn supplement_guest_pool(&self, tasks: &mut Vec<LearningTask>) -> HashSet<String> {
        let mut added = HashSet::new();
        let mut videos = tasks.iter().filter(|t| t.is_video()).count();
        if videos >= self.settings.guest_min_videos {
            return added;
        }

        let mut known: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
        for video in sample_videos() {
            if videos >= self.settings.guest_min_videos {
                break;
            }
            if known.insert(video.id.clone()) {
                added.insert(video.id.clone());
                tasks.push(video);
                videos += 1;
            }
        }
        tracing::debug!("Guest pool supplemented to {} videos", videos);
        added
    }

    /// Today's (or `date`'s) task list.
    pub async fn daily_tasks(
        &self,
        guest: bool,
        date: Option<NaiveDate>,
        count: Option<usize>,
    ) -> DailyTasksResponse {
        let date = date.unwrap_or_else(|| self.clock.today());
        let count = count.unwrap_or(self.settings.daily_count);
        let seed = seed_for_date(date);

        let pool = self.load_pool(guest).await;
        let servable: Vec<LearningTask> = pool
            .tasks
            .iter()
            .filter(|task| task.is_servable())
            .cloned()
            .collect();
        if servable.len() < pool.tasks.len() {
            tracing::warn!(
                "Skipping {} tasks without a question",
                pool.tasks.len() - servable.len()
            );
        }
        let selected = select_daily_tasks(&servable, seed, count);

        if self.settings.record_usage_on_serve && pool.source != PoolSource::Samples {
            let fresh: Vec<&LearningTask> = {
                let mut served = self
                    .served
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                selected
                    .iter()
                    .filter(|task| !pool.supplemented.contains(&task.id))
                    .filter(|task| !task.last_used_date.is_some_and(|last| last >= date))
                    .filter(|task| served.first_serve(date, &task.id))
                    .collect()
            };
            for task in fresh {
                self.record_usage(&task.id, date).await;
            }
        }

        let tasks: Vec<DailyTask> = selected.iter().filter_map(DailyTask::from_task).collect();
        for task in &tasks {
            DAILY_TASKS_SERVED_TOTAL
                .with_label_values(&[task.task_type.as_str()])
                .inc();
        }

        let video_count = tasks
            .iter()
            .filter(|t| t.task_type == crate::models::TaskType::Video)
            .count();

        tracing::info!(
            "Served {} daily tasks for {} (seed {}, guest {}, source {})",
            tasks.len(),
            date,
            seed,
            guest,
            pool.source.as_str()
        );

        DailyTasksResponse {
            date,
            seed,
            other_count: tasks.len() - video_count,
            video_count,
            tasks,
        }
    }

    /// Bumps the usage counter of `task_id`. Store failures are logged and
    /// reported as `Failed`, never raised.
    pub async fn record_usage(&self, task_id: &str, date: NaiveDate) -> UsageOutcome {
        let outcome = match self.store.increment_usage(task_id, date).await {
            Ok(true) => UsageOutcome::Recorded,
            Ok(false) => {
                tracing::debug!("Usage not recorded, unknown task {}", task_id);
                UsageOutcome::UnknownTask
            }
            Err(e) => {
                tracing::warn!("Failed to record usage for task {}: {}", task_id, e);
                UsageOutcome::Failed
            }
        };

        let label = match outcome {
            UsageOutcome::Recorded => "recorded",
            UsageOutcome::UnknownTask => "unknown",
            UsageOutcome::Failed => "error",
        };
        TASK_USAGE_UPDATES_TOTAL.with_label_values(&[label]).inc();
        outcome
    }

    pub async fn cache_info(&self) -> CacheInfo {
        self.cache.info().await
    }

    pub async fn clear_cache(&self) {
        self.cache.invalidate().await;
    }

    /// Drops the cached pool and loads a new one.
    pub async fn refresh_pool(&self) -> PoolRefresh {
        self.cache.invalidate().await;
        let pool = self.load_pool(false).await;
        PoolRefresh {
            source: pool.source,
            pool: PoolBreakdown::of(&pool.tasks),
        }
    }

    pub async fn diagnose(&self) -> TaskDiagnostics {
        let (store_reachable, store_error) = match self.store.ping().await {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        let stored_tasks = if store_reachable {
            self.store.count().await.ok()
        } else {
            None
        };

        let pool = self.load_pool(false).await;
        let mut guest_tasks = pool.tasks.clone();
        self.supplement_guest_pool(&mut guest_tasks);

        TaskDiagnostics {
            cache: self.cache.info().await,
            store_reachable,
            store_error,
            stored_tasks,
            pool_source: pool.source,
            pool: PoolBreakdown::of(&pool.tasks),
            guest_pool: PoolBreakdown::of(&guest_tasks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, TaskType};
    use crate::stores::MemoryTaskStore;
    use crate::utils::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    fn quiz(id: &str, difficulty: Difficulty) -> LearningTask {
        let mut task = LearningTask::new(id, TaskType::Quiz, difficulty);
        task.question = Some(format!("Question {}", id));
        task.options = vec!["A".into(), "B".into()];
        task.correct_answer = Some("B".into());
        task
    }

    fn video(id: &str) -> LearningTask {
        let mut task = LearningTask::new(id, TaskType::Video, Difficulty::Medium);
        task.question = Some(format!("Watch {}", id));
        task
    }

    fn stored_pool() -> Vec<LearningTask> {
        vec![
            quiz("q1", Difficulty::Easy),
            quiz("q2", Difficulty::Medium),
            quiz("q3", Difficulty::Hard),
            quiz("q4", Difficulty::Easy),
            video("v1"),
        ]
    }

    fn service(store: Arc<MemoryTaskStore>) -> (TaskService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        ));
        let service = TaskService::new(store, None, clock.clone(), TaskSettings::default())
            .with_retry(RetryConfig::none());
        (service, clock)
    }

    #[tokio::test]
    async fn pool_is_cached_until_ttl() {
        let store = Arc::new(MemoryTaskStore::new(stored_pool()));
        let (service, clock) = service(store.clone());

        assert_eq!(service.load_pool(false).await.source, PoolSource::Store);
        assert_eq!(service.load_pool(false).await.source, PoolSource::Cache);

        clock.advance(Duration::minutes(31));
        assert_eq!(service.load_pool(false).await.source, PoolSource::Store);
    }

    #[tokio::test]
    async fn store_failure_uses_stale_cache_then_samples() {
        let store = Arc::new(MemoryTaskStore::new(stored_pool()));
        let (service, clock) = service(store.clone());

        service.load_pool(false).await;
        clock.advance(Duration::hours(2));
        store.set_failing(true);

        let pool = service.load_pool(false).await;
        assert_eq!(pool.source, PoolSource::StaleCache);
        assert_eq!(pool.tasks.len(), 5);

        service.clear_cache().await;
        let pool = service.load_pool(false).await;
        assert_eq!(pool.source, PoolSource::Samples);
        assert_eq!(pool.tasks.len(), 7);
    }

    #[tokio::test]
    async fn empty_store_serves_samples() {
        let store = Arc::new(MemoryTaskStore::new(vec![]));
        let (service, _) = service(store);
        let pool = service.load_pool(false).await;
        assert_eq!(pool.source, PoolSource::Samples);
    }

    #[tokio::test]
    async fn guests_get_at_least_three_videos() {
        let store = Arc::new(MemoryTaskStore::new(stored_pool()));
        let (service, _) = service(store);

        let guest = service.fetch_all_active_tasks(true).await;
        assert_eq!(guest.iter().filter(|t| t.is_video()).count(), 3);
        assert_eq!(guest.len(), 7);

        let registered = service.fetch_all_active_tasks(false).await;
        assert_eq!(registered.len(), 5);
    }

    #[tokio::test]
    async fn guest_supplement_skips_ids_already_present() {
        let mut pool = stored_pool();
        pool.push(crate::data::sample_videos().remove(0));
        let store = Arc::new(MemoryTaskStore::new(pool));
        let (service, _) = service(store);

        let guest = service.fetch_all_active_tasks(true).await;
        let ids: HashSet<&str> = guest.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), guest.len());
        assert_eq!(guest.iter().filter(|t| t.is_video()).count(), 3);
    }

    #[tokio::test]
    async fn daily_tasks_are_stable_for_a_date_and_record_usage_once() {
        let store = Arc::new(MemoryTaskStore::new(stored_pool()));
        let (service, _) = service(store.clone());
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let first = service.daily_tasks(false, Some(date), Some(3)).await;
        assert_eq!(first.tasks.len(), 3);
        assert_eq!(first.seed, seed_for_date(date));
        assert_eq!(first.tasks[0].task_type, TaskType::Video);
        assert_eq!(first.video_count + first.other_count, 3);

        for task in &first.tasks {
            let stored = store.task(&task.id).await.unwrap();
            assert_eq!(stored.usage_count, 1);
            assert_eq!(stored.last_used_date, Some(date));
        }

        // Cached pool still holds the pre-serve counts, so the pick repeats.
        let second = service.daily_tasks(false, Some(date), Some(3)).await;
        let ids = |r: &DailyTasksResponse| r.tasks.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        for task in &second.tasks {
            assert_eq!(store.task(&task.id).await.unwrap().usage_count, 1);
        }
    }

    #[tokio::test]
    async fn samples_are_never_counted() {
        let store = Arc::new(MemoryTaskStore::new(vec![]));
        let (service, _) = service(store.clone());

        let response = service.daily_tasks(true, None, None).await;
        assert_eq!(response.tasks.len(), 5);
        assert_eq!(response.date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn tasks_without_a_question_never_take_a_slot() {
        let mut blank = video("v-blank");
        blank.question = Some("   ".into());
        blank.priority = 100;
        let mut missing = quiz("q-missing", Difficulty::Easy);
        missing.question = None;
        let store = Arc::new(MemoryTaskStore::new(vec![
            blank,
            missing,
            video("v1"),
            quiz("q1", Difficulty::Easy),
            quiz("q2", Difficulty::Medium),
        ]));
        let (service, _) = service(store.clone());
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let response = service.daily_tasks(false, Some(date), Some(5)).await;
        let ids: Vec<&str> = response.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], "v1");
        assert!(!ids.contains(&"v-blank") && !ids.contains(&"q-missing"));

        assert_eq!(store.task("v-blank").await.unwrap().usage_count, 0);
        assert_eq!(store.task("q-missing").await.unwrap().usage_count, 0);
    }

    #[tokio::test]
    async fn supplemented_guest_videos_are_not_counted() {
        let quizzes = vec![
            quiz("q1", Difficulty::Easy),
            quiz("q2", Difficulty::Medium),
            quiz("q3", Difficulty::Hard),
        ];
        let store = Arc::new(MemoryTaskStore::new(quizzes));
        let (service, _) = service(store.clone());
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let pool = service.load_pool(true).await;
        assert_eq!(pool.supplemented.len(), 3);

        let response = service.daily_tasks(true, Some(date), Some(6)).await;
        assert_eq!(response.video_count, 3);
        assert_eq!(response.tasks.len(), 6);

        let counted: HashSet<String> = service.served.lock().unwrap().ids.clone();
        let expected: HashSet<String> = ["q1", "q2", "q3"].iter().map(|id| id.to_string()).collect();
        assert_eq!(counted, expected);

        let stored = store.snapshot().await;
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|task| task.usage_count == 1));
    }

    #[tokio::test]
    async fn record_usage_reports_outcome_without_failing() {
        let store = Arc::new(MemoryTaskStore::new(stored_pool()));
        let (service, _) = service(store.clone());
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        assert_eq!(service.record_usage("q1", date).await, UsageOutcome::Recorded);
        assert_eq!(service.record_usage("nope", date).await, UsageOutcome::UnknownTask);

        store.set_failing(true);
        assert_eq!(service.record_usage("q1", date).await, UsageOutcome::Failed);
    }

    #[tokio::test]
    async fn diagnose_reports_unreachable_store() {
        let store = Arc::new(MemoryTaskStore::new(stored_pool()));
        let (service, _) = service(store.clone());
        store.set_failing(true);

        let report = service.diagnose().await;
        assert!(!report.store_reachable);
        assert!(report.store_error.is_some());
        assert_eq!(report.pool_source, PoolSource::Samples);
        assert_eq!(report.pool.total, 7);
        assert!(report.guest_pool.video >= 3);
    }
}
