use std::sync::Arc;
use validator::Validate;

use crate::config::ModuleSettings;
use crate::data::sample_modules;
use crate::error::{LearningError, StoreError};
use crate::metrics::{record_unlock_check, PROGRESS_UPDATES_TOTAL};
use crate::models::{LessonView, ModuleOverview, ModuleProgress, ProgressOutcome, ProgressUpdate};
use crate::services::cache::ExpiringCache;
use crate::services::lesson_access::{lesson_views, LessonContext};
use crate::services::levels::{level_for_xp, UserLevel};
use crate::services::unlock::{ModuleCatalog, UnresolvedPrerequisitePolicy};
use crate::stores::{CacheTier, ModuleStore, ProgressStore};
use crate::utils::clock::Clock;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

const CATALOG_CACHE_NAME: &str = "learning_modules_catalog";
const CATALOG_CACHE_VERSION: &str = "1";

/// Where the module catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CatalogSource {
    Cache,
    Store,
    StaleCache,
    /// The store answered but holds no modules.
    Samples,
    /// The store failed and nothing was cached; sample modules stand in.
    Fallback,
}

impl CatalogSource {
    /// False when the catalog says nothing about the real module set.
    fn is_authoritative(&self) -> bool {
        !matches!(self, CatalogSource::Fallback)
    }
}

struct LoadedCatalog {
    catalog: ModuleCatalog,
    source: CatalogSource,
}

impl LoadedCatalog {
    /// Catalog usable for unlock answers and writes.
    fn authoritative(self) -> Result<ModuleCatalog, StoreError> {
        if self.source.is_authoritative() {
            Ok(self.catalog)
        } else {
            Err(StoreError::Unavailable(
                "module catalog could not be loaded".to_string(),
            ))
        }
    }
}

/// Module catalog, unlock checks and progress writes.
///
/// Unlock answers are fail-closed: whenever progress cannot be read the
/// module is reported locked rather than surfacing an error.
pub struct ModuleService {
    modules: Arc<dyn ModuleStore>,
    progress: Arc<dyn ProgressStore>,
    catalog: ExpiringCache<ModuleCatalog>,
    clock: Arc<dyn Clock>,
    policy: UnresolvedPrerequisitePolicy,
    retry: RetryConfig,
}

impl ModuleService {
    pub fn new(
        modules: Arc<dyn ModuleStore>,
        progress: Arc<dyn ProgressStore>,
        tier: Option<Arc<dyn CacheTier>>,
        clock: Arc<dyn Clock>,
        settings: ModuleSettings,
    ) -> Self {
        let catalog = ExpiringCache::new(
            CATALOG_CACHE_NAME,
            settings.catalog_ttl_seconds,
            CATALOG_CACHE_VERSION,
            clock.clone(),
        )
        .with_tier(tier);

        Self {
            modules,
            progress,
            catalog,
            clock,
            policy: settings.unresolved_prerequisites,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn policy(&self) -> UnresolvedPrerequisitePolicy {
        self.policy
    }

    /// Resolved catalog for display. Falls back to stale data, then to the
    /// sample modules, when the store is empty or unreachable.
    pub async fn catalog(&self) -> ModuleCatalog {
        self.load_catalog().await.catalog
    }

    async fn load_catalog(&self) -> LoadedCatalog {
        if let Some(catalog) = self.catalog.get().await {
            return LoadedCatalog {
                catalog,
                source: CatalogSource::Cache,
            };
        }

        let listed = retry_async_with_config("list modules", &self.retry, || {
            self.modules.list_modules()
        })
        .await;

        match listed {
            Ok(modules) if modules.is_empty() => {
                tracing::warn!("Module store is empty, using sample modules");
                LoadedCatalog {
                    catalog: ModuleCatalog::build(sample_modules()),
                    source: CatalogSource::Samples,
                }
            }
            Ok(modules) => {
                let catalog = ModuleCatalog::build(modules);
                tracing::info!(
                    "Loaded module catalog: {} modules, {} unresolved prerequisites",
                    catalog.len(),
                    catalog.unresolved().len()
                );
                self.catalog.put(catalog.clone()).await;
                LoadedCatalog {
                    catalog,
                    source: CatalogSource::Store,
                }
            }
            Err(e) => {
                tracing::error!("Failed to load module catalog: {}", e);
                match self.catalog.get_stale().await {
                    Some(catalog) => LoadedCatalog {
                        catalog,
                        source: CatalogSource::StaleCache,
                    },
                    None => {
                        tracing::warn!("No cached module catalog, unlock answers are locked");
                        LoadedCatalog {
                            catalog: ModuleCatalog::build(sample_modules()),
                            source: CatalogSource::Fallback,
                        }
                    }
                }
            }
        }
    }

    pub async fn invalidate_catalog(&self) {
        self.catalog.invalidate().await;
    }

    async fn user_progress(&self, user_id: &str) -> Result<Vec<ModuleProgress>, LearningError> {
        let records = retry_async_with_config("list progress", &self.retry, || {
            self.progress.list_for_user(user_id)
        })
        .await?;
        Ok(records)
    }

    /// Unlock check for one module. Never fails; errors and unknown modules
    /// read as locked.
    pub async fn is_module_unlocked(&self, user_id: &str, module_id: &str) -> bool {
        let catalog = match self.load_catalog().await.authoritative() {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Treating module {} as locked: {}", module_id, e);
                record_unlock_check("error");
                return false;
            }
        };
        if catalog.get(module_id).is_none() {
            tracing::debug!("Unlock check for unknown module {}", module_id);
            record_unlock_check("unknown");
            return false;
        }

        let progress = match self.user_progress(user_id).await {
            Ok(progress) => progress,
            Err(e) => {
                tracing::warn!(
                    "Progress lookup failed for user {}, treating module {} as locked: {}",
                    user_id,
                    module_id,
                    e
                );
                record_unlock_check("error");
                return false;
            }
        };

        let unlocked = catalog.is_unlocked(module_id, &progress, self.policy);
        record_unlock_check(if unlocked { "unlocked" } else { "locked" });
        unlocked
    }

    /// Every module with its unlock flag and the learner's progress.
    pub async fn modules_for_user(&self, user_id: &str) -> Vec<ModuleOverview> {
        let loaded = self.load_catalog().await;

        let progress = if !loaded.source.is_authoritative() {
            tracing::warn!("Module catalog unavailable, listing every module locked");
            record_unlock_check("error");
            None
        } else {
            match self.user_progress(user_id).await {
                Ok(progress) => Some(progress),
                Err(e) => {
                    tracing::warn!("Progress lookup failed for user {}: {}", user_id, e);
                    record_unlock_check("error");
                    None
                }
            }
        };

        let catalog = loaded.catalog;
        catalog
            .modules()
            .iter()
            .map(|module| match &progress {
                Some(records) => {
                    let own = records.iter().find(|r| r.module_id == module.id).cloned();
                    let unlocked = catalog.is_unlocked(&module.id, records, self.policy);
                    ModuleOverview::new(module, unlocked, own)
                }
                None => ModuleOverview::new(module, false, None),
            })
            .collect()
    }

    /// Lesson states for one module. Fails with a store error while the
    /// catalog cannot be loaded.
    pub async fn lesson_states(
        &self,
        user_id: &str,
        module_id: &str,
        hearts: Option<u32>,
        guest: bool,
    ) -> Result<Vec<LessonView>, LearningError> {
        let catalog = self.load_catalog().await.authoritative()?;
        let module = catalog
            .get(module_id)
            .ok_or_else(|| LearningError::not_found("Module", module_id))?;

        let (module_unlocked, completed_lessons) = match self.user_progress(user_id).await {
            Ok(records) => {
                let completed = records
                    .iter()
                    .find(|r| r.module_id == module_id)
                    .map(|r| r.completed_lessons)
                    .unwrap_or(0);
                (catalog.is_unlocked(module_id, &records, self.policy), completed)
            }
            Err(e) => {
                tracing::warn!("Progress lookup failed for user {}: {}", user_id, e);
                (false, 0)
            }
        };

        let ctx = LessonContext {
            completed_lessons,
            hearts,
            guest,
            module_unlocked,
        };
        Ok(lesson_views(module, &ctx))
    }

    /// Level from the points earned across every module record.
    pub async fn user_level(&self, user_id: &str) -> Result<UserLevel, LearningError> {
        let records = self.user_progress(user_id).await?;
        let xp: u64 = records.iter().map(|r| u64::from(r.earned_points)).sum();
        Ok(UserLevel {
            user_id: user_id.to_string(),
            xp,
            level: level_for_xp(xp),
        })
    }

    /// `None` means the learner has not started the module.
    pub async fn get_progress(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<ModuleProgress>, LearningError> {
        let catalog = self.load_catalog().await.authoritative()?;
        if catalog.get(module_id).is_none() {
            return Err(LearningError::not_found("Module", module_id));
        }
        Ok(self.progress.get(user_id, module_id).await?)
    }

    /// Applies `update` to the learner's record for `module_id`.
    ///
    /// Totals come from the catalog and the status is re-derived. Without
    /// `expectedVersion` the write is last-write-wins. When the write
    /// completes the module, dependents that are now open are returned.
    pub async fn update_progress(
        &self,
        user_id: &str,
        module_id: &str,
        update: ProgressUpdate,
    ) -> Result<ProgressOutcome, LearningError> {
        update.validate()?;

        let catalog = self.load_catalog().await.authoritative()?;
        let module = catalog
            .get(module_id)
            .ok_or_else(|| LearningError::not_found("Module", module_id))?;

        let existing = self.progress.get(user_id, module_id).await?;
        let was_completed = existing.as_ref().is_some_and(ModuleProgress::is_completed);

        let progress = ModuleProgress::merged(
            existing,
            user_id,
            module_id,
            &update,
            module.total_lessons(),
            module.total_tasks(),
            self.clock.now(),
        );

        if let Err(e) = self.progress.save(&progress, update.expected_version).await {
            let label = if matches!(e, StoreError::Conflict { .. }) {
                "conflict"
            } else {
                "error"
            };
            PROGRESS_UPDATES_TOTAL.with_label_values(&[label]).inc();
            return Err(e.into());
        }
        PROGRESS_UPDATES_TOTAL.with_label_values(&["saved"]).inc();

        tracing::info!(
            "Progress saved: user={}, module={}, status={}, lessons={}/{}, version={}",
            user_id,
            module_id,
            progress.status.as_str(),
            progress.completed_lessons,
            progress.total_lessons,
            progress.version
        );

        let newly_unlocked = if progress.is_completed() && !was_completed {
            self.newly_unlocked(&catalog, user_id, module_id).await
        } else {
            Vec::new()
        };

        Ok(ProgressOutcome {
            progress,
            newly_unlocked,
        })
    }

    async fn newly_unlocked(
        &self,
        catalog: &ModuleCatalog,
        user_id: &str,
        completed_module: &str,
    ) -> Vec<String> {
        let records = match self.user_progress(user_id).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Could not compute unlocked modules for {}: {}", user_id, e);
                return Vec::new();
            }
        };

        let unlocked: Vec<String> = catalog
            .dependents_of(completed_module)
            .into_iter()
            .filter(|module| catalog.is_unlocked(&module.id, &records, self.policy))
            .map(|module| module.id.clone())
            .collect();

        if !unlocked.is_empty() {
            tracing::info!(
                "User {} unlocked modules {:?} by completing {}",
                user_id,
                unlocked,
                completed_module
            );
        }
        unlocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LearningModule, ProgressStatus};
    use crate::stores::{MemoryModuleStore, MemoryProgressStore};
    use crate::utils::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    struct Fixture {
        service: ModuleService,
        modules: Arc<MemoryModuleStore>,
        progress: Arc<MemoryProgressStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let modules = Arc::new(MemoryModuleStore::new(sample_modules()));
        let progress = Arc::new(MemoryProgressStore::default());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 5, 10, 0, 0).unwrap(),
        ));
        let service = ModuleService::new(
            modules.clone(),
            progress.clone(),
            None,
            clock.clone(),
            ModuleSettings::default(),
        )
        .with_retry(RetryConfig::none());

        Fixture {
            service,
            modules,
            progress,
            clock,
        }
    }

    fn finish(lessons: u32) -> ProgressUpdate {
        ProgressUpdate {
            completed_lessons: Some(lessons),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn completing_a_module_unlocks_its_dependent() {
        let f = fixture();
        assert!(f.service.is_module_unlocked("u1", "module-1").await);
        assert!(!f.service.is_module_unlocked("u1", "module-2").await);

        let outcome = f
            .service
            .update_progress("u1", "module-1", finish(10))
            .await
            .unwrap();

        assert_eq!(outcome.progress.status, ProgressStatus::Completed);
        assert_eq!(outcome.newly_unlocked, vec!["module-2".to_string()]);
        assert!(f.service.is_module_unlocked("u1", "module-2").await);
        assert!(!f.service.is_module_unlocked("u1", "module-3").await);
    }

    #[tokio::test]
    async fn repeated_completion_reports_nothing_new() {
        let f = fixture();
        f.service
            .update_progress("u1", "module-1", finish(10))
            .await
            .unwrap();
        let again = f
            .service
            .update_progress("u1", "module-1", finish(10))
            .await
            .unwrap();
        assert!(again.newly_unlocked.is_empty());
        assert_eq!(again.progress.version, 2);
    }

    #[tokio::test]
    async fn progress_store_outage_locks_everything() {
        let f = fixture();
        f.progress.set_failing(true);

        assert!(!f.service.is_module_unlocked("u1", "module-1").await);
        let overview = f.service.modules_for_user("u1").await;
        assert_eq!(overview.len(), 4);
        assert!(overview.iter().all(|m| !m.unlocked));

        let lessons = f
            .service
            .lesson_states("u1", "module-1", None, false)
            .await
            .unwrap();
        assert!(lessons.iter().all(|l| l.state.is_locked()));
    }

    #[tokio::test]
    async fn unknown_module_is_locked_and_not_found() {
        let f = fixture();
        assert!(!f.service.is_module_unlocked("u1", "nope").await);
        assert!(matches!(
            f.service.update_progress("u1", "nope", finish(1)).await,
            Err(LearningError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.lesson_states("u1", "nope", None, false).await,
            Err(LearningError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_conflict() {
        let f = fixture();
        f.service
            .update_progress("u1", "module-1", finish(1))
            .await
            .unwrap();

        let stale = ProgressUpdate {
            completed_lessons: Some(2),
            expected_version: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            f.service.update_progress("u1", "module-1", stale).await,
            Err(LearningError::Conflict(_))
        ));

        let current = ProgressUpdate {
            completed_lessons: Some(2),
            expected_version: Some(1),
            ..Default::default()
        };
        let outcome = f
            .service
            .update_progress("u1", "module-1", current)
            .await
            .unwrap();
        assert_eq!(outcome.progress.version, 2);
    }

    #[tokio::test]
    async fn invalid_update_is_rejected() {
        let f = fixture();
        let result = f
            .service
            .update_progress("u1", "module-1", finish(100_000))
            .await;
        assert!(matches!(result, Err(LearningError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_module_store_serves_samples() {
        let empty = ModuleService::new(
            Arc::new(MemoryModuleStore::default()),
            Arc::new(MemoryProgressStore::default()),
            None,
            Arc::new(crate::utils::clock::SystemClock),
            ModuleSettings::default(),
        );
        assert_eq!(empty.load_catalog().await.source, CatalogSource::Samples);
        assert!(empty.is_module_unlocked("u1", "module-1").await);
    }

    fn stored_module(id: &str, title: &str, prerequisites: &[&str]) -> LearningModule {
        LearningModule {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category: String::new(),
            difficulty: String::new(),
            order: 0,
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            lessons: Vec::new(),
        }
    }

    #[tokio::test]
    async fn module_store_outage_without_cache_locks_and_rejects_writes() {
        let modules = Arc::new(MemoryModuleStore::new(vec![
            stored_module("basics", "Basics", &[]),
            stored_module("module-1", "Advanced", &["Basics"]),
        ]));
        let service = ModuleService::new(
            modules.clone(),
            Arc::new(MemoryProgressStore::default()),
            None,
            Arc::new(crate::utils::clock::SystemClock),
            ModuleSettings::default(),
        )
        .with_retry(RetryConfig::none());
        modules.set_failing(true);

        // Samples still back the display catalog
        assert_eq!(service.load_catalog().await.source, CatalogSource::Fallback);
        assert_eq!(service.catalog().await.len(), 4);

        assert!(!service.is_module_unlocked("u1", "module-1").await);
        assert!(!service.is_module_unlocked("u1", "basics").await);
        assert!(service
            .modules_for_user("u1")
            .await
            .iter()
            .all(|m| !m.unlocked));
        assert!(matches!(
            service.lesson_states("u1", "module-1", None, false).await,
            Err(LearningError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            service.update_progress("u1", "module-1", finish(1)).await,
            Err(LearningError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            service.get_progress("u1", "module-1").await,
            Err(LearningError::Store(_))
        ));
    }

    #[tokio::test]
    async fn expired_catalog_keeps_answering_during_outage() {
        let f = fixture();
        f.service
            .update_progress("u1", "module-1", finish(10))
            .await
            .unwrap();

        f.clock.advance(chrono::Duration::minutes(10));
        f.modules.set_failing(true);
        assert_eq!(f.service.load_catalog().await.source, CatalogSource::StaleCache);
        assert!(f.service.is_module_unlocked("u1", "module-2").await);

        f.service.invalidate_catalog().await;
        assert!(!f.service.is_module_unlocked("u1", "module-1").await);
    }

    #[tokio::test]
    async fn lesson_states_follow_progress() {
        let f = fixture();
        f.service
            .update_progress("u1", "module-1", finish(3))
            .await
            .unwrap();

        let lessons = f
            .service
            .lesson_states("u1", "module-1", Some(2), false)
            .await
            .unwrap();
        assert_eq!(lessons[2].state, crate::models::LessonState::Completed);
        assert_eq!(
            lessons[3].state,
            crate::models::LessonState::UnlockedRecommended
        );
        assert_eq!(lessons[4].state, crate::models::LessonState::LockedProgress);
    }

    #[tokio::test]
    async fn get_progress_is_none_before_first_write() {
        let f = fixture();
        assert!(f
            .service
            .get_progress("u1", "module-1")
            .await
            .unwrap()
            .is_none());
    }
}
