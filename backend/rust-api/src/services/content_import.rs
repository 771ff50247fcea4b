use serde::Serialize;

use crate::data::{sample_modules, sample_tasks};
use crate::error::StoreError;
use crate::stores::{ModuleStore, TaskStore};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub tasks_inserted: usize,
    pub modules_inserted: usize,
}

/// Imports the built-in tasks and modules into collections that are still
/// empty. Collections that already hold data are left alone.
pub async fn seed_if_empty(
    tasks: &dyn TaskStore,
    modules: &dyn ModuleStore,
) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();

    let existing_tasks = tasks.count().await?;
    if existing_tasks == 0 {
        report.tasks_inserted = tasks.insert_many(&sample_tasks()).await?;
        tracing::info!("Seeded {} sample tasks", report.tasks_inserted);
    } else {
        tracing::info!("Task collection has {} documents, skipping", existing_tasks);
    }

    let existing_modules = modules.count().await?;
    if existing_modules == 0 {
        report.modules_inserted = modules.insert_many(&sample_modules()).await?;
        tracing::info!("Seeded {} sample modules", report.modules_inserted);
    } else {
        tracing::info!(
            "Module collection has {} documents, skipping",
            existing_modules
        );
    }

    Ok(report)
}
