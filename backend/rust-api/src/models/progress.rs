use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// `Completed` iff every lesson is done.
    pub fn derive(completed_lessons: u32, total_lessons: u32) -> Self {
        if completed_lessons >= total_lessons {
            ProgressStatus::Completed
        } else if completed_lessons > 0 {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::NotStarted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not-started",
            ProgressStatus::InProgress => "in-progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

/// Per-user, per-module progress record (`learning_progress`, id `"{user}_{module}"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub user_id: String,
    pub module_id: String,
    pub status: ProgressStatus,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub total_tasks: u32,
    #[serde(default)]
    pub earned_points: u32,
    #[serde(default)]
    pub time_spent_minutes: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

pub fn progress_key(user_id: &str, module_id: &str) -> String {
    format!("{}_{}", user_id, module_id)
}

/// Partial update sent by the client when a lesson or task is completed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[validate(range(max = 1000))]
    pub completed_lessons: Option<u32>,
    #[validate(range(max = 10000))]
    pub completed_tasks: Option<u32>,
    #[validate(range(max = 1000000))]
    pub earned_points: Option<u32>,
    #[validate(range(max = 100000))]
    pub time_spent_minutes: Option<u32>,
    /// When set, the write is rejected unless the stored record has this version.
    pub expected_version: Option<u64>,
}

impl ModuleProgress {
    /// Record for a user who has not touched the module yet.
    pub fn not_started(
        user_id: &str,
        module_id: &str,
        total_lessons: u32,
        total_tasks: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: progress_key(user_id, module_id),
            user_id: user_id.to_string(),
            module_id: module_id.to_string(),
            status: ProgressStatus::derive(0, total_lessons),
            completed_lessons: 0,
            total_lessons,
            completed_tasks: 0,
            total_tasks,
            earned_points: 0,
            time_spent_minutes: 0,
            started_at: None,
            completed_at: None,
            last_accessed_at: now,
            version: 0,
        }
    }

    /// Merges `update` into `existing` (or a fresh record), refreshes totals
    /// from the catalog and re-derives the status.
    pub fn merged(
        existing: Option<ModuleProgress>,
        user_id: &str,
        module_id: &str,
        update: &ProgressUpdate,
        total_lessons: u32,
        total_tasks: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut progress = existing.unwrap_or_else(|| {
            Self::not_started(user_id, module_id, total_lessons, total_tasks, now)
        });

        if let Some(lessons) = update.completed_lessons {
            progress.completed_lessons = lessons;
        }
        if let Some(tasks) = update.completed_tasks {
            progress.completed_tasks = tasks;
        }
        if let Some(points) = update.earned_points {
            progress.earned_points = points;
        }
        if let Some(minutes) = update.time_spent_minutes {
            progress.time_spent_minutes = minutes;
        }

        progress.total_lessons = total_lessons;
        progress.total_tasks = total_tasks;
        progress.status = ProgressStatus::derive(progress.completed_lessons, total_lessons);
        progress.last_accessed_at = now;

        if progress.started_at.is_none() && progress.completed_lessons > 0 {
            progress.started_at = Some(now);
        }
        match progress.status {
            ProgressStatus::Completed if progress.completed_at.is_none() => {
                progress.completed_at = Some(now)
            }
            ProgressStatus::Completed => {}
            _ => progress.completed_at = None,
        }

        progress.version += 1;
        progress
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn status_is_derived_from_counts() {
        assert_eq!(ProgressStatus::derive(0, 10), ProgressStatus::NotStarted);
        assert_eq!(ProgressStatus::derive(3, 10), ProgressStatus::InProgress);
        assert_eq!(ProgressStatus::derive(10, 10), ProgressStatus::Completed);
        assert_eq!(ProgressStatus::derive(12, 10), ProgressStatus::Completed);
    }

    #[test]
    fn first_write_creates_record_and_stamps_start() {
        let update = ProgressUpdate {
            completed_lessons: Some(1),
            ..Default::default()
        };

        let progress = ModuleProgress::merged(None, "u1", "m1", &update, 4, 8, now());

        assert_eq!(progress.id, "u1_m1");
        assert_eq!(progress.status, ProgressStatus::InProgress);
        assert_eq!(progress.total_lessons, 4);
        assert_eq!(progress.total_tasks, 8);
        assert_eq!(progress.started_at, Some(now()));
        assert_eq!(progress.completed_at, None);
        assert_eq!(progress.version, 1);
    }

    #[test]
    fn totals_come_from_catalog_not_from_stored_record() {
        let mut stored = ModuleProgress::not_started("u1", "m1", 10, 0, now());
        stored.completed_lessons = 4;

        let progress =
            ModuleProgress::merged(Some(stored), "u1", "m1", &ProgressUpdate::default(), 4, 0, now());

        assert_eq!(progress.total_lessons, 4);
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert_eq!(progress.completed_at, Some(now()));
    }

    #[test]
    fn completed_at_is_kept_once_set_and_cleared_on_regression() {
        let update = ProgressUpdate {
            completed_lessons: Some(2),
            ..Default::default()
        };
        let done = ModuleProgress::merged(None, "u", "m", &update, 2, 0, now());
        let first_completion = done.completed_at;

        let later = now() + chrono::Duration::days(1);
        let again = ModuleProgress::merged(Some(done), "u", "m", &update, 2, 0, later);
        assert_eq!(again.completed_at, first_completion);
        assert_eq!(again.version, 2);

        let regress = ProgressUpdate {
            completed_lessons: Some(1),
            ..Default::default()
        };
        let regressed = ModuleProgress::merged(Some(again), "u", "m", &regress, 2, 0, later);
        assert_eq!(regressed.status, ProgressStatus::InProgress);
        assert_eq!(regressed.completed_at, None);
    }

    #[test]
    fn update_validation_rejects_absurd_values() {
        let update = ProgressUpdate {
            completed_lessons: Some(5_000),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(ProgressUpdate::default().validate().is_ok());
    }
}
