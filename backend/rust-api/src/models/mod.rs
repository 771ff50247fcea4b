use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod lesson;
pub mod module;
pub mod progress;
pub mod task;

pub use lesson::{LessonState, LessonView};
pub use module::{LearningModule, LessonRef, ModuleOverview};
pub use progress::{ModuleProgress, ProgressStatus, ProgressUpdate};
pub use task::{CorrectAnswer, DailyTask, Difficulty, LearningTask, TaskStatus, TaskType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTasksResponse {
    pub date: NaiveDate,
    pub seed: u64,
    pub tasks: Vec<DailyTask>,
    pub video_count: usize,
    pub other_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOutcome {
    pub progress: ModuleProgress,
    /// Modules that became reachable because this write completed the module.
    pub newly_unlocked: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockStatus {
    pub module_id: String,
    pub unlocked: bool,
}

/// Task pool counts by type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolBreakdown {
    pub total: usize,
    pub video: usize,
    pub quiz: usize,
    pub other: usize,
}

impl PoolBreakdown {
    pub fn of(tasks: &[LearningTask]) -> Self {
        let video = tasks.iter().filter(|t| t.task_type == TaskType::Video).count();
        let quiz = tasks.iter().filter(|t| t.task_type == TaskType::Quiz).count();
        Self {
            total: tasks.len(),
            video,
            quiz,
            other: tasks.len() - video - quiz,
        }
    }
}
