use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonRef {
    pub id: String,
    pub title: String,
    /// 1-based position inside the module.
    pub order: u32,
    #[serde(default)]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub task_count: u32,
}

/// Module descriptor as stored in `learning_modules`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningModule {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub order: u32,
    /// Titles of the modules that must be completed first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub lessons: Vec<LessonRef>,
}

impl LearningModule {
    pub fn total_lessons(&self) -> u32 {
        self.lessons.len() as u32
    }

    pub fn total_tasks(&self) -> u32 {
        self.lessons.iter().map(|lesson| lesson.task_count).sum()
    }
}

/// Module summary returned to clients together with its unlock flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOverview {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub order: u32,
    pub prerequisites: Vec<String>,
    pub total_lessons: u32,
    pub unlocked: bool,
    pub progress: Option<super::progress::ModuleProgress>,
}

impl ModuleOverview {
    pub fn new(
        module: &LearningModule,
        unlocked: bool,
        progress: Option<super::progress::ModuleProgress>,
    ) -> Self {
        Self {
            id: module.id.clone(),
            title: module.title.clone(),
            description: module.description.clone(),
            category: module.category.clone(),
            difficulty: module.difficulty.clone(),
            order: module.order,
            prerequisites: module.prerequisites.clone(),
            total_lessons: module.total_lessons(),
            unlocked,
            progress,
        }
    }
}
