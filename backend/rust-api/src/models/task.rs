use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum TaskType {
    Quiz,
    Video,
    Flashcard,
    CaseStudy,
    Interpretation,
    FinalAssessment,
    Other,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Quiz => "quiz",
            TaskType::Video => "video",
            TaskType::Flashcard => "flashcard",
            TaskType::CaseStudy => "case-study",
            TaskType::Interpretation => "interpretation",
            TaskType::FinalAssessment => "final-assessment",
            TaskType::Other => "other",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            TaskType::Quiz | TaskType::Other => "Quiz",
            TaskType::Video => "Video",
            TaskType::Flashcard => "Flashcard",
            TaskType::CaseStudy => "Case-study",
            TaskType::Interpretation => "Interpretation",
            TaskType::FinalAssessment => "Final-assessment",
        }
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "quiz" => TaskType::Quiz,
            "video" => TaskType::Video,
            "flashcard" => TaskType::Flashcard,
            "case-study" => TaskType::CaseStudy,
            "interpretation" => TaskType::Interpretation,
            "final-assessment" => TaskType::FinalAssessment,
            _ => TaskType::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl From<String> for Difficulty {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Easy,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Active,
    Inactive,
}

/// One entry of the task pool as stored in the `ecg_tasks` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningTask {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub last_used_date: Option<NaiveDate>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub task_status: TaskStatus,
    #[serde(default = "default_xp")]
    pub xp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gems: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<u32>,
}

fn default_priority() -> i32 {
    1
}

fn default_xp() -> u32 {
    10
}

impl LearningTask {
    /// Bare task with the given classification; payload fields left empty.
    pub fn new(id: impl Into<String>, task_type: TaskType, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            task_type,
            difficulty,
            usage_count: 0,
            last_used_date: None,
            priority: default_priority(),
            task_status: TaskStatus::Active,
            xp: default_xp(),
            gems: None,
            question: None,
            explanation: None,
            options: Vec::new(),
            correct_answer: None,
            youtube_video_id: None,
            video_title: None,
            video_description: None,
            video_duration: None,
        }
    }

    pub fn is_video(&self) -> bool {
        self.task_type == TaskType::Video
    }

    /// Tasks without a question cannot be shown to a learner.
    pub fn is_servable(&self) -> bool {
        self.question.as_deref().is_some_and(|q| !q.trim().is_empty())
    }

    /// Records one serve on `date`. `last_used_date` never moves backwards.
    pub fn mark_used(&mut self, date: NaiveDate) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_used_date = Some(match self.last_used_date {
            Some(previous) if previous > date => previous,
            _ => date,
        });
    }
}

/// Answer key for a daily task: an option index for quizzes, free text otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CorrectAnswer {
    OptionIndex(usize),
    Text(String),
}

/// Task as handed to the client for today's list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub title: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: CorrectAnswer,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gems: Option<u32>,
    pub difficulty: Difficulty,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<u32>,
}

impl DailyTask {
    /// Client view of a pool entry. Tasks without a question are not servable.
    pub fn from_task(task: &LearningTask) -> Option<Self> {
        if !task.is_servable() {
            return None;
        }
        let question = task.question.clone().unwrap_or_default();

        let task_type = match task.task_type {
            TaskType::Other => TaskType::Quiz,
            other => other,
        };

        let title = match (task_type, &task.video_title) {
            (TaskType::Video, Some(title)) => title.clone(),
            _ => format!("{} Task", task_type.display_name()),
        };

        let raw_answer = task.correct_answer.clone().unwrap_or_default();
        let correct_answer = match task_type {
            TaskType::Video | TaskType::Flashcard => CorrectAnswer::Text(raw_answer),
            _ => CorrectAnswer::OptionIndex(option_index(&task.options, &raw_answer)),
        };

        Some(Self {
            id: task.id.clone(),
            task_type,
            title,
            question,
            options: if task.options.is_empty() {
                None
            } else {
                Some(task.options.clone())
            },
            correct_answer,
            points: task.xp,
            gems: task.gems,
            difficulty: task.difficulty,
            explanation: task.explanation.clone().unwrap_or_default(),
            youtube_video_id: task.youtube_video_id.clone(),
            video_title: task.video_title.clone(),
            video_description: task.video_description.clone(),
            video_duration: task.video_duration,
        })
    }
}

fn option_index(options: &[String], answer: &str) -> usize {
    if let Ok(index) = answer.trim().parse::<usize>() {
        return index;
    }
    options
        .iter()
        .position(|option| option == answer)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_and_difficulty_are_lenient() {
        let task: LearningTask = serde_json::from_value(json!({
            "_id": "t-1",
            "taskType": "mystery",
            "difficulty": "legendary"
        }))
        .unwrap();

        assert_eq!(task.task_type, TaskType::Other);
        assert_eq!(task.difficulty, Difficulty::Easy);
        assert_eq!(task.priority, 1);
        assert_eq!(task.usage_count, 0);
        assert_eq!(task.xp, 10);
    }

    #[test]
    fn store_document_round_trips_with_camel_case_fields() {
        let task: LearningTask = serde_json::from_value(json!({
            "_id": "v-1",
            "taskType": "video",
            "difficulty": "hard",
            "usageCount": 4,
            "lastUsedDate": "2025-02-10",
            "priority": 2,
            "youtubeVideoId": "abc123"
        }))
        .unwrap();

        assert!(task.is_video());
        assert_eq!(task.usage_count, 4);
        assert_eq!(task.last_used_date, NaiveDate::from_ymd_opt(2025, 2, 10));

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["_id"], "v-1");
        assert_eq!(value["taskType"], "video");
        assert_eq!(value["lastUsedDate"], "2025-02-10");
    }

    #[test]
    fn mark_used_keeps_last_used_date_monotonic() {
        let mut task = LearningTask::new("q", TaskType::Quiz, Difficulty::Easy);
        let later = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        task.mark_used(later);
        task.mark_used(earlier);

        assert_eq!(task.usage_count, 2);
        assert_eq!(task.last_used_date, Some(later));
    }

    #[test]
    fn quiz_answer_resolves_to_option_index() {
        let mut task = LearningTask::new("q", TaskType::Quiz, Difficulty::Medium);
        task.question = Some("Which lead views the inferior wall?".to_string());
        task.options = vec!["Lead I".into(), "Lead V1".into(), "Lead aVF".into()];
        task.correct_answer = Some("Lead aVF".to_string());

        let daily = DailyTask::from_task(&task).unwrap();
        assert_eq!(daily.correct_answer, CorrectAnswer::OptionIndex(2));
        assert_eq!(daily.title, "Quiz Task");
        assert_eq!(daily.points, 10);

        task.correct_answer = Some("1".to_string());
        let daily = DailyTask::from_task(&task).unwrap();
        assert_eq!(daily.correct_answer, CorrectAnswer::OptionIndex(1));
    }

    #[test]
    fn video_keeps_text_answer_and_title() {
        let mut task = LearningTask::new("v", TaskType::Video, Difficulty::Easy);
        task.question = Some("Normal rhythms".to_string());
        task.video_title = Some("ECG Basics".to_string());
        task.correct_answer = Some("video-watched".to_string());

        let daily = DailyTask::from_task(&task).unwrap();
        assert_eq!(daily.title, "ECG Basics");
        assert_eq!(
            daily.correct_answer,
            CorrectAnswer::Text("video-watched".to_string())
        );
    }

    #[test]
    fn other_type_is_served_as_quiz_and_questionless_tasks_are_dropped() {
        let mut task = LearningTask::new("o", TaskType::Other, Difficulty::Easy);
        assert!(DailyTask::from_task(&task).is_none());

        task.question = Some("?".to_string());
        let daily = DailyTask::from_task(&task).unwrap();
        assert_eq!(daily.task_type, TaskType::Quiz);
    }
}
