//! Day-by-day unlocks for weekly events.
//!
//! Day 1 of an event is always open. Day N opens once day N-1 of the same
//! event is among the learner's completed days, and every task follows the
//! day it belongs to. A day completes when all of its tasks are done.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Events run for at most a month of days.
pub const MAX_EVENT_DAYS: u64 = 30;

/// Canonical day id, `"{event}-day-{n}"`.
pub fn day_id(event_id: &str, day_number: u32) -> String {
    format!("{}-day-{}", event_id, day_number)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDay {
    pub id: String,
    /// 1-based position inside the event.
    pub day_number: u32,
    #[serde(default)]
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyEvent {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(max = MAX_EVENT_DAYS))]
    pub days: Vec<EventDay>,
}

/// A learner's completed days and tasks for one event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventProgress {
    #[serde(default)]
    pub completed_days: Vec<String>,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
}

impl EventProgress {
    pub fn has_completed_day(&self, day_id: &str) -> bool {
        self.completed_days.iter().any(|d| d == day_id)
    }

    pub fn has_completed_task(&self, task_id: &str) -> bool {
        self.completed_tasks.iter().any(|t| t == task_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayState {
    pub day_id: String,
    pub day_number: u32,
    pub unlocked: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TaskCompletion {
    /// The task is unknown or its day is still locked; nothing changed.
    Locked,
    AlreadyCompleted,
    Recorded { day_completed: bool },
}

/// Whether `day_number` of `event_id` is open. Learners without any progress
/// for the event only see day 1.
pub fn is_day_unlocked(event_id: &str, day_number: u32, progress: Option<&EventProgress>) -> bool {
    match day_number {
        0 => false,
        1 => true,
        n => progress.is_some_and(|p| p.has_completed_day(&day_id(event_id, n - 1))),
    }
}

impl WeeklyEvent {
    pub fn day(&self, day_id: &str) -> Option<&EventDay> {
        self.days.iter().find(|day| day.id == day_id)
    }

    /// Tasks are open exactly when their day is. Unknown days, and tasks
    /// that do not belong to the named day, are locked.
    pub fn is_task_unlocked(
        &self,
        day_id: &str,
        task_id: &str,
        progress: Option<&EventProgress>,
    ) -> bool {
        match self.day(day_id) {
            Some(day) if day.task_ids.iter().any(|t| t == task_id) => {
                is_day_unlocked(&self.id, day.day_number, progress)
            }
            _ => false,
        }
    }

    pub fn day_states(&self, progress: Option<&EventProgress>) -> Vec<DayState> {
        let mut days: Vec<&EventDay> = self.days.iter().collect();
        days.sort_by_key(|day| day.day_number);

        days.into_iter()
            .map(|day| DayState {
                day_id: day.id.clone(),
                day_number: day.day_number,
                unlocked: is_day_unlocked(&self.id, day.day_number, progress),
                completed: progress.is_some_and(|p| p.has_completed_day(&day.id)),
            })
            .collect()
    }

    /// Records `task_id` as done and marks its day completed once every task
    /// of the day is done. Locked tasks are refused.
    pub fn complete_task(
        &self,
        progress: &mut EventProgress,
        day_id: &str,
        task_id: &str,
    ) -> TaskCompletion {
        let Some(day) = self.day(day_id) else {
            return TaskCompletion::Locked;
        };
        if !self.is_task_unlocked(day_id, task_id, Some(&*progress)) {
            return TaskCompletion::Locked;
        }
        if progress.has_completed_task(task_id) {
            return TaskCompletion::AlreadyCompleted;
        }
        progress.completed_tasks.push(task_id.to_string());

        let day_done = day.task_ids.iter().all(|t| progress.has_completed_task(t));
        let day_completed = day_done && !progress.has_completed_day(day_id);
        if day_completed {
            progress.completed_days.push(day_id.to_string());
            tracing::debug!("Event {} day {} completed", self.id, day.day_number);
        }

        TaskCompletion::Recorded { day_completed }
    }
}
