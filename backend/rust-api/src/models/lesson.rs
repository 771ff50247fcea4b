use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LessonState {
    /// Previous lesson not finished yet, or the module itself is locked.
    LockedProgress,
    /// Reachable, but the learner has no hearts left.
    LockedHearts,
    /// The next lesson to take.
    UnlockedRecommended,
    /// Visible but not startable in the current mode (guests).
    Unlocked,
    Completed,
}

impl LessonState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LessonState::LockedProgress | LessonState::LockedHearts)
    }

    pub fn is_accessible(&self) -> bool {
        matches!(
            self,
            LessonState::UnlockedRecommended | LessonState::Completed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub id: String,
    pub title: String,
    pub order: u32,
    pub estimated_minutes: u32,
    pub state: LessonState,
    pub accessible: bool,
}
