use crate::models::{LearningModule, LessonState, LessonView};

pub const MAX_HEARTS: u32 = 5;

/// Learner facts the lesson state depends on.
#[derive(Debug, Clone, Copy)]
pub struct LessonContext {
    pub completed_lessons: u32,
    /// `None` means the client did not report hearts; treated as full.
    pub hearts: Option<u32>,
    pub guest: bool,
    pub module_unlocked: bool,
}

/// Lessons open strictly in sequence.
pub fn is_progression_unlocked(order: u32, completed_lessons: u32) -> bool {
    order <= 1 || completed_lessons >= order - 1
}

pub fn lesson_state(order: u32, ctx: &LessonContext) -> LessonState {
    if !ctx.module_unlocked || !is_progression_unlocked(order, ctx.completed_lessons) {
        return LessonState::LockedProgress;
    }
    if ctx.completed_lessons >= order {
        return LessonState::Completed;
    }

    let hearts = ctx.hearts.unwrap_or(MAX_HEARTS);
    if !ctx.guest && hearts == 0 {
        LessonState::LockedHearts
    } else if ctx.guest {
        LessonState::Unlocked
    } else {
        LessonState::UnlockedRecommended
    }
}

pub fn lesson_views(module: &LearningModule, ctx: &LessonContext) -> Vec<LessonView> {
    let mut lessons: Vec<_> = module.lessons.iter().collect();
    lessons.sort_by_key(|lesson| lesson.order);

    lessons
        .into_iter()
        .map(|lesson| {
            let state = lesson_state(lesson.order, ctx);
            LessonView {
                id: lesson.id.clone(),
                title: lesson.title.clone(),
                order: lesson.order,
                estimated_minutes: lesson.estimated_minutes,
                state,
                accessible: state.is_accessible(),
            }
        })
        .collect()
}
