//! Deterministic daily task selection.
//!
//! Given the same pool, seed and count the selection is identical on every
//! run. One video is guaranteed when the pool has any, rarely used and
//! high-priority tasks are preferred, and no difficulty tier may crowd out the
//! others while alternatives remain.

use std::collections::HashMap;

use crate::models::{Difficulty, LearningTask};
use crate::utils::rng::SeededRandom;

pub const DEFAULT_DAILY_COUNT: usize = 5;

/// Draw index reserved for choosing the guaranteed video.
const VIDEO_PICK_INDEX: u64 = 42;

const PRIORITY_FACTOR: f64 = 0.5;
const JITTER_FACTOR: f64 = 0.3;

/// Selection weight: rarely used tasks and high priorities score higher, with
/// a small seeded jitter to rotate near-ties between days.
pub fn task_weight(task: &LearningTask, jitter: f64) -> f64 {
    1.0 / (f64::from(task.usage_count) + 1.0)
        + f64::from(task.priority) * PRIORITY_FACTOR
        + jitter * JITTER_FACTOR
}

/// Most tasks of `difficulty` that may be chosen before backfilling.
pub fn difficulty_cap(difficulty: Difficulty, count: usize) -> usize {
    match difficulty {
        Difficulty::Easy => count.div_ceil(2),
        Difficulty::Medium | Difficulty::Hard => count.div_ceil(3),
    }
}

/// Picks up to `count` tasks from `pool` for the day identified by `seed`.
///
/// The result holds `min(count, pool.len())` distinct tasks. When the pool
/// contains a video, exactly one video is placed first; further videos may
/// still be chosen on weight.
pub fn select_daily_tasks(pool: &[LearningTask], seed: u64, count: usize) -> Vec<LearningTask> {
    if pool.is_empty() || count == 0 {
        return Vec::new();
    }

    let rng = SeededRandom::new(seed);
    let target = count.min(pool.len());

    let videos: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, task)| task.is_video())
        .map(|(index, _)| index)
        .collect();

    let guaranteed = if videos.is_empty() {
        None
    } else {
        Some(videos[rng.pick(VIDEO_PICK_INDEX, videos.len())])
    };

    let mut candidates: Vec<(usize, f64)> = pool
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != guaranteed)
        .enumerate()
        .map(|(position, (index, task))| (index, task_weight(task, rng.unit(position as u64))))
        .collect();

    // sort_by is stable, so equal weights keep pool order
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut chosen: Vec<usize> = Vec::with_capacity(target);
    let mut per_tier: HashMap<Difficulty, usize> = HashMap::new();

    if let Some(index) = guaranteed {
        chosen.push(index);
        *per_tier.entry(pool[index].difficulty).or_default() += 1;
    }

    for &(index, _) in &candidates {
        if chosen.len() >= target {
            break;
        }
        let difficulty = pool[index].difficulty;
        let taken = per_tier.entry(difficulty).or_default();
        if *taken < difficulty_cap(difficulty, count) {
            *taken += 1;
            chosen.push(index);
        }
    }

    // Backfill ignoring caps when the tiers could not fill the day.
    for &(index, _) in &candidates {
        if chosen.len() >= target {
            break;
        }
        if !chosen.contains(&index) {
            chosen.push(index);
        }
    }

    chosen.into_iter().map(|index| pool[index].clone()).collect()
}
