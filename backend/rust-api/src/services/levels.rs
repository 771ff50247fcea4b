//! Learner level from accumulated XP.
//!
//! Level `n` spans `100 * n` XP, so reaching level 2 takes 100 XP, level 3
//! another 200, and so on.

use serde::{Deserialize, Serialize};

pub const BASE_LEVEL_XP: u64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub level: u32,
    /// XP earned since the current level was reached.
    pub xp_into_level: u64,
    /// XP the current level spans.
    pub xp_to_next_level: u64,
}

/// Total XP needed to reach `level`: `100 * level * (level - 1) / 2`.
fn xp_to_reach(level: u128) -> u128 {
    u128::from(BASE_LEVEL_XP) * level * level.saturating_sub(1) / 2
}

/// Level derived from the points a learner earned across modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserLevel {
    pub user_id: String,
    pub xp: u64,
    #[serde(flatten)]
    pub level: Level,
}

pub fn level_for_xp(xp: u64) -> Level {
    let total = u128::from(xp);

    // Estimate from the quadratic, then settle on the exact integer level.
    let estimate = (1.0 + (1.0 + 8.0 * xp as f64 / BASE_LEVEL_XP as f64).sqrt()) / 2.0;
    let mut level = (estimate.floor() as u128).max(1);
    while level > 1 && xp_to_reach(level) > total {
        level -= 1;
    }
    while xp_to_reach(level + 1) <= total {
        level += 1;
    }

    let span = u128::from(BASE_LEVEL_XP) * level;
    Level {
        level: u32::try_from(level).unwrap_or(u32::MAX),
        xp_into_level: u64::try_from(total - xp_to_reach(level)).unwrap_or(u64::MAX),
        xp_to_next_level: u64::try_from(span).unwrap_or(u64::MAX),
    }
}
