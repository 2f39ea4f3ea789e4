//! Adaptive difficulty
//!
//! Each attempt contributes signed factors (performance, speed,
//! consistency); their mean moves the phoneme's difficulty one step at most.

use crate::learning::settings::AdminSettings;
use crate::learning::types::{PhonemeStats, MAX_DIFFICULTY, MIN_DIFFICULTY};

const FAST_RESPONSE_MS: u64 = 2000;
const SLOW_RESPONSE_MS: u64 = 4000;
const MIN_WINDOW_FOR_CONSISTENCY: usize = 3;
const CONSISTENCY_THRESHOLD: f64 = 0.8;
const STEP_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyChange {
    Raised,
    Lowered,
    Unchanged,
}

/// Signed adaptation factors for one attempt. The consistency factor reads
/// the trailing window as it stood before this attempt.
pub fn adaptation_factors(stats: &PhonemeStats, adjusted_score: f64, duration_ms: u64) -> Vec<f64> {
    let mut factors = Vec::with_capacity(3);

    factors.push(if adjusted_score >= 0.90 {
        1.0
    } else if adjusted_score >= 0.75 {
        0.0
    } else {
        -1.0
    });

    if adjusted_score >= 0.80 && duration_ms < FAST_RESPONSE_MS {
        factors.push(0.5);
    } else if adjusted_score < 0.70 && duration_ms > SLOW_RESPONSE_MS {
        factors.push(-0.5);
    }

    if stats.recent_scores.len() >= MIN_WINDOW_FOR_CONSISTENCY {
        let consistency = 1.0 - stats.recent_scores.spread().unwrap_or(0.0);
        if consistency > CONSISTENCY_THRESHOLD {
            factors.push(0.5);
        }
    }

    factors
}

/// Moves `difficulty_level` by at most one step when the difficulty mode is
/// adaptive, then appends the score to the trailing window either way.
pub fn adjust_difficulty(
    stats: &mut PhonemeStats,
    adjusted_score: f64,
    duration_ms: u64,
    settings: &AdminSettings,
) -> DifficultyChange {
    let mut change = DifficultyChange::Unchanged;

    if settings.is_adaptive() {
        let factors = adaptation_factors(stats, adjusted_score, duration_ms);
        let adjustment = factors.iter().sum::<f64>() / factors.len() as f64;

        if adjustment > STEP_THRESHOLD && stats.difficulty_level < MAX_DIFFICULTY {
            stats.difficulty_level += 1;
            change = DifficultyChange::Raised;
        } else if adjustment < -STEP_THRESHOLD && stats.difficulty_level > MIN_DIFFICULTY {
            stats.difficulty_level -= 1;
            change = DifficultyChange::Lowered;
        }
    }

    stats.recent_scores.push(adjusted_score);
    change
}
