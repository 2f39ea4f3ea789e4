//! Mastery assessment
//!
//! A phoneme is mastered when at least 80% of the applicable criteria hold.
//! Criteria that need trailing history only count once that history exists,
//! so the bar is computed as `satisfied / applicable`, never against a fixed
//! denominator.

use serde::Serialize;

use crate::learning::types::{mean, variance, PhonemeStats};

pub const MIN_ATTEMPTS_FOR_MASTERY: u32 = 5;
const SUCCESS_RATE_TARGET: f64 = 0.90;
const RECENT_AVERAGE_TARGET: f64 = 0.85;
const RECENT_VARIANCE_LIMIT: f64 = 0.05;
const SUSTAINED_ATTEMPTS: u32 = 8;
const REQUIRED_RATIO: f64 = 0.8;
const RECENT_SPAN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryCriterion {
    SuccessRate,
    RecentAverage,
    RecentConsistency,
    SustainedPractice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CriterionOutcome {
    pub criterion: MasteryCriterion,
    pub applicable: bool,
    pub satisfied: bool,
}

/// Evaluates every criterion against `stats`, marking the ones that cannot
/// be judged yet as not applicable.
pub fn evaluate_criteria(stats: &PhonemeStats) -> Vec<CriterionOutcome> {
    let recent = stats.recent_scores.last(RECENT_SPAN);

    vec![
        CriterionOutcome {
            criterion: MasteryCriterion::SuccessRate,
            applicable: true,
            satisfied: stats.success_rate >= SUCCESS_RATE_TARGET,
        },
        CriterionOutcome {
            criterion: MasteryCriterion::RecentAverage,
            applicable: !recent.is_empty(),
            satisfied: !recent.is_empty() && mean(&recent) >= RECENT_AVERAGE_TARGET,
        },
        CriterionOutcome {
            criterion: MasteryCriterion::RecentConsistency,
            applicable: recent.len() >= RECENT_SPAN,
            satisfied: recent.len() >= RECENT_SPAN && variance(&recent) <= RECENT_VARIANCE_LIMIT,
        },
        CriterionOutcome {
            criterion: MasteryCriterion::SustainedPractice,
            applicable: true,
            satisfied: stats.total_attempts >= SUSTAINED_ATTEMPTS,
        },
    ]
}

pub fn assess_mastery(stats: &PhonemeStats) -> bool {
    if stats.total_attempts < MIN_ATTEMPTS_FOR_MASTERY {
        return false;
    }

    let outcomes = evaluate_criteria(stats);
    let applicable = outcomes.iter().filter(|o| o.applicable).count();
    let satisfied = outcomes
        .iter()
        .filter(|o| o.applicable && o.satisfied)
        .count();

    applicable > 0 && satisfied as f64 >= applicable as f64 * REQUIRED_RATIO
}
