//! Lesson selection and learner-facing recommendations.
//!
//! All functions here are pure reads over one learner's snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::learning::types::{LearnerProfile, PhonemeStats};

/// Size of the full phoneme inventory milestones are measured against
pub const TARGET_PHONEME_COUNT: u32 = 24;

const FOCUS_THRESHOLD: f64 = 0.70;
const STRONG_THRESHOLD: f64 = 0.80;
const MAX_FOCUS_AREAS: usize = 5;
const MAX_DAILY_PRACTICE: usize = 10;
/// ~5 attempts per phoneme at ~2 attempts a day
const ATTEMPTS_TO_MASTER: f64 = 5.0;
const DAYS_PER_ATTEMPT: f64 = 2.5;
const NOT_DUE_PRIORITY: f64 = 0.5;

const MILESTONES: [(u32, &str); 6] = [
    (0, "Just started! Keep going!"),
    (5, "5 Phonemes Mastered! 🎉"),
    (10, "10 Phonemes Mastered! Halfway there! 🌟"),
    (15, "15 Phonemes Mastered! Almost done! ✨"),
    (20, "20 Phonemes Mastered! Nearly complete! 🚀"),
    (TARGET_PHONEME_COUNT, "All Phonemes Mastered! Expert level! 🏆"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonPick {
    pub phoneme: String,
    pub difficulty: u8,
    /// [0.5, 1.0) for due reviews, 0.5 otherwise
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeScore {
    pub phoneme: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub focus_areas: Vec<PhonemeScore>,
    pub strong_areas: Vec<PhonemeScore>,
    pub suggested_daily_practice: usize,
    pub estimated_days_to_mastery: u32,
    pub next_milestone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub profile: LearnerProfile,
    pub mastered_phonemes: Vec<String>,
    pub in_progress_phonemes: Vec<String>,
    pub mastery_percentage: f64,
    pub recommendations: Option<Recommendations>,
    pub next_milestone: String,
}

/// Priority of a review that is `days_overdue` whole days late.
pub fn review_priority(days_overdue: i64) -> f64 {
    1.0 - 1.0 / (days_overdue.max(0) as f64 + 2.0)
}

/// Review-due-first selection. The most overdue non-mastered phoneme wins;
/// without due reviews the easiest not-yet-due phoneme is offered. Ties keep
/// map order.
pub fn next_lesson(phonemes: &BTreeMap<String, PhonemeStats>, now: DateTime<Utc>) -> Option<LessonPick> {
    let mut best_due: Option<LessonPick> = None;
    let mut easiest_pending: Option<&PhonemeStats> = None;

    for stats in phonemes.values().filter(|s| !s.mastered) {
        match stats.next_review_date {
            Some(at) if at <= now => {
                let priority = review_priority((now - at).num_days());
                if best_due.as_ref().map_or(true, |b| priority > b.priority) {
                    best_due = Some(LessonPick {
                        phoneme: stats.phoneme.clone(),
                        difficulty: stats.difficulty_level,
                        priority,
                    });
                }
            }
            _ => {
                if easiest_pending.map_or(true, |e| stats.difficulty_level < e.difficulty_level) {
                    easiest_pending = Some(stats);
                }
            }
        }
    }

    best_due.or_else(|| {
        easiest_pending.map(|stats| LessonPick {
            phoneme: stats.phoneme.clone(),
            difficulty: stats.difficulty_level,
            priority: NOT_DUE_PRIORITY,
        })
    })
}

/// Rough days until every non-mastered phoneme is mastered. Phonemes past
/// five attempts contribute negatively; only the total is floored.
pub fn estimate_days_to_mastery(phonemes: &BTreeMap<String, PhonemeStats>) -> u32 {
    let mut any_open = false;
    let mut remaining = 0.0;
    for stats in phonemes.values().filter(|s| !s.mastered) {
        any_open = true;
        remaining += ATTEMPTS_TO_MASTER - stats.total_attempts as f64;
    }

    if !any_open {
        return 0;
    }
    (remaining * DAYS_PER_ATTEMPT).round().max(1.0) as u32
}

pub fn milestone(mastered: u32) -> &'static str {
    MILESTONES
        .iter()
        .rev()
        .find(|(threshold, _)| mastered >= *threshold)
        .map(|(_, text)| *text)
        .unwrap_or("Keep practicing!")
}

pub fn recommendations(
    profile: &LearnerProfile,
    phonemes: &BTreeMap<String, PhonemeStats>,
) -> Recommendations {
    let mut focus_areas: Vec<PhonemeScore> = phonemes
        .values()
        .filter(|s| s.average_score < FOCUS_THRESHOLD && !s.mastered)
        .map(|s| PhonemeScore {
            phoneme: s.phoneme.clone(),
            score: s.average_score,
        })
        .collect();
    focus_areas.sort_by(|a, b| a.score.total_cmp(&b.score));
    focus_areas.truncate(MAX_FOCUS_AREAS);

    let strong_areas = phonemes
        .values()
        .filter(|s| s.average_score >= STRONG_THRESHOLD)
        .map(|s| PhonemeScore {
            phoneme: s.phoneme.clone(),
            score: s.average_score,
        })
        .collect();

    let open = phonemes.values().filter(|s| !s.mastered).count();

    Recommendations {
        focus_areas,
        strong_areas,
        suggested_daily_practice: open.min(MAX_DAILY_PRACTICE),
        estimated_days_to_mastery: estimate_days_to_mastery(phonemes),
        next_milestone: milestone(profile.total_phonemes_mastered).to_string(),
    }
}

/// Starting difficulty for content the learner has not seen yet.
pub fn recommended_difficulty(phonemes: &BTreeMap<String, PhonemeStats>) -> u8 {
    if phonemes.is_empty() {
        return 1;
    }
    let avg = phonemes.values().map(|s| s.average_score).sum::<f64>() / phonemes.len() as f64;

    if avg >= 0.90 {
        5
    } else if avg >= 0.80 {
        4
    } else if avg >= 0.70 {
        3
    } else if avg >= 0.60 {
        2
    } else {
        1
    }
}

pub fn dashboard(profile: &LearnerProfile, phonemes: &BTreeMap<String, PhonemeStats>) -> Dashboard {
    let (mastered, in_progress): (Vec<&PhonemeStats>, Vec<&PhonemeStats>) =
        phonemes.values().partition(|s| s.mastered);

    let total = (mastered.len() + in_progress.len()).max(1);
    let mastery_percentage = (mastered.len() as f64 / total as f64 * 1000.0).round() / 10.0;

    let recommendations = if phonemes.is_empty() {
        None
    } else {
        Some(recommendations(profile, phonemes))
    };

    Dashboard {
        profile: profile.clone(),
        mastered_phonemes: mastered.iter().map(|s| s.phoneme.clone()).collect(),
        in_progress_phonemes: in_progress.iter().map(|s| s.phoneme.clone()).collect(),
        mastery_percentage,
        recommendations,
        next_milestone: milestone(profile.total_phonemes_mastered).to_string(),
    }
}
