//! Admin and analytics reporting over engine snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::learning::recommend::PhonemeScore;
use crate::learning::settings::AdminSettings;
use crate::learning::store::LearnerState;
use crate::learning::types::{mean, LearnerProfile, PhonemeStats};

const WEAK_AREA_THRESHOLD: f64 = 0.75;
const MAX_WEAK_AREAS: usize = 5;
const MIN_WINDOW_FOR_TREND: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_students: usize,
    pub total_attempts: u64,
    /// Percentage over phoneme entries with a non-zero average
    pub avg_accuracy: f64,
    pub students_trend: String,
    pub accuracy_trend: String,
}

/// Effectiveness estimates, `None` when there is nothing to measure yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmMetrics {
    pub spaced_repetition: Option<f64>,
    pub adaptive_difficulty: Option<f64>,
    pub retention_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProgressRow {
    pub id: String,
    /// Most recently attempted phoneme
    pub phoneme: String,
    pub progress: u32,
    pub accuracy: u32,
    pub last_session: String,
    pub total_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_phonemes: usize,
    pub mastered_phonemes: usize,
    pub completion_percentage: f64,
    pub average_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeDetail {
    pub phoneme: String,
    pub attempts: u32,
    pub accuracy: f64,
    pub mastered: bool,
    pub difficulty_level: u8,
    pub last_attempted: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAnalytics {
    pub profile: LearnerProfile,
    pub progress: ProgressSummary,
    pub weak_areas: Vec<PhonemeScore>,
    pub phoneme_details: Vec<PhonemeDetail>,
}

/// Full engine state in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub learner_profiles: BTreeMap<String, LearnerProfile>,
    pub phoneme_stats: BTreeMap<String, BTreeMap<String, PhonemeStats>>,
    pub admin_settings: AdminSettings,
    pub export_timestamp: DateTime<Utc>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn all_phonemes(learners: &[LearnerState]) -> impl Iterator<Item = &PhonemeStats> {
    learners.iter().flat_map(|l| l.phonemes.values())
}

pub fn admin_stats(learners: &[LearnerState]) -> AdminStats {
    let total_students = learners.len();
    let total_attempts = all_phonemes(learners)
        .map(|s| s.total_attempts as u64)
        .sum();

    let scores: Vec<f64> = all_phonemes(learners)
        .map(|s| s.average_score)
        .filter(|&avg| avg > 0.0)
        .collect();
    let avg_accuracy = mean(&scores) * 100.0;

    if total_students == 0 {
        return AdminStats {
            total_students: 0,
            total_attempts: 0,
            avg_accuracy: 0.0,
            students_trend: "No data".to_string(),
            accuracy_trend: "No data".to_string(),
        };
    }

    AdminStats {
        total_students,
        total_attempts,
        avg_accuracy,
        students_trend: format!("+{total_students} active learners"),
        accuracy_trend: format!("Average {avg_accuracy:.1}% accuracy"),
    }
}

/// Whether the newer half of the trailing window beats the older half.
fn window_improved(stats: &PhonemeStats) -> Option<bool> {
    let scores = stats.recent_scores.to_vec();
    if scores.len() < MIN_WINDOW_FOR_TREND {
        return None;
    }
    let half = scores.len() / 2;
    let older = mean(&scores[..half]);
    let newer = mean(&scores[scores.len() - half..]);
    Some(newer > older)
}

pub fn algorithm_metrics(learners: &[LearnerState]) -> AlgorithmMetrics {
    let intervals: Vec<f64> = all_phonemes(learners)
        .filter_map(|s| match (s.last_attempted, s.next_review_date) {
            (Some(last), Some(next)) => Some((next - last).num_seconds() as f64 / 3600.0),
            _ => None,
        })
        .collect();
    let spaced_repetition = if intervals.is_empty() {
        None
    } else {
        Some(round1((50.0 + mean(&intervals) / 24.0 * 25.0).min(100.0)))
    };

    let trends: Vec<bool> = all_phonemes(learners).filter_map(window_improved).collect();
    let adaptive_difficulty = if trends.is_empty() {
        None
    } else {
        let improved = trends.iter().filter(|&&up| up).count();
        Some(round1(percent(improved, trends.len())))
    };

    let total = all_phonemes(learners).count();
    let mastered = all_phonemes(learners).filter(|s| s.mastered).count();
    let retention_rate = if total == 0 {
        None
    } else {
        Some(round1(percent(mastered, total)))
    };

    AlgorithmMetrics {
        spaced_repetition,
        adaptive_difficulty,
        retention_rate,
    }
}

/// One row per learner with at least one phoneme on record.
pub fn student_progress_table(learners: &[LearnerState]) -> Vec<StudentProgressRow> {
    learners
        .iter()
        .filter(|l| !l.phonemes.is_empty())
        .map(|learner| {
            let phonemes = &learner.phonemes;
            let total = phonemes.len();
            let mastered = phonemes.values().filter(|s| s.mastered).count();
            let avg: f64 = phonemes.values().map(|s| s.average_score).sum::<f64>() / total as f64;
            let current = phonemes
                .values()
                .max_by_key(|s| s.last_attempted)
                .map(|s| s.phoneme.clone())
                .unwrap_or_else(|| "None".to_string());

            StudentProgressRow {
                id: learner.profile.user_id.clone(),
                phoneme: current,
                progress: percent(mastered, total).round() as u32,
                accuracy: (avg * 100.0).round() as u32,
                last_session: learner.profile.last_active.format("%Y-%m-%d %H:%M").to_string(),
                total_attempts: phonemes.values().map(|s| s.total_attempts).sum(),
            }
        })
        .collect()
}

pub fn student_analytics(learner: &LearnerState) -> StudentAnalytics {
    let phonemes = &learner.phonemes;
    let total = phonemes.len();
    let mastered = phonemes.values().filter(|s| s.mastered).count();
    let averages: Vec<f64> = phonemes.values().map(|s| s.average_score).collect();

    let mut weak_areas: Vec<PhonemeScore> = phonemes
        .values()
        .filter(|s| s.average_score < WEAK_AREA_THRESHOLD && !s.mastered)
        .map(|s| PhonemeScore {
            phoneme: s.phoneme.clone(),
            score: s.average_score,
        })
        .collect();
    weak_areas.sort_by(|a, b| a.score.total_cmp(&b.score));
    weak_areas.truncate(MAX_WEAK_AREAS);

    let phoneme_details = phonemes
        .values()
        .map(|s| PhonemeDetail {
            phoneme: s.phoneme.clone(),
            attempts: s.total_attempts,
            accuracy: round1(s.average_score * 100.0),
            mastered: s.mastered,
            difficulty_level: s.difficulty_level,
            last_attempted: s.last_attempted,
        })
        .collect();

    StudentAnalytics {
        profile: learner.profile.clone(),
        progress: ProgressSummary {
            total_phonemes: total,
            mastered_phonemes: mastered,
            completion_percentage: round1(percent(mastered, total)),
            average_accuracy: round1(mean(&averages) * 100.0),
        },
        weak_areas,
        phoneme_details,
    }
}

pub fn export(
    learners: &[LearnerState],
    settings: &AdminSettings,
    now: DateTime<Utc>,
) -> ExportSnapshot {
    ExportSnapshot {
        learner_profiles: learners
            .iter()
            .map(|l| (l.profile.user_id.clone(), l.profile.clone()))
            .collect(),
        phoneme_stats: learners
            .iter()
            .map(|l| (l.profile.user_id.clone(), l.phonemes.clone()))
            .collect(),
        admin_settings: settings.clone(),
        export_timestamp: now,
    }
}
