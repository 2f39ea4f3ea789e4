//! Learner and phoneme state records.
//!
//! These are the values the engine owns and hands out as snapshots. All
//! timestamps are UTC.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Capacity of the trailing adjusted-score window kept per phoneme
pub const RECENT_WINDOW: usize = 5;

/// Difficulty floor
pub const MIN_DIFFICULTY: u8 = 1;

/// Difficulty ceiling
pub const MAX_DIFFICULTY: u8 = 5;

// ==================== Recent Scores ====================

/// Fixed-capacity window over the most recent adjusted scores, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct RecentScores {
    scores: VecDeque<f64>,
}

impl RecentScores {
    pub fn new() -> Self {
        Self {
            scores: VecDeque::with_capacity(RECENT_WINDOW),
        }
    }

    pub fn push(&mut self, score: f64) {
        self.scores.push_back(score);
        while self.scores.len() > RECENT_WINDOW {
            self.scores.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().copied()
    }

    /// The newest `n` scores (fewer if the window is shorter), oldest first.
    pub fn last(&self, n: usize) -> Vec<f64> {
        let skip = self.scores.len().saturating_sub(n);
        self.scores.iter().skip(skip).copied().collect()
    }

    /// `max - min` over the window; `None` when empty.
    pub fn spread(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        let (min, max) = self
            .scores
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        Some(max - min)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.scores.iter().copied().collect()
    }
}

impl From<Vec<f64>> for RecentScores {
    fn from(values: Vec<f64>) -> Self {
        let mut window = Self::new();
        for v in values {
            window.push(v);
        }
        window
    }
}

impl From<RecentScores> for Vec<f64> {
    fn from(window: RecentScores) -> Self {
        window.scores.into_iter().collect()
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

// ==================== Phoneme Stats ====================

/// Per-(learner, phoneme) performance statistics.
///
/// `success_rate == correct_attempts / total_attempts` whenever
/// `total_attempts > 0`, and `difficulty_level` stays in
/// `MIN_DIFFICULTY..=MAX_DIFFICULTY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeStats {
    pub phoneme: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    /// Exponentially smoothed adjusted score, starts at 0
    pub average_score: f64,
    pub success_rate: f64,
    pub last_attempted: Option<DateTime<Utc>>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub difficulty_level: u8,
    pub mastered: bool,
    #[serde(default)]
    pub recent_scores: RecentScores,
}

impl PhonemeStats {
    pub fn new(phoneme: &str) -> Self {
        Self {
            phoneme: phoneme.to_string(),
            total_attempts: 0,
            correct_attempts: 0,
            average_score: 0.0,
            success_rate: 0.0,
            last_attempted: None,
            next_review_date: None,
            difficulty_level: MIN_DIFFICULTY,
            mastered: false,
            recent_scores: RecentScores::new(),
        }
    }
}

// ==================== Learner Profile ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub user_id: String,
    pub username: String,
    pub total_attempts: u32,
    /// Always equals the number of this learner's mastered phonemes
    pub total_phonemes_mastered: u32,
    /// Attempt-weighted mean of per-phoneme averages
    pub average_score: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl LearnerProfile {
    pub fn new(user_id: &str, username: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: username.to_string(),
            total_attempts: 0,
            total_phonemes_mastered: 0,
            average_score: 0.0,
            current_streak: 0,
            longest_streak: 0,
            created_at: now,
            last_active: now,
        }
    }

    /// Fresh profile that keeps only identity and creation time.
    pub fn reset(&self, now: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            ..Self::new(&self.user_id, &self.username, now)
        }
    }
}

// ==================== Attempt Input ====================

/// Optional audio-quality signals from the scoring source, each in [0, 1].
/// Missing values count as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_consistency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_level: Option<f64>,
}

/// A scored practice attempt as submitted by the web layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub learner_id: String,
    pub phoneme: String,
    /// Raw score in [0, 1]
    pub score: f64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
}

impl Attempt {
    pub fn new(learner_id: &str, phoneme: &str, score: f64, duration_ms: u64) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            phoneme: phoneme.to_string(),
            score,
            duration_ms,
            feedback: String::new(),
            audio_features: None,
        }
    }
}
