//! Learning patterns for personalization and reporting.
//!
//! Nothing here feeds back into scheduling; it only describes when and how
//! a learner tends to do well.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::learning::types::mean;

/// Scores kept per hour or period bucket
pub const PATTERN_BUCKET_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

impl LearningStyle {
    pub const ALL: [LearningStyle; 4] = [
        LearningStyle::Visual,
        LearningStyle::Auditory,
        LearningStyle::Kinesthetic,
        LearningStyle::Reading,
    ];

    /// Accurate answers split on speed first (fast: kinesthetic, slow:
    /// reading), then on score alone.
    pub fn infer(adjusted_score: f64, duration_ms: u64) -> Self {
        if duration_ms < 2000 && adjusted_score > 0.8 {
            Self::Kinesthetic
        } else if duration_ms > 4000 && adjusted_score > 0.8 {
            Self::Reading
        } else if adjusted_score > 0.85 {
            Self::Auditory
        } else {
            Self::Visual
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPatterns {
    pub hourly: BTreeMap<u32, VecDeque<f64>>,
    pub periods: BTreeMap<DayPeriod, VecDeque<f64>>,
    /// Most recent adjusted score per phoneme
    pub phoneme_scores: BTreeMap<String, f64>,
    pub style_scores: BTreeMap<LearningStyle, u32>,
}

impl Default for LearningPatterns {
    fn default() -> Self {
        Self {
            hourly: BTreeMap::new(),
            periods: BTreeMap::new(),
            phoneme_scores: BTreeMap::new(),
            style_scores: LearningStyle::ALL.iter().map(|s| (*s, 0)).collect(),
        }
    }
}

fn push_bounded(bucket: &mut VecDeque<f64>, score: f64) {
    bucket.push_back(score);
    while bucket.len() > PATTERN_BUCKET_CAPACITY {
        bucket.pop_front();
    }
}

impl LearningPatterns {
    pub fn record(&mut self, phoneme: &str, adjusted_score: f64, duration_ms: u64, at: DateTime<Utc>) {
        let hour = at.hour();
        push_bounded(self.hourly.entry(hour).or_default(), adjusted_score);
        push_bounded(
            self.periods.entry(DayPeriod::from_hour(hour)).or_default(),
            adjusted_score,
        );
        self.phoneme_scores
            .insert(phoneme.to_string(), adjusted_score);
        *self
            .style_scores
            .entry(LearningStyle::infer(adjusted_score, duration_ms))
            .or_insert(0) += 1;
    }

    /// Style with the highest tally; `None` before any attempt.
    pub fn dominant_style(&self) -> Option<LearningStyle> {
        let mut best: Option<(LearningStyle, u32)> = None;
        for (&style, &count) in &self.style_scores {
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((style, count));
            }
        }
        best.map(|(style, _)| style)
    }

    /// Period with the best mean score, with that mean.
    pub fn best_period(&self) -> Option<(DayPeriod, f64)> {
        let mut best: Option<(DayPeriod, f64)> = None;
        for (&period, scores) in &self.periods {
            if scores.is_empty() {
                continue;
            }
            let scores: Vec<f64> = scores.iter().copied().collect();
            let avg = mean(&scores);
            if best.map_or(true, |(_, b)| avg > b) {
                best = Some((period, avg));
            }
        }
        best
    }
}
