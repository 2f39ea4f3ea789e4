//! Spaced-repetition scheduling
//!
//! A fixed ladder of review offsets, indexed by how many correct attempts a
//! phoneme has accumulated. Poor attempts step back down the ladder so
//! repeated failures never push a review further out.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::learning::settings::AdminSettings;
use crate::learning::types::PhonemeStats;

const SHORT_LADDER: [f64; 8] = [1.0, 4.0, 8.0, 24.0, 72.0, 168.0, 336.0, 672.0];
const MEDIUM_LADDER: [f64; 8] = [2.0, 6.0, 12.0, 48.0, 120.0, 240.0, 480.0, 720.0];
const LONG_LADDER: [f64; 8] = [4.0, 12.0, 24.0, 96.0, 240.0, 480.0, 960.0, 1440.0];

/// Jitter bounds, spreading reviews of learners on the same schedule
pub const JITTER_MIN: f64 = 0.8;
pub const JITTER_MAX: f64 = 1.2;

/// Review offsets are clamped here; restored settings may carry any interval
const MAX_REVIEW_OFFSET_HOURS: f64 = 24.0 * 365.0 * 100.0;

const EXCELLENT_SCORE: f64 = 0.90;
const GOOD_SCORE: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewProfile {
    Short,
    #[default]
    Medium,
    Long,
}

impl ReviewProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }

    /// Review offsets in hours
    pub fn ladder(&self) -> &'static [f64] {
        match self {
            Self::Short => &SHORT_LADDER,
            Self::Medium => &MEDIUM_LADDER,
            Self::Long => &LONG_LADDER,
        }
    }
}

/// Ladder position for the attempt just recorded. `correct_attempts`
/// already includes that attempt.
pub fn ladder_index(correct_attempts: u32, adjusted_score: f64, ladder_len: usize) -> usize {
    let last = ladder_len.saturating_sub(1);
    let correct = correct_attempts as usize;

    let index = if adjusted_score >= EXCELLENT_SCORE {
        correct.min(last)
    } else if adjusted_score >= GOOD_SCORE {
        correct.saturating_sub(1)
    } else {
        correct.saturating_sub(2)
    };

    index.min(last)
}

/// Un-jittered review offset in hours, scaled by the admin interval.
pub fn base_interval_hours(
    profile: ReviewProfile,
    settings: &AdminSettings,
    correct_attempts: u32,
    adjusted_score: f64,
) -> f64 {
    let ladder = profile.ladder();
    let index = ladder_index(correct_attempts, adjusted_score, ladder.len());
    ladder[index] * settings.interval_multiplier()
}

pub fn jitter<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(JITTER_MIN..=JITTER_MAX)
}

/// Converts at millisecond precision, clamping into `[0, MAX_REVIEW_OFFSET_HOURS]`.
pub fn hours_to_duration(hours: f64) -> Duration {
    let hours = hours.max(0.0).min(MAX_REVIEW_OFFSET_HOURS);
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

/// Next review timestamp for `stats` after an attempt scored `adjusted_score`.
pub fn next_review<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    stats: &PhonemeStats,
    adjusted_score: f64,
    profile: ReviewProfile,
    settings: &AdminSettings,
    rng: &mut R,
) -> DateTime<Utc> {
    let hours = base_interval_hours(profile, settings, stats.correct_attempts, adjusted_score);
    now.checked_add_signed(hours_to_duration(hours * jitter(rng)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn excellent_scores_climb_the_ladder() {
        assert_eq!(ladder_index(1, 0.95, 8), 1);
        assert_eq!(ladder_index(3, 0.95, 8), 3);
        assert_eq!(ladder_index(20, 0.95, 8), 7);
    }

    #[test]
    fn weaker_scores_step_back() {
        assert_eq!(ladder_index(3, 0.80, 8), 2);
        assert_eq!(ladder_index(3, 0.50, 8), 1);
        assert_eq!(ladder_index(0, 0.80, 8), 0);
        assert_eq!(ladder_index(1, 0.40, 8), 0);
        assert_eq!(ladder_index(30, 0.80, 8), 7);
    }

    #[test]
    fn admin_interval_scales_ladder() {
        let mut settings = AdminSettings::default();
        assert_eq!(
            base_interval_hours(ReviewProfile::Medium, &settings, 3, 0.95),
            48.0
        );

        settings.spaced_repetition_interval = 12.0;
        assert_eq!(
            base_interval_hours(ReviewProfile::Medium, &settings, 3, 0.95),
            24.0
        );
        assert_eq!(
            base_interval_hours(ReviewProfile::Long, &settings, 3, 0.95),
            48.0
        );
    }

    #[test]
    fn jittered_review_stays_within_twenty_percent() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let settings = AdminSettings::default();
        let now = Utc::now();
        let mut stats = PhonemeStats::new("sh");
        stats.correct_attempts = 3;

        for _ in 0..200 {
            let at = next_review(now, &stats, 0.95, ReviewProfile::Medium, &settings, &mut rng);
            let hours = (at - now).num_milliseconds() as f64 / 3_600_000.0;
            assert!((48.0 * JITTER_MIN..=48.0 * JITTER_MAX).contains(&hours));
        }
    }

    #[test]
    fn huge_interval_is_capped_instead_of_overflowing() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let settings = AdminSettings {
            spaced_repetition_interval: 1e12,
            ..AdminSettings::default()
        };
        let now = Utc::now();
        let mut stats = PhonemeStats::new("ch");
        stats.correct_attempts = 8;

        let at = next_review(now, &stats, 0.95, ReviewProfile::Long, &settings, &mut rng);
        assert!(at > now);
        assert!(at - now <= hours_to_duration(MAX_REVIEW_OFFSET_HOURS));

        assert_eq!(hours_to_duration(-5.0), Duration::zero());
        assert_eq!(hours_to_duration(f64::NAN), Duration::zero());
    }

    #[test]
    fn profile_parse_defaults_to_medium() {
        assert_eq!(ReviewProfile::parse("LONG"), ReviewProfile::Long);
        assert_eq!(ReviewProfile::parse("weekly"), ReviewProfile::Medium);
        assert_eq!(ReviewProfile::Medium.ladder().len(), 8);
    }
}
