//! Score adjustment
//!
//! Normalizes a raw pronunciation score with timing and audio-quality
//! signals. The adjusted score is what every downstream calculation sees.

use crate::error::{EngineError, Result};
use crate::learning::types::AudioFeatures;

// ==================== Constants ====================

/// Attempt duration that incurs no timing penalty
pub const OPTIMAL_DURATION_MS: f64 = 2500.0;

/// Relative deviation from the optimal duration is capped here
const MAX_DURATION_DEVIATION: f64 = 0.2;

/// Weight of the timing penalty; caps the penalty at 2%
const DURATION_PENALTY_WEIGHT: f64 = 0.1;

const VOLUME_CONSISTENCY_THRESHOLD: f64 = 0.8;
const VOLUME_CONSISTENCY_BONUS: f64 = 1.05;
const PITCH_ACCURACY_THRESHOLD: f64 = 0.85;
const PITCH_ACCURACY_BONUS: f64 = 1.03;
const NOISE_THRESHOLD: f64 = 0.3;
const NOISE_PENALTY_WEIGHT: f64 = 0.1;

/// Adjusted score at or above which an attempt counts as correct
pub const CORRECT_THRESHOLD: f64 = 0.70;

/// Adjusted score at or above which an attempt extends the learner's streak
pub const STREAK_THRESHOLD: f64 = 0.75;

/// Rejects scores outside [0, 1], including NaN and infinities.
pub fn validate_score(score: f64) -> Result<f64> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(EngineError::ScoreOutOfRange(score))
    }
}

/// Non-finite feature values are treated as absent.
fn feature(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Applies the timing penalty and the optional audio-quality bonuses and
/// penalty, then clamps to [0, 1].
pub fn adjust_score(raw_score: f64, duration_ms: u64, audio: Option<&AudioFeatures>) -> f64 {
    let mut adjusted = raw_score;

    let deviation = ((duration_ms as f64 - OPTIMAL_DURATION_MS).abs() / OPTIMAL_DURATION_MS)
        .min(MAX_DURATION_DEVIATION);
    adjusted *= 1.0 - deviation * DURATION_PENALTY_WEIGHT;

    if let Some(features) = audio {
        if feature(features.volume_consistency) > VOLUME_CONSISTENCY_THRESHOLD {
            adjusted *= VOLUME_CONSISTENCY_BONUS;
        }
        if feature(features.pitch_accuracy) > PITCH_ACCURACY_THRESHOLD {
            adjusted *= PITCH_ACCURACY_BONUS;
        }
        let noise = feature(features.noise_level);
        if noise > NOISE_THRESHOLD {
            adjusted *= 1.0 - noise * NOISE_PENALTY_WEIGHT;
        }
    }

    adjusted.clamp(0.0, 1.0)
}

/// EMA weight for the newest score. Young statistics move fast, mature
/// ones settle.
pub fn smoothing_factor(total_attempts: u32) -> f64 {
    if total_attempts <= 3 {
        0.5
    } else if total_attempts <= 10 {
        0.3
    } else {
        0.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn optimal_duration_has_no_penalty() {
        assert!((adjust_score(0.95, 2500, None) - 0.95).abs() < EPS);
    }

    #[test]
    fn timing_penalty_is_capped_at_two_percent() {
        // 10% deviation -> 1% penalty
        assert!((adjust_score(1.0, 2750, None) - 0.99).abs() < EPS);
        // way off -> capped at 2%
        assert!((adjust_score(1.0, 60_000, None) - 0.98).abs() < EPS);
        assert!((adjust_score(1.0, 0, None) - 0.98).abs() < EPS);
    }

    #[test]
    fn audio_bonuses_and_clamp() {
        let features = AudioFeatures {
            volume_consistency: Some(0.9),
            pitch_accuracy: Some(0.9),
            noise_level: None,
        };
        let adjusted = adjust_score(0.8, 2500, Some(&features));
        assert!((adjusted - 0.8 * 1.05 * 1.03).abs() < EPS);

        assert_eq!(adjust_score(1.0, 2500, Some(&features)), 1.0);
    }

    #[test]
    fn noise_penalty_scales_with_level() {
        let noisy = AudioFeatures {
            noise_level: Some(0.5),
            ..Default::default()
        };
        assert!((adjust_score(0.8, 2500, Some(&noisy)) - 0.8 * 0.95).abs() < EPS);

        let quiet = AudioFeatures {
            noise_level: Some(0.3),
            ..Default::default()
        };
        assert!((adjust_score(0.8, 2500, Some(&quiet)) - 0.8).abs() < EPS);
    }

    #[test]
    fn non_finite_features_are_ignored() {
        let features = AudioFeatures {
            volume_consistency: Some(f64::NAN),
            pitch_accuracy: Some(f64::INFINITY),
            noise_level: Some(f64::NAN),
        };
        assert!((adjust_score(0.6, 2500, Some(&features)) - 0.6).abs() < EPS);
    }

    #[test]
    fn score_validation() {
        assert!(validate_score(0.0).is_ok());
        assert!(validate_score(1.0).is_ok());
        assert_eq!(validate_score(1.2), Err(EngineError::ScoreOutOfRange(1.2)));
        assert!(validate_score(-0.1).is_err());
        assert!(validate_score(f64::NAN).is_err());
    }

    #[test]
    fn smoothing_factor_steps_down() {
        assert_eq!(smoothing_factor(1), 0.5);
        assert_eq!(smoothing_factor(3), 0.5);
        assert_eq!(smoothing_factor(4), 0.3);
        assert_eq!(smoothing_factor(10), 0.3);
        assert_eq!(smoothing_factor(11), 0.1);
    }
}
