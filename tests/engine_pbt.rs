//! Property-Based Tests for the learning engine
//!
//! Tests the following invariants over arbitrary attempt sequences:
//! - success_rate == correct_attempts / total_attempts
//! - difficulty_level stays within 1..=5
//! - nothing is mastered below five attempts
//! - the profile's mastered count matches the phoneme stats
//! - averages stay within [0, 1] and the trailing window never exceeds 5
//! - reviews land within ±20% of the ladder offset

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use phonics_engine::learning::scheduler;
use phonics_engine::{
    AdminSettings, Attempt, AudioFeatures, Clock, EngineOptions, LearningEngine, ManualClock,
    ReviewProfile,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

const PHONEMES: [&str; 4] = ["th", "sh", "ch", "ng"];

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_audio() -> impl Strategy<Value = Option<AudioFeatures>> {
    proptest::option::of(
        (
            proptest::option::of(arb_f64_0_1()),
            proptest::option::of(arb_f64_0_1()),
            proptest::option::of(arb_f64_0_1()),
        )
            .prop_map(|(volume_consistency, pitch_accuracy, noise_level)| AudioFeatures {
                volume_consistency,
                pitch_accuracy,
                noise_level,
            }),
    )
}

fn arb_attempt() -> impl Strategy<Value = (Attempt, i64)> {
    (
        0usize..PHONEMES.len(),
        arb_f64_0_1(),
        0u64..=8000u64,
        arb_audio(),
        0i64..=72i64, // hours until the next attempt
    )
        .prop_map(|(phoneme, score, duration_ms, audio, gap)| {
            let mut attempt = Attempt::new("learner", PHONEMES[phoneme], score, duration_ms);
            attempt.audio_features = audio;
            (attempt, gap)
        })
}

fn arb_profile() -> impl Strategy<Value = ReviewProfile> {
    prop_oneof![
        Just(ReviewProfile::Short),
        Just(ReviewProfile::Medium),
        Just(ReviewProfile::Long),
    ]
}

fn engine(seed: u64, profile: ReviewProfile) -> (LearningEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 2, 3, 7, 30, 0).unwrap(),
    ));
    let options = EngineOptions {
        review_profile: profile,
        rng_seed: Some(seed),
        ..Default::default()
    };
    (LearningEngine::with_clock(options, clock.clone()), clock)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stats_invariants_hold_after_every_attempt(
        seed in any::<u64>(),
        profile in arb_profile(),
        attempts in prop::collection::vec(arb_attempt(), 1..60),
    ) {
        let (engine, clock) = engine(seed, profile);

        for (attempt, gap) in &attempts {
            let stats = engine.record(attempt).unwrap();

            prop_assert!(stats.correct_attempts <= stats.total_attempts);
            let expected_rate = stats.correct_attempts as f64 / stats.total_attempts as f64;
            prop_assert!((stats.success_rate - expected_rate).abs() < 1e-12);

            prop_assert!((1..=5).contains(&stats.difficulty_level));
            prop_assert!((0.0..=1.0).contains(&stats.average_score));
            prop_assert!(stats.recent_scores.len() <= 5);
            prop_assert!(stats.recent_scores.iter().all(|s| (0.0..=1.0).contains(&s)));

            if stats.total_attempts < 5 {
                prop_assert!(!stats.mastered);
            }
            prop_assert!(stats.next_review_date.unwrap() > clock.now());

            let profile = engine.learner_stats("learner").unwrap();
            let phonemes = engine.all_phoneme_progress("learner");
            let mastered = phonemes.values().filter(|s| s.mastered).count() as u32;
            prop_assert_eq!(profile.total_phonemes_mastered, mastered);
            prop_assert!(profile.current_streak <= profile.longest_streak);
            prop_assert!((0.0..=1.0).contains(&profile.average_score));

            clock.advance(Duration::hours(*gap));
        }

        let profile = engine.learner_stats("learner").unwrap();
        prop_assert_eq!(profile.total_attempts as usize, attempts.len());
    }

    #[test]
    fn reads_are_idempotent(
        seed in any::<u64>(),
        attempts in prop::collection::vec(arb_attempt(), 1..30),
    ) {
        let (engine, clock) = engine(seed, ReviewProfile::Medium);
        for (attempt, gap) in &attempts {
            engine.record(attempt).unwrap();
            clock.advance(Duration::hours(*gap));
        }

        prop_assert_eq!(engine.next_lesson("learner"), engine.next_lesson("learner"));
        prop_assert_eq!(engine.recommendations("learner"), engine.recommendations("learner"));
        prop_assert_eq!(engine.dashboard("learner"), engine.dashboard("learner"));
        prop_assert_eq!(engine.admin_stats(), engine.admin_stats());
        prop_assert_eq!(engine.export(), engine.export());
    }

    #[test]
    fn review_offset_within_jitter_bounds(
        seed in any::<u64>(),
        profile in arb_profile(),
        correct in 0u32..12,
        score in arb_f64_0_1(),
    ) {
        use rand::SeedableRng;

        let settings = AdminSettings::default();
        let base = scheduler::base_interval_hours(profile, &settings, correct, score);
        let mut stats = phonics_engine::PhonemeStats::new("th");
        stats.correct_attempts = correct;

        let now = Utc.with_ymd_and_hms(2025, 2, 3, 7, 30, 0).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let next = scheduler::next_review(now, &stats, score, profile, &settings, &mut rng);

        let hours = (next - now).num_milliseconds() as f64 / 3_600_000.0;
        // millisecond rounding
        let slack = 1.0 / 3_600_000.0;
        prop_assert!(hours >= base * 0.8 - slack, "{} < {}", hours, base * 0.8);
        prop_assert!(hours <= base * 1.2 + slack, "{} > {}", hours, base * 1.2);
    }

    #[test]
    fn out_of_range_scores_never_change_state(
        bad in prop_oneof![
            (1.0001f64..100.0),
            (-100.0f64..-0.0001),
            Just(f64::NAN),
            Just(f64::INFINITY),
        ],
    ) {
        let (engine, _) = engine(1, ReviewProfile::Medium);
        engine.record(&Attempt::new("learner", "th", 0.8, 2500)).unwrap();
        let before = engine.export();

        prop_assert!(engine.record(&Attempt::new("learner", "th", bad, 2500)).is_err());
        prop_assert!(engine.record(&Attempt::new("other", "th", bad, 2500)).is_err());
        prop_assert_eq!(engine.export(), before);
    }
}
