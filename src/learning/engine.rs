use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};

use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, Result};
use crate::learning::analytics::{
    self, AdminStats, AlgorithmMetrics, ExportSnapshot, StudentAnalytics, StudentProgressRow,
};
use crate::learning::difficulty::{self, DifficultyChange};
use crate::learning::mastery;
use crate::learning::patterns::LearningPatterns;
use crate::learning::recommend::{self, Dashboard, LessonPick, Recommendations};
use crate::learning::scheduler::{self, ReviewProfile};
use crate::learning::score::{self, CORRECT_THRESHOLD};
use crate::learning::settings::{AdminSettings, SettingsUpdate};
use crate::learning::store::{LearnerState, LearningStore};
use crate::learning::types::{Attempt, LearnerProfile, PhonemeStats};

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub review_profile: ReviewProfile,
    /// Keep a phoneme mastered once reached instead of re-judging every attempt
    pub sticky_mastery: bool,
    /// Fixed seed for review jitter; entropy when unset
    pub rng_seed: Option<u64>,
    pub initial_settings: AdminSettings,
}

/// The adaptive learning engine.
///
/// One instance per process, shared by request handlers. Writes for a given
/// learner are serialized by that learner's lock; reads see whole-learner
/// snapshots, never a half-applied attempt.
pub struct LearningEngine {
    store: LearningStore,
    settings: RwLock<AdminSettings>,
    rng: Mutex<ChaCha8Rng>,
    clock: Arc<dyn Clock>,
    options: EngineOptions,
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningEngine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: EngineOptions, clock: Arc<dyn Clock>) -> Self {
        let rng = match options.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            store: LearningStore::new(),
            settings: RwLock::new(options.initial_settings.clone()),
            rng: Mutex::new(rng),
            clock,
            options,
        }
    }

    fn new_learner(&self, learner_id: &str, username: &str) -> LearnerState {
        LearnerState::new(LearnerProfile::new(learner_id, username, self.clock.now()))
    }

    // ==================== Learners ====================

    /// Returns the existing profile when the learner is already known.
    pub fn initialize_learner(&self, learner_id: &str, username: &str) -> LearnerProfile {
        let entry = self
            .store
            .get_or_insert_with(learner_id, || self.new_learner(learner_id, username));
        let profile = entry.lock().profile.clone();
        profile
    }

    pub fn learner_stats(&self, learner_id: &str) -> Option<LearnerProfile> {
        self.store.with_learner(learner_id, |l| l.profile.clone())
    }

    pub fn phoneme_progress(&self, learner_id: &str, phoneme: &str) -> Option<PhonemeStats> {
        self.store
            .with_learner(learner_id, |l| l.phonemes.get(phoneme).cloned())
            .flatten()
    }

    /// Empty for unknown learners.
    pub fn all_phoneme_progress(&self, learner_id: &str) -> BTreeMap<String, PhonemeStats> {
        self.store
            .with_learner(learner_id, |l| l.phonemes.clone())
            .unwrap_or_default()
    }

    pub fn learning_patterns(&self, learner_id: &str) -> Option<LearningPatterns> {
        self.store.with_learner(learner_id, |l| l.patterns.clone())
    }

    // ==================== Attempt Recording ====================

    /// Records one scored attempt and returns the phoneme's updated stats.
    ///
    /// Rejects scores outside [0, 1] without touching any state. Unknown
    /// learners are created on the fly.
    pub fn record(&self, attempt: &Attempt) -> Result<PhonemeStats> {
        let raw = score::validate_score(attempt.score).map_err(|err| {
            tracing::warn!(
                learner_id = %attempt.learner_id,
                phoneme = %attempt.phoneme,
                score = attempt.score,
                "rejected attempt with out-of-range score"
            );
            err
        })?;

        let now = self.clock.now();
        let settings = self.settings.read().clone();
        let adjusted = score::adjust_score(raw, attempt.duration_ms, attempt.audio_features.as_ref());

        let entry = self.store.get_or_insert_with(&attempt.learner_id, || {
            self.new_learner(&attempt.learner_id, &format!("User_{}", attempt.learner_id))
        });
        let mut learner = entry.lock();

        let stats = learner
            .phonemes
            .entry(attempt.phoneme.clone())
            .or_insert_with(|| PhonemeStats::new(&attempt.phoneme));

        stats.total_attempts += 1;
        if adjusted >= CORRECT_THRESHOLD {
            stats.correct_attempts += 1;
        }

        let alpha = score::smoothing_factor(stats.total_attempts);
        stats.average_score = alpha * adjusted + (1.0 - alpha) * stats.average_score;
        stats.success_rate = stats.correct_attempts as f64 / stats.total_attempts as f64;
        stats.last_attempted = Some(now);

        stats.next_review_date = Some({
            let mut rng = self.rng.lock();
            scheduler::next_review(
                now,
                stats,
                adjusted,
                self.options.review_profile,
                &settings,
                &mut *rng,
            )
        });

        let previous_level = stats.difficulty_level;
        let change = difficulty::adjust_difficulty(stats, adjusted, attempt.duration_ms, &settings);
        if change != DifficultyChange::Unchanged {
            tracing::info!(
                learner_id = %attempt.learner_id,
                phoneme = %attempt.phoneme,
                from = previous_level,
                to = stats.difficulty_level,
                "difficulty adjusted"
            );
        }

        let was_mastered = stats.mastered;
        let assessed = mastery::assess_mastery(stats);
        stats.mastered = assessed || (self.options.sticky_mastery && was_mastered);
        if stats.mastered != was_mastered {
            tracing::info!(
                learner_id = %attempt.learner_id,
                phoneme = %attempt.phoneme,
                mastered = stats.mastered,
                "mastery changed"
            );
        }

        let updated = stats.clone();

        learner.apply_attempt(adjusted, now);
        learner
            .patterns
            .record(&attempt.phoneme, adjusted, attempt.duration_ms, now);

        tracing::debug!(
            learner_id = %attempt.learner_id,
            phoneme = %attempt.phoneme,
            raw_score = raw,
            adjusted_score = adjusted,
            feedback = %attempt.feedback,
            next_review = ?updated.next_review_date,
            difficulty = updated.difficulty_level,
            mastered = updated.mastered,
            "attempt recorded"
        );

        Ok(updated)
    }

    // ==================== Recommendations ====================

    pub fn next_lesson(&self, learner_id: &str) -> Option<LessonPick> {
        let now = self.clock.now();
        self.store
            .with_learner(learner_id, |l| recommend::next_lesson(&l.phonemes, now))
            .flatten()
    }

    /// `None` until the learner has at least one phoneme on record.
    pub fn recommendations(&self, learner_id: &str) -> Option<Recommendations> {
        self.store
            .with_learner(learner_id, |l| {
                if l.phonemes.is_empty() {
                    None
                } else {
                    Some(recommend::recommendations(&l.profile, &l.phonemes))
                }
            })
            .flatten()
    }

    pub fn recommended_difficulty(&self, learner_id: &str) -> u8 {
        self.store
            .with_learner(learner_id, |l| recommend::recommended_difficulty(&l.phonemes))
            .unwrap_or(1)
    }

    /// Initializes unknown learners so a dashboard can always be shown.
    pub fn dashboard(&self, learner_id: &str) -> Dashboard {
        let entry = self.store.get_or_insert_with(learner_id, || {
            self.new_learner(learner_id, &format!("User_{learner_id}"))
        });
        let learner = entry.lock();
        recommend::dashboard(&learner.profile, &learner.phonemes)
    }

    // ==================== Admin ====================

    pub fn settings(&self) -> AdminSettings {
        self.settings.read().clone()
    }

    pub fn update_settings(&self, patch: &Map<String, Value>) -> SettingsUpdate {
        let outcome = self.settings.write().apply_partial(patch);
        if !outcome.ignored.is_empty() {
            tracing::warn!(ignored = ?outcome.ignored, "ignored settings keys");
        }
        tracing::info!(applied = ?outcome.applied, "admin settings updated");
        outcome
    }

    pub fn admin_stats(&self) -> AdminStats {
        analytics::admin_stats(&self.store.snapshot_all())
    }

    pub fn algorithm_metrics(&self) -> AlgorithmMetrics {
        analytics::algorithm_metrics(&self.store.snapshot_all())
    }

    pub fn student_progress_table(&self) -> Vec<StudentProgressRow> {
        analytics::student_progress_table(&self.store.snapshot_all())
    }

    pub fn student_analytics(&self, learner_id: &str) -> Option<StudentAnalytics> {
        self.store.with_learner(learner_id, analytics::student_analytics)
    }

    /// Clears a learner's progress, keeping id, username and creation time.
    pub fn reset_learner(&self, learner_id: &str) -> Result<LearnerProfile> {
        let now = self.clock.now();
        let profile = self
            .store
            .with_learner_mut(learner_id, |learner| {
                let fresh = learner.profile.reset(now);
                *learner = LearnerState::new(fresh.clone());
                fresh
            })
            .ok_or_else(|| EngineError::LearnerNotFound(learner_id.to_string()))?;

        tracing::info!(learner_id = %learner_id, "learner progress reset");
        Ok(profile)
    }

    pub fn export(&self) -> ExportSnapshot {
        let settings = self.settings();
        analytics::export(&self.store.snapshot_all(), &settings, self.clock.now())
    }

    /// Replaces all state with `snapshot`. Mastered counts are recomputed
    /// from the phoneme stats; learning patterns start empty.
    pub fn restore(&self, snapshot: ExportSnapshot) {
        let ExportSnapshot {
            learner_profiles,
            mut phoneme_stats,
            admin_settings,
            ..
        } = snapshot;

        let states: Vec<LearnerState> = learner_profiles
            .into_iter()
            .map(|(learner_id, profile)| {
                let mut state = LearnerState::new(profile);
                state.phonemes = phoneme_stats.remove(&learner_id).unwrap_or_default();
                state.profile.total_phonemes_mastered = state.mastered_count();
                state
            })
            .collect();

        if !phoneme_stats.is_empty() {
            tracing::warn!(
                orphaned = phoneme_stats.len(),
                "dropped phoneme stats without a learner profile"
            );
        }

        let learners = states.len();
        self.store.replace_all(states);
        *self.settings.write() = admin_settings;
        tracing::info!(learners, "engine state restored");
    }

    pub fn learner_count(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    fn engine() -> (LearningEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap(),
        ));
        let options = EngineOptions {
            rng_seed: Some(42),
            ..Default::default()
        };
        (LearningEngine::with_clock(options, clock.clone()), clock)
    }

    #[test]
    fn first_attempt_creates_learner_and_stats() {
        let (engine, clock) = engine();
        let stats = engine.record(&Attempt::new("u1", "p", 0.40, 2500)).unwrap();

        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.correct_attempts, 0);
        assert!((stats.average_score - 0.20).abs() < 1e-12);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.difficulty_level, 1);
        assert!(!stats.mastered);

        let next = stats.next_review_date.unwrap();
        let hours = (next - clock.now()).num_milliseconds() as f64 / 3_600_000.0;
        assert!((1.6..=2.4).contains(&hours), "got {hours}h");

        let profile = engine.learner_stats("u1").unwrap();
        assert_eq!(profile.username, "User_u1");
        assert_eq!(profile.total_attempts, 1);
        assert_eq!(profile.current_streak, 0);
    }

    #[test]
    fn rejected_score_leaves_state_untouched() {
        let (engine, _) = engine();
        let err = engine.record(&Attempt::new("u1", "p", 1.5, 2500)).unwrap_err();
        assert_eq!(err, EngineError::ScoreOutOfRange(1.5));
        assert!(engine.learner_stats("u1").is_none());
        assert_eq!(engine.learner_count(), 0);
    }

    #[test]
    fn initialize_is_idempotent() {
        let (engine, _) = engine();
        engine.initialize_learner("u1", "Ada");
        engine.record(&Attempt::new("u1", "p", 0.9, 2500)).unwrap();
        let again = engine.initialize_learner("u1", "Someone else");
        assert_eq!(again.username, "Ada");
        assert_eq!(again.total_attempts, 1);
    }

    #[test]
    fn sticky_mastery_survives_a_bad_attempt() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let options = EngineOptions {
            sticky_mastery: true,
            rng_seed: Some(1),
            ..Default::default()
        };
        let engine = LearningEngine::with_clock(options, clock);
        for _ in 0..8 {
            engine.record(&Attempt::new("u1", "p", 0.95, 2500)).unwrap();
        }
        assert!(engine.phoneme_progress("u1", "p").unwrap().mastered);

        let after = engine.record(&Attempt::new("u1", "p", 0.1, 2500)).unwrap();
        assert!(after.mastered);
        assert_eq!(engine.learner_stats("u1").unwrap().total_phonemes_mastered, 1);
    }

    #[test]
    fn recomputed_mastery_can_regress() {
        let (engine, _) = engine();
        for _ in 0..8 {
            engine.record(&Attempt::new("u1", "p", 0.95, 2500)).unwrap();
        }
        assert!(engine.phoneme_progress("u1", "p").unwrap().mastered);

        let after = engine.record(&Attempt::new("u1", "p", 0.1, 2500)).unwrap();
        assert!(!after.mastered);
        assert_eq!(engine.learner_stats("u1").unwrap().total_phonemes_mastered, 0);
    }

    #[test]
    fn due_review_is_preferred() {
        let (engine, clock) = engine();
        engine.record(&Attempt::new("u1", "a", 0.95, 2500)).unwrap();
        clock.advance(Duration::hours(12));
        engine.record(&Attempt::new("u1", "b", 0.95, 2500)).unwrap();

        // "a" (~6h ladder) is due, "b" is not
        let pick = engine.next_lesson("u1").unwrap();
        assert_eq!(pick.phoneme, "a");
        assert!((pick.priority - 0.5).abs() < 1e-12);
        assert!(engine.next_lesson("ghost").is_none());
    }

    #[test]
    fn dashboard_initializes_unknown_learner() {
        let (engine, _) = engine();
        let view = engine.dashboard("u9");
        assert_eq!(view.profile.username, "User_u9");
        assert!(view.recommendations.is_none());
        assert_eq!(view.mastery_percentage, 0.0);
        assert_eq!(engine.learner_count(), 1);
    }

    #[test]
    fn patterns_follow_attempts() {
        let (engine, _) = engine();
        engine.record(&Attempt::new("u1", "a", 0.95, 1500)).unwrap();
        let patterns = engine.learning_patterns("u1").unwrap();
        assert_eq!(patterns.hourly[&9].len(), 1);
        assert!(patterns.phoneme_scores.contains_key("a"));
    }

    #[test]
    fn restored_oversized_interval_keeps_record_whole() {
        let (engine, clock) = engine();
        engine.record(&Attempt::new("u1", "p", 0.95, 2500)).unwrap();

        let mut snapshot = engine.export();
        snapshot.admin_settings.spaced_repetition_interval = 1e12;
        engine.restore(snapshot);

        let stats = engine.record(&Attempt::new("u1", "p", 0.95, 2500)).unwrap();
        assert_eq!(stats.total_attempts, 2);
        assert!(stats.next_review_date.unwrap() > clock.now());

        let profile = engine.learner_stats("u1").unwrap();
        assert_eq!(profile.total_attempts, 2);
        assert_eq!(profile.last_active, clock.now());

        let ignored = engine.update_settings(
            serde_json::json!({ "spaced_repetition_interval": 1e12 })
                .as_object()
                .unwrap(),
        );
        assert_eq!(ignored.ignored, vec!["spaced_repetition_interval".to_string()]);
    }

    #[test]
    fn reset_unknown_learner_fails() {
        let (engine, _) = engine();
        assert_eq!(
            engine.reset_learner("ghost"),
            Err(EngineError::LearnerNotFound("ghost".to_string()))
        );
    }
}
