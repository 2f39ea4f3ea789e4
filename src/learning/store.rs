//! Engine-owned state container.
//!
//! Each learner's profile, phoneme stats and patterns sit together behind
//! one mutex, so an attempt updates them as a unit. The outer map lock is
//! only held long enough to find or insert a learner.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::learning::patterns::LearningPatterns;
use crate::learning::score::STREAK_THRESHOLD;
use crate::learning::types::{LearnerProfile, PhonemeStats};

/// Attempts beyond this no longer add weight to the profile average
const PROFILE_WEIGHT_CAP: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct LearnerState {
    pub profile: LearnerProfile,
    pub phonemes: BTreeMap<String, PhonemeStats>,
    pub patterns: LearningPatterns,
}

impl LearnerState {
    pub fn new(profile: LearnerProfile) -> Self {
        Self {
            profile,
            phonemes: BTreeMap::new(),
            patterns: LearningPatterns::default(),
        }
    }

    pub fn mastered_count(&self) -> u32 {
        self.phonemes.values().filter(|s| s.mastered).count() as u32
    }

    /// Mean of phoneme averages weighted by `min(total_attempts, 10)`.
    pub fn weighted_average(&self) -> f64 {
        let (weighted_sum, total_weight) =
            self.phonemes
                .values()
                .fold((0.0, 0u32), |(sum, weight), stats| {
                    let w = stats.total_attempts.min(PROFILE_WEIGHT_CAP);
                    (sum + stats.average_score * w as f64, weight + w)
                });

        if total_weight > 0 {
            weighted_sum / total_weight as f64
        } else {
            0.0
        }
    }

    /// Folds one recorded attempt into the profile aggregates.
    pub fn apply_attempt(&mut self, adjusted_score: f64, now: DateTime<Utc>) {
        let mastered = self.mastered_count();
        let average = self.weighted_average();

        let profile = &mut self.profile;
        profile.total_attempts += 1;
        profile.last_active = now;

        if adjusted_score >= STREAK_THRESHOLD {
            profile.current_streak += 1;
            profile.longest_streak = profile.longest_streak.max(profile.current_streak);
        } else {
            profile.current_streak = 0;
        }

        profile.total_phonemes_mastered = mastered;
        profile.average_score = average;
    }
}

#[derive(Default)]
pub struct LearningStore {
    learners: RwLock<HashMap<String, Arc<Mutex<LearnerState>>>>,
}

impl LearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, learner_id: &str) -> Option<Arc<Mutex<LearnerState>>> {
        self.learners.read().get(learner_id).cloned()
    }

    pub fn get_or_insert_with(
        &self,
        learner_id: &str,
        init: impl FnOnce() -> LearnerState,
    ) -> Arc<Mutex<LearnerState>> {
        if let Some(existing) = self.get(learner_id) {
            return existing;
        }

        let mut learners = self.learners.write();
        Arc::clone(
            learners
                .entry(learner_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(init()))),
        )
    }

    pub fn with_learner<R>(&self, learner_id: &str, f: impl FnOnce(&LearnerState) -> R) -> Option<R> {
        let entry = self.get(learner_id)?;
        let state = entry.lock();
        Some(f(&state))
    }

    pub fn with_learner_mut<R>(
        &self,
        learner_id: &str,
        f: impl FnOnce(&mut LearnerState) -> R,
    ) -> Option<R> {
        let entry = self.get(learner_id)?;
        let mut state = entry.lock();
        Some(f(&mut state))
    }

    /// Consistent per-learner copies, ordered by learner id.
    pub fn snapshot_all(&self) -> Vec<LearnerState> {
        let entries: Vec<(String, Arc<Mutex<LearnerState>>)> = self
            .learners
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect();

        let mut snapshots: Vec<(String, LearnerState)> = entries
            .into_iter()
            .map(|(id, entry)| {
                let state = entry.lock().clone();
                (id, state)
            })
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots.into_iter().map(|(_, state)| state).collect()
    }

    pub fn len(&self) -> usize {
        self.learners.read().len()
    }

    pub fn replace_all(&self, states: Vec<LearnerState>) {
        let fresh: HashMap<String, Arc<Mutex<LearnerState>>> = states
            .into_iter()
            .map(|state| (state.profile.user_id.clone(), Arc::new(Mutex::new(state))))
            .collect();
        *self.learners.write() = fresh;
    }
}
