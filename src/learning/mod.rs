//! Adaptive learning engine
//!
//! Contains:
//! - Score adjustment (timing and audio-quality corrections)
//! - Spaced-repetition scheduling on a review ladder
//! - Adaptive difficulty and mastery assessment
//! - Lesson selection, recommendations and admin analytics
//! - `LearningEngine` - the per-process entry point that owns all state

pub mod analytics;
pub mod difficulty;
pub mod engine;
pub mod mastery;
pub mod patterns;
pub mod recommend;
pub mod scheduler;
pub mod score;
pub mod settings;
pub mod store;
pub mod types;

pub use analytics::{
    AdminStats, AlgorithmMetrics, ExportSnapshot, PhonemeDetail, ProgressSummary,
    StudentAnalytics, StudentProgressRow,
};
pub use engine::{EngineOptions, LearningEngine};
pub use patterns::{DayPeriod, LearningPatterns, LearningStyle};
pub use recommend::{Dashboard, LessonPick, PhonemeScore, Recommendations};
pub use scheduler::ReviewProfile;
pub use settings::{AdminSettings, DifficultyMode, SettingsUpdate};
pub use types::{Attempt, AudioFeatures, LearnerProfile, PhonemeStats, RecentScores};
