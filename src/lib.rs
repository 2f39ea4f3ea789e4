//! # phonics-engine
//!
//! Adaptive learning engine behind the phonics practice app. It decides,
//! per learner and per phoneme, when the next review is due, how hard the
//! next exercise should be and whether a phoneme counts as mastered.
//!
//! ```rust
//! use phonics_engine::{Attempt, LearningEngine};
//!
//! let engine = LearningEngine::new();
//! engine.initialize_learner("u1", "Ada");
//! let stats = engine.record(&Attempt::new("u1", "th", 0.92, 2400)).unwrap();
//! assert_eq!(stats.total_attempts, 1);
//! assert!(engine.next_lesson("u1").is_some());
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod learning;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{EngineError, Result};
pub use learning::*;
