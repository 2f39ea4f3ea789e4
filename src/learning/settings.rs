use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys accepted by [`AdminSettings::apply_partial`]; everything else is ignored.
pub const SETTINGS_KEYS: [&str; 5] = [
    "difficulty_mode",
    "spaced_repetition_interval",
    "feedback_intensity",
    "enable_personalization",
    "enable_gamification",
];

/// Interval (hours) at which the review ladder is used unscaled
pub const BASE_REVIEW_INTERVAL_HOURS: f64 = 24.0;

/// Largest accepted admin interval: one year per base day
pub const MAX_REVIEW_INTERVAL_HOURS: f64 = 24.0 * 365.0;

/// Accepts finite intervals in `(0, MAX_REVIEW_INTERVAL_HOURS]`.
pub fn is_valid_interval(hours: f64) -> bool {
    hours.is_finite() && hours > 0.0 && hours <= MAX_REVIEW_INTERVAL_HOURS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyMode {
    #[default]
    Adaptive,
    Fixed,
}

impl DifficultyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Fixed => "fixed",
        }
    }

    /// Anything other than "adaptive" disables adaptation.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "adaptive" => Self::Adaptive,
            _ => Self::Fixed,
        }
    }
}

/// Process-wide algorithm settings, changed only through the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSettings {
    pub difficulty_mode: DifficultyMode,
    /// Hours; 24 means the review ladder is used as-is
    pub spaced_repetition_interval: f64,
    pub feedback_intensity: String,
    pub enable_personalization: bool,
    pub enable_gamification: bool,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            difficulty_mode: DifficultyMode::Adaptive,
            spaced_repetition_interval: BASE_REVIEW_INTERVAL_HOURS,
            feedback_intensity: "normal".to_string(),
            enable_personalization: true,
            enable_gamification: true,
        }
    }
}

/// Outcome of a partial settings update. Updates never fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsUpdate {
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
}

impl AdminSettings {
    pub fn is_adaptive(&self) -> bool {
        self.difficulty_mode == DifficultyMode::Adaptive
    }

    /// Factor applied to every ladder entry.
    pub fn interval_multiplier(&self) -> f64 {
        self.spaced_repetition_interval / BASE_REVIEW_INTERVAL_HOURS
    }

    /// Applies whitelisted keys from `patch`. Unknown keys and values of the
    /// wrong shape are reported as ignored and leave the field untouched.
    pub fn apply_partial(&mut self, patch: &Map<String, Value>) -> SettingsUpdate {
        let mut outcome = SettingsUpdate::default();

        for (key, value) in patch {
            if !SETTINGS_KEYS.contains(&key.as_str()) {
                outcome.ignored.push(key.clone());
                continue;
            }

            let applied = match key.as_str() {
                "difficulty_mode" => match value.as_str() {
                    Some(mode) => {
                        self.difficulty_mode = DifficultyMode::parse(mode);
                        true
                    }
                    None => false,
                },
                "spaced_repetition_interval" => match value.as_f64() {
                    Some(hours) if is_valid_interval(hours) => {
                        self.spaced_repetition_interval = hours;
                        true
                    }
                    _ => false,
                },
                "feedback_intensity" => match value.as_str() {
                    Some(intensity) => {
                        self.feedback_intensity = intensity.to_string();
                        true
                    }
                    None => false,
                },
                "enable_personalization" => match value.as_bool() {
                    Some(enabled) => {
                        self.enable_personalization = enabled;
                        true
                    }
                    None => false,
                },
                "enable_gamification" => match value.as_bool() {
                    Some(enabled) => {
                        self.enable_gamification = enabled;
                        true
                    }
                    None => false,
                },
                _ => false,
            };

            if applied {
                outcome.applied.push(key.clone());
            } else {
                outcome.ignored.push(key.clone());
            }
        }

        outcome
    }
}
