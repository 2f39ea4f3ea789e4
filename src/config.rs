use crate::learning::settings::is_valid_interval;
use crate::learning::{AdminSettings, DifficultyMode, EngineOptions, ReviewProfile};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub review_profile: ReviewProfile,
    pub sticky_mastery: bool,
    pub rng_seed: Option<u64>,
    pub difficulty_mode: DifficultyMode,
    pub review_interval_hours: f64,
}

impl Default for Config {
    fn default() -> Self {
        let settings = AdminSettings::default();
        Self {
            log_level: "info".to_string(),
            review_profile: ReviewProfile::default(),
            sticky_mastery: false,
            rng_seed: None,
            difficulty_mode: settings.difficulty_mode,
            review_interval_hours: settings.spaced_repetition_interval,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let review_profile = std::env::var("LEARNING_REVIEW_PROFILE")
            .map(|value| ReviewProfile::parse(&value))
            .unwrap_or(defaults.review_profile);

        let sticky_mastery = std::env::var("LEARNING_STICKY_MASTERY")
            .ok()
            .and_then(|value| parse_bool(&value))
            .unwrap_or(defaults.sticky_mastery);

        let rng_seed = std::env::var("LEARNING_RNG_SEED")
            .ok()
            .and_then(|value| value.parse::<u64>().ok());

        let difficulty_mode = std::env::var("LEARNING_DIFFICULTY_MODE")
            .map(|value| DifficultyMode::parse(&value))
            .unwrap_or(defaults.difficulty_mode);

        let review_interval_hours = std::env::var("LEARNING_REVIEW_INTERVAL_HOURS")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|hours| is_valid_interval(*hours))
            .unwrap_or(defaults.review_interval_hours);

        Self {
            log_level,
            review_profile,
            sticky_mastery,
            rng_seed,
            difficulty_mode,
            review_interval_hours,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            review_profile: self.review_profile,
            sticky_mastery: self.sticky_mastery,
            rng_seed: self.rng_seed,
            initial_settings: AdminSettings {
                difficulty_mode: self.difficulty_mode,
                spaced_repetition_interval: self.review_interval_hours,
                ..AdminSettings::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn engine_options_carry_initial_settings() {
        let config = Config {
            review_profile: ReviewProfile::Long,
            sticky_mastery: true,
            rng_seed: Some(9),
            difficulty_mode: DifficultyMode::Fixed,
            review_interval_hours: 12.0,
            ..Config::default()
        };
        let options = config.engine_options();
        assert_eq!(options.review_profile, ReviewProfile::Long);
        assert!(options.sticky_mastery);
        assert_eq!(options.rng_seed, Some(9));
        assert_eq!(options.initial_settings.difficulty_mode, DifficultyMode::Fixed);
        assert_eq!(options.initial_settings.spaced_repetition_interval, 12.0);
        assert!(options.initial_settings.enable_gamification);
    }
}
