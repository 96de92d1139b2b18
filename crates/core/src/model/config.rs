use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_EXCELLENT_THRESHOLD: u8 = 90;
pub const DEFAULT_GOOD_THRESHOLD: u8 = 70;
/// Minimum stored accuracy on every phrase before the section exam opens.
pub const DEFAULT_EXAM_REQUIREMENT_THRESHOLD: u8 = 89;
/// Exam percentage needed to pass. Supersedes the older 80% rule.
pub const DEFAULT_EXAM_PASSING_PERCENTAGE: u8 = 90;

/// Tuning values for scoring and gating, fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pronunciation_excellent_threshold: u8,
    pronunciation_good_threshold: u8,
    pronunciation_exam_requirement_threshold: u8,
    exam_passing_percentage: u8,
}

/// Unvalidated configuration as read from a data source. Missing keys fall
/// back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDraft {
    pub pronunciation_excellent_threshold: Option<u8>,
    pub pronunciation_good_threshold: Option<u8>,
    pub pronunciation_exam_requirement_threshold: Option<u8>,
    pub exam_passing_percentage: Option<u8>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{field} must be between 0 and 100, got {value}")]
    OutOfRange { field: &'static str, value: u8 },

    #[error("good threshold ({good}) is above excellent threshold ({excellent})")]
    InvertedTiers { good: u8, excellent: u8 },
}

impl ConfigurationDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill defaults and check ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a percentage exceeds 100 or the feedback tiers
    /// are inverted.
    pub fn validate(self) -> Result<Configuration, ConfigError> {
        let config = Configuration {
            pronunciation_excellent_threshold: self
                .pronunciation_excellent_threshold
                .unwrap_or(DEFAULT_EXCELLENT_THRESHOLD),
            pronunciation_good_threshold: self
                .pronunciation_good_threshold
                .unwrap_or(DEFAULT_GOOD_THRESHOLD),
            pronunciation_exam_requirement_threshold: self
                .pronunciation_exam_requirement_threshold
                .unwrap_or(DEFAULT_EXAM_REQUIREMENT_THRESHOLD),
            exam_passing_percentage: self
                .exam_passing_percentage
                .unwrap_or(DEFAULT_EXAM_PASSING_PERCENTAGE),
        };

        for (field, value) in [
            (
                "pronunciationExcellentThreshold",
                config.pronunciation_excellent_threshold,
            ),
            ("pronunciationGoodThreshold", config.pronunciation_good_threshold),
            (
                "pronunciationExamRequirementThreshold",
                config.pronunciation_exam_requirement_threshold,
            ),
            ("examPassingPercentage", config.exam_passing_percentage),
        ] {
            if value > 100 {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        if config.pronunciation_good_threshold > config.pronunciation_excellent_threshold {
            return Err(ConfigError::InvertedTiers {
                good: config.pronunciation_good_threshold,
                excellent: config.pronunciation_excellent_threshold,
            });
        }

        Ok(config)
    }
}

impl Configuration {
    #[must_use]
    pub fn pronunciation_excellent_threshold(&self) -> u8 {
        self.pronunciation_excellent_threshold
    }

    #[must_use]
    pub fn pronunciation_good_threshold(&self) -> u8 {
        self.pronunciation_good_threshold
    }

    #[must_use]
    pub fn pronunciation_exam_requirement_threshold(&self) -> u8 {
        self.pronunciation_exam_requirement_threshold
    }

    #[must_use]
    pub fn exam_passing_percentage(&self) -> u8 {
        self.exam_passing_percentage
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            pronunciation_excellent_threshold: DEFAULT_EXCELLENT_THRESHOLD,
            pronunciation_good_threshold: DEFAULT_GOOD_THRESHOLD,
            pronunciation_exam_requirement_threshold: DEFAULT_EXAM_REQUIREMENT_THRESHOLD,
            exam_passing_percentage: DEFAULT_EXAM_PASSING_PERCENTAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let config = ConfigurationDraft::new().validate().unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.exam_passing_percentage(), 90);
        assert_eq!(config.pronunciation_exam_requirement_threshold(), 89);
    }

    #[test]
    fn partial_json_overrides_only_given_keys() {
        let draft: ConfigurationDraft =
            serde_json::from_str(r#"{"examPassingPercentage": 75}"#).unwrap();
        let config = draft.validate().unwrap();
        assert_eq!(config.exam_passing_percentage(), 75);
        assert_eq!(config.pronunciation_good_threshold(), DEFAULT_GOOD_THRESHOLD);
    }

    #[test]
    fn rejects_out_of_range_and_inverted_tiers() {
        let draft = ConfigurationDraft {
            exam_passing_percentage: Some(101),
            ..ConfigurationDraft::default()
        };
        assert!(matches!(
            draft.validate(),
            Err(ConfigError::OutOfRange { value: 101, .. })
        ));

        let draft = ConfigurationDraft {
            pronunciation_good_threshold: Some(95),
            pronunciation_excellent_threshold: Some(80),
            ..ConfigurationDraft::default()
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            ConfigError::InvertedTiers {
                good: 95,
                excellent: 80
            }
        );
    }
}
