use serde::{Deserialize, Serialize};

use crate::model::Configuration;
use crate::similarity::similarity;

/// Weight of text similarity in the final accuracy.
pub const TEXT_WEIGHT: f64 = 0.7;
/// Weight of recognizer confidence in the final accuracy.
pub const CONFIDENCE_WEIGHT: f64 = 0.3;

/// Combine text similarity with recognizer confidence into an accuracy in `[0, 100]`.
///
/// The best similarity across the primary and alternate targets is used.
/// Inputs are compared as given; lower-case them first for a case-insensitive
/// score. Confidence is clamped into `[0, 1]` and a NaN confidence counts as 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn score(
    recognized: &str,
    primary_target: &str,
    confidence: f64,
    alternate_target: Option<&str>,
) -> u8 {
    let primary = similarity(recognized, primary_target);
    let best = alternate_target
        .map(|alt| similarity(recognized, alt))
        .map_or(primary, |alt| alt.max(primary));

    let confidence = if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    };

    let raw = (100.0 * (TEXT_WEIGHT * best + CONFIDENCE_WEIGHT * confidence)).round();
    raw.clamp(0.0, 100.0) as u8
}

/// Coarse feedback tier shown next to a pronunciation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PronunciationFeedback {
    Excellent,
    Good,
    NeedsPractice,
}

impl PronunciationFeedback {
    #[must_use]
    pub fn for_score(score: u8, config: &Configuration) -> Self {
        if score >= config.pronunciation_excellent_threshold() {
            Self::Excellent
        } else if score >= config.pronunciation_good_threshold() {
            Self::Good
        } else {
            Self::NeedsPractice
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_transcript_with_full_confidence_scores_100() {
        assert_eq!(score("dobrý den", "dobrý den", 1.0, None), 100);
        assert_eq!(score("dobrý den.", "dobrý den", 1.0, None), 100);
    }

    #[test]
    fn alternate_target_can_only_raise_the_score() {
        let primary_only = score("děkuju", "děkuji", 0.5, None);
        let with_alt = score("děkuju", "děkuji", 0.5, Some("děkuju"));
        assert!(with_alt > primary_only);
        assert_eq!(with_alt, 85);

        let unrelated_alt = score("děkuji", "děkuji", 0.5, Some("xyz"));
        assert_eq!(unrelated_alt, 85);
    }

    #[test]
    fn weights_text_and_confidence() {
        // similarity 0.8, confidence 0.5 → 56 + 15 = 71
        assert_eq!(score("dobry", "dobrý", 0.5, None), 71);
        assert_eq!(score("", "ahoj", 0.0, None), 0);
    }

    #[test]
    fn output_is_bounded_for_odd_confidence() {
        for confidence in [f64::NAN, -3.0, 0.0, 0.42, 1.0, 7.5, f64::INFINITY] {
            let value = score("something", "ahoj", confidence, None);
            assert!(value <= 100);
        }
        assert_eq!(score("ahoj", "ahoj", 7.5, None), 100);
        assert_eq!(score("ahoj", "ahoj", f64::NAN, None), 70);
    }

    #[test]
    fn feedback_tiers_follow_configuration() {
        let config = Configuration::default();
        assert_eq!(
            PronunciationFeedback::for_score(95, &config),
            PronunciationFeedback::Excellent
        );
        assert_eq!(
            PronunciationFeedback::for_score(75, &config),
            PronunciationFeedback::Good
        );
        assert_eq!(
            PronunciationFeedback::for_score(10, &config),
            PronunciationFeedback::NeedsPractice
        );
    }
}
