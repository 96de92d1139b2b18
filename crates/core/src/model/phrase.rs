use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhraseError {
    #[error("phrase source text cannot be empty")]
    EmptySource,

    #[error("phrase target text cannot be empty")]
    EmptyTarget,

    #[error("phrase must have 3 or 4 fields, found {len}")]
    InvalidFieldCount { len: usize },
}

/// A single curriculum entry: the learner's language, the language being
/// learned, a pronunciation guide and an optional accepted alternate target.
///
/// Serialized as a 3- or 4-element string array to match the curriculum data
/// files: `["source", "target", "guide", "alternate?"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Phrase {
    source: String,
    target: String,
    pronunciation_guide: String,
    alternate_target: Option<String>,
}

impl Phrase {
    /// Build a phrase, trimming every field.
    ///
    /// # Errors
    ///
    /// Returns `PhraseError` when the source or target is blank.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        pronunciation_guide: impl Into<String>,
        alternate_target: Option<String>,
    ) -> Result<Self, PhraseError> {
        let source = source.into().trim().to_owned();
        let target = target.into().trim().to_owned();
        if source.is_empty() {
            return Err(PhraseError::EmptySource);
        }
        if target.is_empty() {
            return Err(PhraseError::EmptyTarget);
        }

        Ok(Self {
            source,
            target,
            pronunciation_guide: pronunciation_guide.into().trim().to_owned(),
            alternate_target: alternate_target
                .map(|alt| alt.trim().to_owned())
                .filter(|alt| !alt.is_empty()),
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn pronunciation_guide(&self) -> &str {
        &self.pronunciation_guide
    }

    #[must_use]
    pub fn alternate_target(&self) -> Option<&str> {
        self.alternate_target.as_deref()
    }

    /// Text in the given language slot.
    #[must_use]
    pub fn text(&self, slot: LanguageSlot) -> &str {
        match slot {
            LanguageSlot::Source => &self.source,
            LanguageSlot::Target => &self.target,
        }
    }
}

/// Which side of a phrase a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSlot {
    Source,
    Target,
}

impl TryFrom<Vec<String>> for Phrase {
    type Error = PhraseError;

    fn try_from(fields: Vec<String>) -> Result<Self, Self::Error> {
        let len = fields.len();
        let mut fields = fields.into_iter();
        match (fields.next(), fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(source), Some(target), Some(guide), alternate, None) => {
                Self::new(source, target, guide, alternate)
            }
            _ => Err(PhraseError::InvalidFieldCount { len }),
        }
    }
}

impl From<Phrase> for Vec<String> {
    fn from(phrase: Phrase) -> Self {
        let mut fields = vec![phrase.source, phrase.target, phrase.pronunciation_guide];
        if let Some(alt) = phrase.alternate_target {
            fields.push(alt);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_and_four_field_arrays() {
        let plain: Phrase = serde_json::from_str(r#"["Hola", "Ahoj", "ah-hoy"]"#).unwrap();
        assert_eq!(plain.source(), "Hola");
        assert_eq!(plain.target(), "Ahoj");
        assert_eq!(plain.alternate_target(), None);

        let alt: Phrase =
            serde_json::from_str(r#"["Gracias", "Děkuji", "dyeh-koo-yi", "Děkuju"]"#).unwrap();
        assert_eq!(alt.alternate_target(), Some("Děkuju"));
    }

    #[test]
    fn rejects_wrong_field_counts_and_blank_text() {
        assert!(serde_json::from_str::<Phrase>(r#"["only", "two"]"#).is_err());
        assert!(serde_json::from_str::<Phrase>(r#"["a", "b", "c", "d", "e"]"#).is_err());
        assert_eq!(
            Phrase::new("  ", "Ahoj", "", None).unwrap_err(),
            PhraseError::EmptySource
        );
        assert_eq!(
            Phrase::new("Hola", "", "", None).unwrap_err(),
            PhraseError::EmptyTarget
        );
    }

    #[test]
    fn blank_alternate_is_dropped() {
        let phrase = Phrase::new("Sí", "Ano", "ah-no", Some("  ".into())).unwrap();
        assert_eq!(phrase.alternate_target(), None);
        assert_eq!(phrase.text(LanguageSlot::Target), "Ano");
    }
}
