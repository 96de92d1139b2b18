use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Phrase;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum has no sections")]
    Empty,

    #[error("section {index} has an empty title")]
    EmptyTitle { index: usize },
}

/// A curriculum unit; the unit of unlocking and examination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "section")]
    title: String,
    #[serde(rename = "items", default)]
    phrases: Vec<Phrase>,
}

impl Section {
    #[must_use]
    pub fn new(title: impl Into<String>, phrases: Vec<Phrase>) -> Self {
        Self {
            title: title.into(),
            phrases,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    #[must_use]
    pub fn phrase(&self, index: usize) -> Option<&Phrase> {
        self.phrases.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// Ordered sequence of sections. Index order defines unlock order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Section>", into = "Vec<Section>")]
pub struct Curriculum {
    sections: Vec<Section>,
}

impl Curriculum {
    /// Validate and wrap a list of sections.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::Empty` for an empty list and
    /// `CurriculumError::EmptyTitle` when any section title is blank.
    pub fn new(sections: Vec<Section>) -> Result<Self, CurriculumError> {
        if sections.is_empty() {
            return Err(CurriculumError::Empty);
        }
        if let Some(index) = sections.iter().position(|s| s.title.trim().is_empty()) {
            return Err(CurriculumError::EmptyTitle { index });
        }
        Ok(Self { sections })
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// Number of sections; never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }
}

impl TryFrom<Vec<Section>> for Curriculum {
    type Error = CurriculumError;

    fn try_from(sections: Vec<Section>) -> Result<Self, Self::Error> {
        Self::new(sections)
    }
}

impl From<Curriculum> for Vec<Section> {
    fn from(curriculum: Curriculum) -> Self {
        curriculum.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_data_file_shape() {
        let json = r#"[
            {"section": "Saludos", "items": [["Hola", "Ahoj", "ah-hoy"], ["Adiós", "Nashledanou", "nas-hle-da-no"]]},
            {"section": "Números", "items": [["Uno", "Jedna", "yed-na"]]}
        ]"#;
        let curriculum: Curriculum = serde_json::from_str(json).unwrap();
        assert_eq!(curriculum.len(), 2);
        assert_eq!(curriculum.section(0).unwrap().title(), "Saludos");
        assert_eq!(curriculum.section(0).unwrap().len(), 2);
        assert_eq!(curriculum.section(1).unwrap().phrase(0).unwrap().target(), "Jedna");
    }

    #[test]
    fn empty_curriculum_is_rejected() {
        assert_eq!(Curriculum::new(Vec::new()).unwrap_err(), CurriculumError::Empty);
        assert!(serde_json::from_str::<Curriculum>("[]").is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Curriculum::new(vec![Section::new("A", vec![]), Section::new(" ", vec![])])
            .unwrap_err();
        assert_eq!(err, CurriculumError::EmptyTitle { index: 1 });
    }
}
