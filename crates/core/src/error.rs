use thiserror::Error;

use crate::exam::ExamError;
use crate::model::{ConfigError, CurriculumError, PhraseError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Phrase(#[from] PhraseError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Exam(#[from] ExamError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Curriculum, Phrase, Section};

    fn build(target: &str) -> Result<Curriculum, Error> {
        let phrase = Phrase::new("Hola", target, "", None)?;
        Ok(Curriculum::new(vec![Section::new("Saludos", vec![phrase])])?)
    }

    #[test]
    fn domain_errors_convert_with_question_mark() {
        assert!(build("Ahoj").is_ok());
        assert!(matches!(build(" "), Err(Error::Phrase(PhraseError::EmptyTarget))));
        let err: Error = CurriculumError::Empty.into();
        assert_eq!(err.to_string(), CurriculumError::Empty.to_string());
    }
}
