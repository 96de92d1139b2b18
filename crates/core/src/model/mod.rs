mod config;
mod curriculum;
mod phrase;
mod progress;
mod scores;

pub use config::{
    ConfigError, Configuration, ConfigurationDraft, DEFAULT_EXAM_PASSING_PERCENTAGE,
    DEFAULT_EXAM_REQUIREMENT_THRESHOLD, DEFAULT_EXCELLENT_THRESHOLD, DEFAULT_GOOD_THRESHOLD,
};
pub use curriculum::{Curriculum, CurriculumError, Section};
pub use phrase::{LanguageSlot, Phrase, PhraseError};
pub use progress::ProgressState;
pub use scores::PronunciationScoreTable;
