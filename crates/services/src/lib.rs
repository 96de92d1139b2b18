#![forbid(unsafe_code)]

pub mod controller;
pub mod error;
pub mod events;
pub mod options;
pub mod progress;
pub mod pronunciation_service;
pub mod recognition;
pub mod sources;

pub use tutor_core::Clock;

pub use controller::{
    ExamProgress, ExamRequirements, ExamStartRejection, LearningSession, PronunciationOutcome,
    PronunciationRejection,
};
pub use error::{DataLoadError, RecognitionError, SessionError};
pub use events::{
    EventLog, ExamCompletionRecord, NoopObserver, NotificationKind, PronunciationResult,
    SessionEvent, SessionObserver,
};
pub use options::{DebugOverrides, SessionOptions};
pub use progress::{ProgressSummary, ProgressTracker, SectionOverview};
pub use pronunciation_service::PronunciationScoreService;
pub use recognition::{AttemptTicket, Recognition, SpeechRecognizer};
pub use sources::{ConfigSource, CurriculumSource, HttpSource, JsonFileSource};
