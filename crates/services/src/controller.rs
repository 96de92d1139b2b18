use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::{LearnerRepository, Storage};
use tutor_core::exam::{
    AnswerOutcome, ExamQuestion, ExamRejection, ExamResults, ExamSession, ExamSettings, ExamStep,
};
use tutor_core::model::{Configuration, Curriculum, PronunciationScoreTable, Section};
use tutor_core::pronunciation::PronunciationFeedback;

use crate::error::{RecognitionError, SessionError};
use crate::events::{
    ExamCompletionRecord, NotificationKind, PronunciationResult, SessionEvent, SessionObserver,
};
use crate::options::{DEBUG_LEARNER_NAME, DEFAULT_LEARNER_NAME, SessionOptions};
use crate::progress::{ProgressSummary, ProgressTracker, SectionOverview};
use crate::pronunciation_service::PronunciationScoreService;
use crate::recognition::{AttemptTicket, Recognition, RecordingSlot, SpeechRecognizer};
use crate::sources::{ConfigSource, CurriculumSource};

/// Why an exam could not start. Nothing changes when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamStartRejection {
    /// Not every phrase has a qualifying pronunciation score yet.
    RequirementsNotMet {
        qualified: usize,
        total: usize,
        threshold: u8,
    },
    /// The section has nothing to ask about.
    EmptySection,
}

/// Why a pronunciation attempt could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PronunciationRejection {
    /// Another attempt is still being recognized.
    Busy,
    UnknownPhrase { section: usize, phrase: usize },
}

/// How a pronunciation attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PronunciationOutcome {
    Scored(PronunciationResult),
    /// Recognizer error or timeout; the score table is untouched.
    Failed(RecognitionError),
    /// The result belonged to an attempt that had already ended.
    Stale,
    Rejected(PronunciationRejection),
}

/// Pronunciation-gate status for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamRequirements {
    pub qualified: usize,
    pub total: usize,
    pub threshold: u8,
    /// Every phrase has a stored score at or above `threshold`.
    pub all_qualified: bool,
    pub bypassed: bool,
}

impl ExamRequirements {
    #[must_use]
    pub fn is_met(&self) -> bool {
        self.bypassed || self.all_qualified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    /// 1-based.
    pub question_number: usize,
    pub total_questions: usize,
    pub current_answered: bool,
}

/// One learner's session over a loaded curriculum.
///
/// Commands take `&mut self`, so handlers never interleave. Each command
/// persists what it changed before returning and then notifies the observer.
pub struct LearningSession {
    curriculum: Curriculum,
    config: Configuration,
    progress: ProgressTracker,
    scores: PronunciationScoreService,
    learner_repo: Arc<dyn LearnerRepository>,
    learner_name: String,
    exam: Option<ExamSession>,
    recording: RecordingSlot,
    options: SessionOptions,
    observer: Arc<dyn SessionObserver>,
    rng: Box<dyn RngCore + Send>,
}

impl LearningSession {
    /// Load data and saved state, then announce the starting section.
    ///
    /// A configuration failure falls back to defaults; a curriculum failure
    /// is fatal.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::CurriculumUnavailable` if the curriculum cannot
    /// be loaded.
    pub async fn bootstrap(
        storage: &Storage,
        curriculum_source: &dyn CurriculumSource,
        config_source: &dyn ConfigSource,
        options: SessionOptions,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, SessionError> {
        let curriculum = curriculum_source.load_curriculum().await.map_err(|err| {
            error!("curriculum unavailable: {err}");
            observer.on_event(&SessionEvent::Notification {
                kind: NotificationKind::Error,
                message: "Lessons could not be loaded.".to_owned(),
            });
            SessionError::CurriculumUnavailable(err)
        })?;
        info!("loaded curriculum with {} sections", curriculum.len());

        let (config, config_fallback) = match config_source.load_config().await {
            Ok(config) => (config, false),
            Err(err) => {
                warn!("using default configuration: {err}");
                (Configuration::default(), true)
            }
        };

        let progress =
            ProgressTracker::restore(Arc::clone(&storage.progress), options.clock, curriculum.len())
                .await;
        let scores = PronunciationScoreService::restore(Arc::clone(&storage.scores)).await;
        let learner_name = resolve_learner_name(storage.learner.as_ref(), &options).await;
        if options.debug.is_active() {
            info!("debug overrides active: {:?}", options.debug);
        }

        let session = Self {
            curriculum,
            config,
            progress,
            scores,
            learner_repo: Arc::clone(&storage.learner),
            learner_name,
            exam: None,
            recording: RecordingSlot::default(),
            options,
            observer,
            rng: Box::new(StdRng::from_os_rng()),
        };

        if config_fallback {
            session.notify(
                NotificationKind::Warning,
                "Settings could not be loaded; using defaults.",
            );
        }
        if let Some(days) = session.progress.days_since_last_visit() {
            let message = match days {
                0 => "Welcome back! Picking up where you left off.".to_owned(),
                1 => "Welcome back! It has been 1 day since your last session.".to_owned(),
                n => format!("Welcome back! It has been {n} days since your last session."),
            };
            session.notify(NotificationKind::Info, message);
        }
        session.emit_progress();
        session.emit_section_changed();
        Ok(session)
    }

    /// Replace the random source used for exam generation.
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    // ─── READ-ONLY VIEW ──────────────────────────────────────────────────────

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    #[must_use]
    pub fn current_section_index(&self) -> usize {
        self.progress.current_section()
    }

    #[must_use]
    pub fn current_section(&self) -> &Section {
        // Repair keeps the pointer inside the curriculum.
        &self.curriculum.sections()[self.progress.current_section()]
    }

    #[must_use]
    pub fn is_unlocked(&self, index: usize) -> bool {
        self.progress.is_unlocked(index)
    }

    #[must_use]
    pub fn progress_summary(&self) -> ProgressSummary {
        self.progress.summary()
    }

    #[must_use]
    pub fn sections(&self) -> Vec<SectionOverview> {
        self.progress.overview(&self.curriculum)
    }

    #[must_use]
    pub fn scores(&self) -> &PronunciationScoreTable {
        self.scores.table()
    }

    #[must_use]
    pub fn learner_name(&self) -> &str {
        &self.learner_name
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    #[must_use]
    pub fn is_exam_in_progress(&self) -> bool {
        self.exam.is_some()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&ExamQuestion> {
        self.exam.as_ref()?.current_question()
    }

    #[must_use]
    pub fn exam_progress(&self) -> Option<ExamProgress> {
        let exam = self.exam.as_ref()?;
        Some(ExamProgress {
            question_number: exam.current_index() + 1,
            total_questions: exam.total_questions(),
            current_answered: exam.is_current_answered(),
        })
    }

    #[must_use]
    pub fn exam_requirements(&self, section: usize) -> ExamRequirements {
        let total = self.curriculum.section(section).map_or(0, Section::len);
        let threshold = self.config.pronunciation_exam_requirement_threshold();
        ExamRequirements {
            qualified: self.scores.qualified_count(section, total, threshold),
            total,
            threshold,
            all_qualified: self.scores.meets_requirement(section, total, threshold),
            bypassed: self.options.debug.bypass_pronunciation_gate,
        }
    }

    /// Whether the exam for `section` may start now.
    #[must_use]
    pub fn can_take_exam(&self, section: usize) -> bool {
        self.curriculum.section(section).is_some() && self.exam_requirements(section).is_met()
    }

    // ─── SECTIONS ────────────────────────────────────────────────────────────

    /// Open an unlocked section. Any running exam is abandoned.
    pub async fn select_section(&mut self, index: usize) -> bool {
        if !self.progress.select_section(index).await {
            debug!("refused to open locked section {index}");
            self.notify(NotificationKind::Warning, "That section is still locked.");
            return false;
        }
        self.exam = None;
        self.emit_progress();
        self.emit_section_changed();
        true
    }

    /// Unlock and open the section after the current one.
    pub async fn unlock_next(&mut self) -> bool {
        if !self.progress.unlock_next().await {
            return false;
        }
        self.exam = None;
        self.emit_progress();
        self.emit_section_changed();
        true
    }

    /// Wipe progress and pronunciation scores and return to the first section.
    pub async fn reset_progress(&mut self) {
        if let Some(ticket) = self.recording.cancel() {
            debug!("discarding in-flight attempt {} on reset", ticket.id());
        }
        self.exam = None;
        self.scores.clear().await;
        self.progress.reset().await;
        info!("progress reset");
        self.emit_progress();
        self.emit_section_changed();
    }

    /// Persist a new learner display name.
    pub async fn set_learner_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if let Err(err) = self.learner_repo.save_learner_name(name).await {
            warn!("failed to save learner name: {err}");
        }
        name.clone_into(&mut self.learner_name);
        true
    }

    // ─── EXAM ────────────────────────────────────────────────────────────────

    /// Start the exam for the current section.
    ///
    /// Returns the number of questions. Starting again while an exam is
    /// running replaces it.
    ///
    /// # Errors
    ///
    /// Returns `ExamStartRejection` when the pronunciation gate is not met or
    /// the section is empty.
    pub fn start_exam(&mut self) -> Result<usize, ExamStartRejection> {
        let index = self.progress.current_section();
        let requirements = self.exam_requirements(index);
        if !requirements.is_met() {
            self.notify(
                NotificationKind::Warning,
                format!(
                    "Practice pronunciation first: {}/{} phrases at {}% or better.",
                    requirements.qualified, requirements.total, requirements.threshold
                ),
            );
            return Err(ExamStartRejection::RequirementsNotMet {
                qualified: requirements.qualified,
                total: requirements.total,
                threshold: requirements.threshold,
            });
        }

        let settings = ExamSettings {
            passing_percentage: self.config.exam_passing_percentage(),
            question_limit: self.options.debug.exam_question_limit,
            has_next_section: !self.progress.is_last_section()
                && !self.options.debug.is_active(),
        };
        let section = &self.curriculum.sections()[index];
        let exam = ExamSession::generate(index, section, settings, &mut self.rng)
            .map_err(|_| ExamStartRejection::EmptySection)?;

        let total = exam.total_questions();
        info!("exam started for section {index} with {total} questions");
        self.exam = Some(exam);
        self.emit(SessionEvent::ExamStarted {
            section: index,
            total_questions: total,
        });
        self.emit_question();
        Ok(total)
    }

    /// Answer the current question.
    ///
    /// # Errors
    ///
    /// Returns `ExamRejection` for a second answer to the same question or
    /// when no exam is running.
    pub fn submit_answer(&mut self, selected: &str) -> Result<AnswerOutcome, ExamRejection> {
        let exam = self.exam.as_mut().ok_or(ExamRejection::NotInProgress)?;
        exam.submit_answer(selected).inspect_err(|rejection| {
            debug!("answer rejected: {rejection}");
        })
    }

    /// Move past the current question, finishing the exam after the last.
    ///
    /// # Errors
    ///
    /// Returns `ExamRejection::NotInProgress` when no exam is running.
    pub async fn advance_question(&mut self) -> Result<ExamStep, ExamRejection> {
        let exam = self.exam.as_mut().ok_or(ExamRejection::NotInProgress)?;
        let step = exam.advance()?;
        match &step {
            ExamStep::Question { .. } => self.emit_question(),
            ExamStep::Completed(results) => self.finish_exam(*results).await,
        }
        Ok(step)
    }

    async fn finish_exam(&mut self, results: ExamResults) {
        let Some(exam) = self.exam.take() else {
            return;
        };
        let section = exam.section();
        let debug_run = self.options.debug.is_active();

        if results.passed && !debug_run && self.progress.unlock_section(section + 1).await {
            info!("section {} unlocked", section + 1);
            self.emit_progress();
        }

        let record = ExamCompletionRecord {
            learner: if debug_run {
                DEBUG_LEARNER_NAME.to_owned()
            } else {
                self.learner_name.clone()
            },
            section,
            section_title: self
                .curriculum
                .section(section)
                .map(|s| s.title().to_owned())
                .unwrap_or_default(),
            results,
            completed_at: self.options.clock.now(),
            debug: debug_run,
        };
        info!(
            "exam finished for section {section}: {}/{} ({}%) passed={}",
            results.correct, results.total, results.percentage, results.passed
        );
        self.emit(SessionEvent::ExamCompleted(record));

        let (kind, message) = if results.passed {
            (
                NotificationKind::Success,
                format!("Exam passed with {}%.", results.percentage),
            )
        } else {
            (
                NotificationKind::Warning,
                format!(
                    "{}%: you need {}% to pass. Try again!",
                    results.percentage,
                    self.config.exam_passing_percentage()
                ),
            )
        };
        self.notify(kind, message);
    }

    // ─── PRONUNCIATION ───────────────────────────────────────────────────────

    /// Claim the recording slot for one phrase.
    ///
    /// # Errors
    ///
    /// Returns `PronunciationRejection::Busy` while another attempt is in
    /// flight and `UnknownPhrase` for indices outside the curriculum.
    pub fn start_pronunciation(
        &mut self,
        section: usize,
        phrase: usize,
    ) -> Result<AttemptTicket, PronunciationRejection> {
        if self
            .curriculum
            .section(section)
            .and_then(|s| s.phrase(phrase))
            .is_none()
        {
            return Err(PronunciationRejection::UnknownPhrase { section, phrase });
        }
        self.recording.begin(section, phrase).ok_or_else(|| {
            debug!("pronunciation attempt ignored: already recording");
            PronunciationRejection::Busy
        })
    }

    /// Apply the recognizer's answer for `ticket`.
    ///
    /// Results for a ticket that is no longer in flight (timed out, reset or
    /// superseded) are discarded.
    pub async fn complete_pronunciation(
        &mut self,
        ticket: AttemptTicket,
        result: Result<Recognition, RecognitionError>,
    ) -> PronunciationOutcome {
        if !self.recording.finish(ticket) {
            warn!("discarding late recognition result for attempt {}", ticket.id());
            return PronunciationOutcome::Stale;
        }

        let recognition = match result {
            Ok(recognition) => recognition,
            Err(err) => return self.fail_pronunciation(ticket, err),
        };
        let Some(phrase) = self
            .curriculum
            .section(ticket.section())
            .and_then(|s| s.phrase(ticket.phrase()))
        else {
            return PronunciationOutcome::Rejected(PronunciationRejection::UnknownPhrase {
                section: ticket.section(),
                phrase: ticket.phrase(),
            });
        };

        let score = PronunciationScoreService::evaluate(phrase, &recognition);
        self.scores
            .record(ticket.section(), ticket.phrase(), score)
            .await;

        let result = PronunciationResult {
            section: ticket.section(),
            phrase: ticket.phrase(),
            transcript: recognition.transcript,
            confidence: recognition.confidence,
            score,
            feedback: PronunciationFeedback::for_score(score, &self.config),
        };
        self.emit(SessionEvent::PronunciationResult(result.clone()));
        PronunciationOutcome::Scored(result)
    }

    /// End the attempt for `ticket` as timed out.
    pub fn expire_pronunciation(&mut self, ticket: AttemptTicket) -> PronunciationOutcome {
        if !self.recording.finish(ticket) {
            return PronunciationOutcome::Stale;
        }
        self.fail_pronunciation(
            ticket,
            RecognitionError::TimedOut(self.options.recognition_timeout),
        )
    }

    /// Run one full attempt against `recognizer`, bounded by the configured timeout.
    pub async fn attempt_pronunciation(
        &mut self,
        section: usize,
        phrase: usize,
        recognizer: &dyn SpeechRecognizer,
    ) -> PronunciationOutcome {
        let ticket = match self.start_pronunciation(section, phrase) {
            Ok(ticket) => ticket,
            Err(rejection) => return PronunciationOutcome::Rejected(rejection),
        };

        let timeout = self.options.recognition_timeout;
        let locale = self.options.locale.clone();
        match tokio::time::timeout(timeout, recognizer.recognize(&locale)).await {
            Ok(result) => self.complete_pronunciation(ticket, result).await,
            Err(_) => self.expire_pronunciation(ticket),
        }
    }

    fn fail_pronunciation(
        &self,
        ticket: AttemptTicket,
        error: RecognitionError,
    ) -> PronunciationOutcome {
        warn!(
            "pronunciation attempt {} failed for section {} phrase {}: {error}",
            ticket.id(),
            ticket.section(),
            ticket.phrase()
        );
        self.emit(SessionEvent::PronunciationFailed {
            section: ticket.section(),
            phrase: ticket.phrase(),
            error: error.clone(),
        });
        self.notify(
            NotificationKind::Warning,
            "Could not hear you clearly. Please try again.",
        );
        PronunciationOutcome::Failed(error)
    }

    // ─── EVENTS ──────────────────────────────────────────────────────────────

    fn emit(&self, event: SessionEvent) {
        self.observer.on_event(&event);
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        self.emit(SessionEvent::Notification {
            kind,
            message: message.into(),
        });
    }

    fn emit_progress(&self) {
        self.emit(SessionEvent::ProgressUpdated(self.progress.summary()));
    }

    fn emit_section_changed(&self) {
        self.emit(SessionEvent::SectionChanged {
            index: self.progress.current_section(),
            title: self.current_section().title().to_owned(),
        });
    }

    fn emit_question(&self) {
        let Some(exam) = self.exam.as_ref() else {
            return;
        };
        if let Some(question) = exam.current_question() {
            self.emit(SessionEvent::QuestionChanged {
                number: exam.current_index() + 1,
                total: exam.total_questions(),
                question: question.clone(),
            });
        }
    }
}

async fn resolve_learner_name(repo: &dyn LearnerRepository, options: &SessionOptions) -> String {
    if let Some(name) = options
        .learner_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        if let Err(err) = repo.save_learner_name(name).await {
            warn!("failed to save learner name: {err}");
        }
        return name.to_owned();
    }

    match repo.load_learner_name().await {
        Ok(Some(name)) => name,
        Ok(None) => DEFAULT_LEARNER_NAME.to_owned(),
        Err(err) => {
            warn!("failed to read learner name: {err}");
            DEFAULT_LEARNER_NAME.to_owned()
        }
    }
}

impl fmt::Debug for LearningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearningSession")
            .field("sections", &self.curriculum.len())
            .field("current_section", &self.progress.current_section())
            .field("learner_name", &self.learner_name)
            .field("exam_in_progress", &self.exam.is_some())
            .field("recording", &self.recording.is_recording())
            .field("debug", &self.options.debug)
            .finish_non_exhaustive()
    }
}
