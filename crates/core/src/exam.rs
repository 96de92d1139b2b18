//! Bidirectional multiple-choice exam over a single section.
//!
//! A session moves `InProgress → Completed`; the caller holds no session at
//! all while idle. Answers are accepted at most once per question.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{LanguageSlot, Section};

/// Upper bound on answer options per question, the correct one included.
pub const MAX_OPTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamDirection {
    SourceToTarget,
    TargetToSource,
}

impl ExamDirection {
    #[must_use]
    pub fn prompt_slot(self) -> LanguageSlot {
        match self {
            Self::SourceToTarget => LanguageSlot::Source,
            Self::TargetToSource => LanguageSlot::Target,
        }
    }

    #[must_use]
    pub fn answer_slot(self) -> LanguageSlot {
        match self {
            Self::SourceToTarget => LanguageSlot::Target,
            Self::TargetToSource => LanguageSlot::Source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub direction: ExamDirection,
    pub prompt: String,
    pub correct_answer: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_index: usize,
    pub selected: String,
    pub is_correct: bool,
}

/// Returned to the caller after an accepted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_answer: String,
    pub is_last_question: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResults {
    pub correct: usize,
    pub incorrect: usize,
    pub total: usize,
    pub percentage: u8,
    pub passed: bool,
    pub can_advance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamStatus {
    InProgress,
    Completed(ExamResults),
}

/// What `advance` moved the session to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamStep {
    Question { index: usize },
    Completed(ExamResults),
}

/// Expected refusals; the session is left untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamRejection {
    #[error("question {question_index} has already been answered")]
    AlreadyAnswered { question_index: usize },

    #[error("exam is already completed")]
    NotInProgress,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("section {section} has no phrases to examine")]
    EmptySection { section: usize },
}

/// Knobs fixed at exam start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamSettings {
    pub passing_percentage: u8,
    /// Keep only the first N shuffled questions.
    pub question_limit: Option<usize>,
    pub has_next_section: bool,
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    section: usize,
    questions: Vec<ExamQuestion>,
    current: usize,
    answers: Vec<SubmittedAnswer>,
    settings: ExamSettings,
    status: ExamStatus,
}

impl ExamSession {
    /// Build a shuffled question set for `section` and start on question 0.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptySection` when the section has no phrases or the
    /// question limit is zero.
    pub fn generate<R: Rng + ?Sized>(
        section_index: usize,
        section: &Section,
        settings: ExamSettings,
        rng: &mut R,
    ) -> Result<Self, ExamError> {
        let mut questions = generate_questions(section, rng);
        if let Some(limit) = settings.question_limit {
            questions.truncate(limit);
        }
        if questions.is_empty() {
            return Err(ExamError::EmptySection {
                section: section_index,
            });
        }

        Ok(Self {
            section: section_index,
            questions,
            current: 0,
            answers: Vec::new(),
            settings,
            status: ExamStatus::InProgress,
        })
    }

    #[must_use]
    pub fn section(&self) -> usize {
        self.section
    }

    #[must_use]
    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Current question while the exam is running.
    #[must_use]
    pub fn current_question(&self) -> Option<&ExamQuestion> {
        match self.status {
            ExamStatus::InProgress => self.questions.get(self.current),
            ExamStatus::Completed(_) => None,
        }
    }

    #[must_use]
    pub fn submitted_answers(&self) -> &[SubmittedAnswer] {
        &self.answers
    }

    #[must_use]
    pub fn status(&self) -> &ExamStatus {
        &self.status
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ExamStatus::Completed(_))
    }

    #[must_use]
    pub fn is_current_answered(&self) -> bool {
        self.answers.iter().any(|a| a.question_index == self.current)
    }

    /// Record an answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `ExamRejection::AlreadyAnswered` on a second submission for the
    /// same question and `ExamRejection::NotInProgress` after completion.
    pub fn submit_answer(&mut self, selected: &str) -> Result<AnswerOutcome, ExamRejection> {
        let question = match self.status {
            ExamStatus::InProgress => self
                .questions
                .get(self.current)
                .ok_or(ExamRejection::NotInProgress)?,
            ExamStatus::Completed(_) => return Err(ExamRejection::NotInProgress),
        };
        if self.is_current_answered() {
            return Err(ExamRejection::AlreadyAnswered {
                question_index: self.current,
            });
        }

        let is_correct = selected == question.correct_answer;
        let correct_answer = question.correct_answer.clone();
        self.answers.push(SubmittedAnswer {
            question_index: self.current,
            selected: selected.to_owned(),
            is_correct,
        });

        Ok(AnswerOutcome {
            is_correct,
            correct_answer,
            is_last_question: self.current + 1 >= self.questions.len(),
        })
    }

    /// Move to the next question, completing the exam after the last one.
    ///
    /// Unanswered questions count as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `ExamRejection::NotInProgress` once the exam is completed.
    pub fn advance(&mut self) -> Result<ExamStep, ExamRejection> {
        if self.is_completed() {
            return Err(ExamRejection::NotInProgress);
        }

        self.current += 1;
        if self.current < self.questions.len() {
            return Ok(ExamStep::Question {
                index: self.current,
            });
        }

        let results = self.results();
        self.status = ExamStatus::Completed(results);
        Ok(ExamStep::Completed(results))
    }

    fn results(&self) -> ExamResults {
        let total = self.questions.len();
        let correct = self.answers.iter().filter(|a| a.is_correct).count();
        let percentage = percentage(correct, total);
        let passed = percentage >= self.settings.passing_percentage;
        ExamResults {
            correct,
            incorrect: total - correct,
            total,
            percentage,
            passed,
            can_advance: passed && self.settings.has_next_section,
        }
    }
}

/// `round(100 * part / total)` with halves rounded up; 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let part = part.min(total);
    ((200 * part + total) / (2 * total)) as u8
}

fn generate_questions<R: Rng + ?Sized>(section: &Section, rng: &mut R) -> Vec<ExamQuestion> {
    let mut questions = Vec::with_capacity(section.len() * 2);
    for direction in [ExamDirection::SourceToTarget, ExamDirection::TargetToSource] {
        for phrase in section.phrases() {
            let correct = phrase.text(direction.answer_slot());
            questions.push(ExamQuestion {
                direction,
                prompt: phrase.text(direction.prompt_slot()).to_owned(),
                correct_answer: correct.to_owned(),
                options: build_options(section, direction.answer_slot(), correct, rng),
            });
        }
    }
    questions.shuffle(rng);
    questions
}

/// Correct answer plus up to three distinct distractors from the same slot.
///
/// Small sections yield fewer than four options; they are not padded.
fn build_options<R: Rng + ?Sized>(
    section: &Section,
    slot: LanguageSlot,
    correct: &str,
    rng: &mut R,
) -> Vec<String> {
    let mut distractors: Vec<&str> = Vec::new();
    for phrase in section.phrases() {
        let value = phrase.text(slot);
        if value != correct && !distractors.contains(&value) {
            distractors.push(value);
        }
    }
    distractors.shuffle(rng);
    distractors.truncate(MAX_OPTIONS - 1);

    let mut options: Vec<String> = distractors.into_iter().map(str::to_owned).collect();
    options.push(correct.to_owned());
    options.shuffle(rng);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Phrase;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn section(pairs: &[(&str, &str)]) -> Section {
        Section::new(
            "Test",
            pairs
                .iter()
                .map(|(s, t)| Phrase::new(*s, *t, "", None).unwrap())
                .collect(),
        )
    }

    fn settings(has_next_section: bool) -> ExamSettings {
        ExamSettings {
            passing_percentage: 90,
            question_limit: None,
            has_next_section,
        }
    }

    fn answer_all(session: &mut ExamSession, correct: bool) -> ExamResults {
        loop {
            let question = session.current_question().unwrap().clone();
            let choice = if correct {
                question.correct_answer.clone()
            } else {
                format!("not {}", question.correct_answer)
            };
            session.submit_answer(&choice).unwrap();
            if let ExamStep::Completed(results) = session.advance().unwrap() {
                return results;
            }
        }
    }

    #[test]
    fn two_phrase_section_yields_four_questions_and_perfect_pass() {
        let mut rng = StdRng::seed_from_u64(1);
        let section = section(&[("Hola", "Ahoj"), ("Adiós", "Nashledanou")]);
        let mut session = ExamSession::generate(0, &section, settings(true), &mut rng).unwrap();

        assert_eq!(session.total_questions(), 4);
        let s2t = session
            .questions()
            .iter()
            .filter(|q| q.direction == ExamDirection::SourceToTarget)
            .count();
        assert_eq!(s2t, 2);

        let results = answer_all(&mut session, true);
        assert_eq!(results.percentage, 100);
        assert!(results.passed);
        assert!(results.can_advance);
        assert_eq!(results.incorrect, 0);
        assert!(session.is_completed());
        assert!(session.current_question().is_none());
    }

    #[test]
    fn options_contain_correct_answer_exactly_once() {
        let mut rng = StdRng::seed_from_u64(42);
        let section = section(&[
            ("uno", "jedna"),
            ("dos", "dva"),
            ("tres", "tři"),
            ("cuatro", "čtyři"),
            ("cinco", "pět"),
            ("seis", "šest"),
            ("otro dos", "dva"),
        ]);
        let session = ExamSession::generate(0, &section, settings(false), &mut rng).unwrap();
        assert_eq!(session.total_questions(), 14);

        for question in session.questions() {
            assert!(question.options.len() <= MAX_OPTIONS);
            let hits = question
                .options
                .iter()
                .filter(|o| **o == question.correct_answer)
                .count();
            assert_eq!(hits, 1, "{question:?}");
            let mut unique = question.options.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), question.options.len());
        }
        assert!(session.questions().iter().all(|q| q.options.len() == MAX_OPTIONS));
    }

    #[test]
    fn small_section_keeps_partial_option_set() {
        let mut rng = StdRng::seed_from_u64(3);
        let section = section(&[("Sí", "Ano"), ("No", "Ne")]);
        let session = ExamSession::generate(0, &section, settings(false), &mut rng).unwrap();
        assert!(session.questions().iter().all(|q| q.options.len() == 2));

        let single = self::section(&[("Sí", "Ano")]);
        let session = ExamSession::generate(0, &single, settings(false), &mut rng).unwrap();
        assert!(
            session
                .questions()
                .iter()
                .all(|q| q.options == vec![q.correct_answer.clone()])
        );
    }

    #[test]
    fn second_submission_is_rejected_without_change() {
        let mut rng = StdRng::seed_from_u64(5);
        let section = section(&[("Hola", "Ahoj"), ("Adiós", "Nashledanou")]);
        let mut session = ExamSession::generate(0, &section, settings(true), &mut rng).unwrap();

        let correct = session.current_question().unwrap().correct_answer.clone();
        let first = session.submit_answer(&correct).unwrap();
        assert!(first.is_correct);
        assert!(!first.is_last_question);

        let err = session.submit_answer("anything").unwrap_err();
        assert_eq!(err, ExamRejection::AlreadyAnswered { question_index: 0 });
        assert_eq!(session.submitted_answers().len(), 1);
        assert!(session.submitted_answers()[0].is_correct);
    }

    #[test]
    fn failing_and_last_section_results() {
        let mut rng = StdRng::seed_from_u64(9);
        let section = section(&[("Hola", "Ahoj"), ("Adiós", "Nashledanou")]);

        let mut session = ExamSession::generate(0, &section, settings(true), &mut rng).unwrap();
        let results = answer_all(&mut session, false);
        assert_eq!(results.correct, 0);
        assert_eq!(results.incorrect, 4);
        assert!(!results.passed);
        assert!(!results.can_advance);

        let mut last = ExamSession::generate(3, &section, settings(false), &mut rng).unwrap();
        let results = answer_all(&mut last, true);
        assert!(results.passed);
        assert!(!results.can_advance);
    }

    #[test]
    fn skipped_questions_count_as_incorrect_and_completion_is_final() {
        let mut rng = StdRng::seed_from_u64(11);
        let section = section(&[("Hola", "Ahoj")]);
        let mut session = ExamSession::generate(0, &section, settings(true), &mut rng).unwrap();
        assert_eq!(session.advance().unwrap(), ExamStep::Question { index: 1 });
        let ExamStep::Completed(results) = session.advance().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(results.total, 2);
        assert_eq!(results.incorrect, 2);
        assert_eq!(session.advance().unwrap_err(), ExamRejection::NotInProgress);
        assert_eq!(
            session.submit_answer("Ahoj").unwrap_err(),
            ExamRejection::NotInProgress
        );
    }

    #[test]
    fn question_limit_truncates_and_empty_section_fails() {
        let mut rng = StdRng::seed_from_u64(13);
        let section = section(&[("a", "b"), ("c", "d"), ("e", "f")]);
        let limited = ExamSettings {
            question_limit: Some(2),
            ..settings(true)
        };
        let session = ExamSession::generate(0, &section, limited, &mut rng).unwrap();
        assert_eq!(session.total_questions(), 2);

        let empty = Section::new("Empty", Vec::new());
        let err = ExamSession::generate(4, &empty, settings(true), &mut rng).unwrap_err();
        assert_eq!(err, ExamError::EmptySection { section: 4 });
    }

    #[test]
    fn same_seed_gives_same_exam() {
        let section = section(&[("a", "b"), ("c", "d"), ("e", "f"), ("g", "h"), ("i", "j")]);
        let first =
            ExamSession::generate(0, &section, settings(true), &mut StdRng::seed_from_u64(77))
                .unwrap();
        let second =
            ExamSession::generate(0, &section, settings(true), &mut StdRng::seed_from_u64(77))
                .unwrap();
        assert_eq!(first.questions(), second.questions());
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(9, 10), 90);
        assert_eq!(percentage(17, 19), 89);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }
}
