use std::io::Write as _;

use async_trait::async_trait;
use services::{
    NotificationKind, Recognition, RecognitionError, SessionEvent, SessionObserver,
    SpeechRecognizer,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tutor_core::pronunciation::PronunciationFeedback;

/// Line-oriented terminal input shared by prompts and the typed recognizer.
pub struct Console {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Print `prompt` and read one trimmed line. `None` on end of input.
    pub async fn read_line(&self, prompt: &str) -> std::io::Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        let mut lines = self.lines.lock().await;
        Ok(lines.next_line().await?.map(|line| line.trim().to_owned()))
    }
}

/// Stands in for a microphone: the learner types what they said.
#[async_trait]
impl SpeechRecognizer for Console {
    async fn recognize(&self, locale: &str) -> Result<Recognition, RecognitionError> {
        let line = self
            .read_line(&format!("  [{locale}] say it> "))
            .await
            .map_err(|err| RecognitionError::Recognizer(err.to_string()))?;
        match line {
            Some(transcript) if !transcript.is_empty() => Ok(Recognition {
                transcript,
                confidence: 1.0,
            }),
            _ => Err(RecognitionError::NoSpeech),
        }
    }
}

/// Prints session events to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::ProgressUpdated(summary) => println!(
                "Progress: {}/{} sections completed ({}%)",
                summary.completed_sections, summary.total_sections, summary.progress_percentage
            ),
            SessionEvent::SectionChanged { index, title } => {
                println!("== Section {}: {title} ==", index + 1);
            }
            SessionEvent::ExamStarted {
                total_questions, ..
            } => println!("Exam started: {total_questions} questions."),
            SessionEvent::QuestionChanged {
                number,
                total,
                question,
            } => {
                println!();
                println!("Question {number}/{total}: {}", question.prompt);
                for (i, option) in question.options.iter().enumerate() {
                    println!("  {}) {option}", i + 1);
                }
            }
            SessionEvent::ExamCompleted(record) => println!(
                "{}: {} correct, {} incorrect ({}%)",
                record.section_title,
                record.results.correct,
                record.results.incorrect,
                record.results.percentage
            ),
            SessionEvent::PronunciationResult(result) => {
                let label = match result.feedback {
                    PronunciationFeedback::Excellent => "excellent",
                    PronunciationFeedback::Good => "good",
                    PronunciationFeedback::NeedsPractice => "needs practice",
                };
                println!("  heard \"{}\": {}% ({label})", result.transcript, result.score);
            }
            SessionEvent::PronunciationFailed { error, .. } => println!("  {error}"),
            SessionEvent::Notification { kind, message } => {
                let tag = match kind {
                    NotificationKind::Info => "info",
                    NotificationKind::Success => "ok",
                    NotificationKind::Warning => "warn",
                    NotificationKind::Error => "error",
                };
                println!("[{tag}] {message}");
            }
        }
    }
}
