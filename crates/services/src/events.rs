use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tutor_core::exam::{ExamQuestion, ExamResults};
use tutor_core::pronunciation::PronunciationFeedback;

use crate::error::RecognitionError;
use crate::progress::ProgressSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Scored pronunciation attempt, as shown to the learner.
#[derive(Debug, Clone, PartialEq)]
pub struct PronunciationResult {
    pub section: usize,
    pub phrase: usize,
    pub transcript: String,
    pub confidence: f64,
    pub score: u8,
    pub feedback: PronunciationFeedback,
}

/// Record of a finished exam.
///
/// Debug runs carry the placeholder learner and `debug = true` and never
/// count as progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamCompletionRecord {
    pub learner: String,
    pub section: usize,
    pub section_title: String,
    pub results: ExamResults,
    pub completed_at: DateTime<Utc>,
    pub debug: bool,
}

/// State changes pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ProgressUpdated(ProgressSummary),
    SectionChanged {
        index: usize,
        title: String,
    },
    ExamStarted {
        section: usize,
        total_questions: usize,
    },
    QuestionChanged {
        number: usize,
        total: usize,
        question: ExamQuestion,
    },
    ExamCompleted(ExamCompletionRecord),
    PronunciationResult(PronunciationResult),
    PronunciationFailed {
        section: usize,
        phrase: usize,
        error: RecognitionError,
    },
    Notification {
        kind: NotificationKind,
        message: String,
    },
}

/// Single subscriber for session events.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_event(&self, _event: &SessionEvent) {}
}

/// Forwards events into a channel; a closed receiver is ignored.
impl SessionObserver for UnboundedSender<SessionEvent> {
    fn on_event(&self, event: &SessionEvent) {
        let _ = self.send(event.clone());
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<SessionEvent>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionObserver for EventLog {
    fn on_event(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_log_drains_in_order() {
        let log = EventLog::new();
        log.on_event(&SessionEvent::SectionChanged {
            index: 0,
            title: "A".into(),
        });
        log.on_event(&SessionEvent::Notification {
            kind: NotificationKind::Info,
            message: "hi".into(),
        });
        let events = log.take();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::SectionChanged { index: 0, .. }));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn channel_observer_forwards_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.on_event(&SessionEvent::ExamStarted {
            section: 1,
            total_questions: 8,
        });
        drop(tx);
        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::ExamStarted {
                section: 1,
                total_questions: 8
            })
        );
        assert_eq!(rx.recv().await, None);
    }
}
