use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecognitionError;

/// Single best hypothesis for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub transcript: String,
    /// Recognizer confidence in `[0, 1]`.
    pub confidence: f64,
}

/// One-shot speech recognition boundary.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen once for the given locale tag (e.g. `cs-CZ`).
    ///
    /// # Errors
    ///
    /// Returns `RecognitionError` when no transcript can be produced.
    async fn recognize(&self, locale: &str) -> Result<Recognition, RecognitionError>;
}

/// Identifies one in-flight pronunciation attempt.
///
/// Results are only applied when they carry the ticket of the attempt that is
/// still in flight; anything else arrived too late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptTicket {
    id: u64,
    section: usize,
    phrase: usize,
}

impl AttemptTicket {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn section(&self) -> usize {
        self.section
    }

    #[must_use]
    pub fn phrase(&self) -> usize {
        self.phrase
    }
}

/// The recording flag plus the ticket it guards.
#[derive(Debug, Default)]
pub(crate) struct RecordingSlot {
    in_flight: Option<AttemptTicket>,
    issued: u64,
}

impl RecordingSlot {
    pub(crate) fn is_recording(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Issue a ticket unless an attempt is already running.
    pub(crate) fn begin(&mut self, section: usize, phrase: usize) -> Option<AttemptTicket> {
        if self.is_recording() {
            return None;
        }
        self.issued += 1;
        let ticket = AttemptTicket {
            id: self.issued,
            section,
            phrase,
        };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Close the attempt if `ticket` is the one in flight.
    pub(crate) fn finish(&mut self, ticket: AttemptTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn cancel(&mut self) -> Option<AttemptTicket> {
        self.in_flight.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_attempt_in_flight() {
        let mut slot = RecordingSlot::default();
        let ticket = slot.begin(0, 1).unwrap();
        assert!(slot.is_recording());
        assert!(slot.begin(0, 2).is_none());

        assert!(slot.finish(ticket));
        assert!(!slot.is_recording());
        assert!(slot.begin(0, 2).is_some());
    }

    #[test]
    fn late_ticket_cannot_close_a_newer_attempt() {
        let mut slot = RecordingSlot::default();
        let first = slot.begin(0, 0).unwrap();
        assert!(slot.finish(first));
        let second = slot.begin(0, 0).unwrap();

        assert_ne!(first, second);
        assert!(!slot.finish(first));
        assert!(slot.is_recording());
        assert!(slot.finish(second));
    }

    #[test]
    fn cancel_drops_the_in_flight_ticket() {
        let mut slot = RecordingSlot::default();
        let ticket = slot.begin(2, 3).unwrap();
        assert_eq!(slot.cancel(), Some(ticket));
        assert!(!slot.finish(ticket));
    }
}
