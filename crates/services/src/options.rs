use std::time::Duration;

use tutor_core::Clock;
use url::form_urlencoded;

pub const DEFAULT_RECOGNITION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LOCALE: &str = "cs-CZ";
pub const DEFAULT_LEARNER_NAME: &str = "Learner";
/// Learner identity stamped on exam records produced under debug overrides.
pub const DEBUG_LEARNER_NAME: &str = "debug-user";
/// Question count used by `debug=1` when no explicit count is given.
pub const DEBUG_QUESTION_LIMIT: usize = 4;

/// Developer shortcuts, injected at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOverrides {
    pub exam_question_limit: Option<usize>,
    pub bypass_pronunciation_gate: bool,
}

impl DebugOverrides {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.exam_question_limit.is_some() || self.bypass_pronunciation_gate
    }

    /// Parse overrides from a query string such as `?debug=1&questions=6`.
    ///
    /// - `debug=1|true`: bypass the pronunciation gate and limit the exam to
    ///   `DEBUG_QUESTION_LIMIT` questions unless `questions` is given.
    /// - `questions=N`: limit the exam to N questions (N > 0).
    /// - `skipGate=1|true`: bypass the pronunciation gate only.
    ///
    /// Unknown keys and unparsable values are ignored.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let mut debug = false;
        let mut overrides = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "debug" => debug = is_truthy(&value),
                "questions" => {
                    overrides.exam_question_limit =
                        value.parse::<usize>().ok().filter(|&n| n > 0);
                }
                "skipGate" | "skip_gate" => {
                    overrides.bypass_pronunciation_gate |= is_truthy(&value);
                }
                _ => {}
            }
        }

        if debug {
            overrides.bypass_pronunciation_gate = true;
            overrides
                .exam_question_limit
                .get_or_insert(DEBUG_QUESTION_LIMIT);
        }
        overrides
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}

/// Construction-time settings for a learning session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub clock: Clock,
    /// Overrides the persisted learner name when set.
    pub learner_name: Option<String>,
    pub locale: String,
    pub recognition_timeout: Duration,
    pub debug: DebugOverrides,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            clock: Clock::system(),
            learner_name: None,
            locale: DEFAULT_LOCALE.to_owned(),
            recognition_timeout: DEFAULT_RECOGNITION_TIMEOUT,
            debug: DebugOverrides::default(),
        }
    }
}

impl SessionOptions {
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: DebugOverrides) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_recognition_timeout(mut self, timeout: Duration) -> Self {
        self.recognition_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_learner_name(mut self, name: impl Into<String>) -> Self {
        self.learner_name = Some(name.into());
        self
    }
}
