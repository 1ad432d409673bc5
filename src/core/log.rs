//! Purpose: Per-instance log context with a verbosity stack, forwarding to `tracing`.
//! Exports: `LogVerbosity`, `Log`, `set_default_verbosity`, `default_verbosity`.
//! Role: Explicit context object threaded through collections and loader instances.
//! Invariants: The default verbosity is set at most once per process.
//! Invariants: A verbosity stack is never empty; popping the last entry restores the default.
//! Invariants: `silent` entries are never emitted.

use std::sync::OnceLock;

use crate::core::enumeration::{Extensible, known_values};
use crate::core::error::{Error, ErrorKind};

known_values! {
    pub enum LogVerbosity: "LogVerbosity" {
        Silent => "silent",
        Fatal => "fatal",
        Error => "error",
        Warning => "warning",
        Information => "information",
        Debug => "debug",
    }
}

impl LogVerbosity {
    fn rank(self) -> u8 {
        match self {
            Self::Silent => 0,
            Self::Fatal => 1,
            Self::Error => 2,
            Self::Warning => 3,
            Self::Information => 4,
            Self::Debug => 5,
        }
    }

    /// Whether an entry at `self` passes a stack whose top is `limit`.
    pub fn passes(self, limit: LogVerbosity) -> bool {
        self != Self::Silent && self.rank() <= limit.rank()
    }
}

static DEFAULT_VERBOSITY: OnceLock<LogVerbosity> = OnceLock::new();

pub fn set_default_verbosity(verbosity: LogVerbosity) -> Result<(), Error> {
    DEFAULT_VERBOSITY.set(verbosity).map_err(|_| {
        Error::new(ErrorKind::Misuse).with_message("default log verbosity is already set")
    })
}

pub fn default_verbosity() -> LogVerbosity {
    DEFAULT_VERBOSITY
        .get()
        .copied()
        .unwrap_or(LogVerbosity::Information)
}

#[derive(Clone, Debug)]
pub struct Log {
    id: String,
    verbosity: Vec<LogVerbosity>,
}

impl Log {
    pub fn new(id: &str) -> Self {
        Self {
            id: sanitize_id(id),
            verbosity: vec![default_verbosity()],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: &str) {
        let sanitized = sanitize_id(id);
        self.entry(
            LogVerbosity::Information,
            &format!("Log object renamed, ID '{}' -> '{sanitized}'.", self.id),
        );
        self.id = sanitized;
    }

    pub fn verbosity(&self) -> LogVerbosity {
        self.verbosity
            .last()
            .copied()
            .unwrap_or_else(default_verbosity)
    }

    /// Push a verbosity; an unknown value re-pushes the current one.
    pub fn push_verbosity(&mut self, verbosity: Extensible<LogVerbosity>) {
        let current = self.verbosity();
        let pushed = verbosity.known().unwrap_or(current);
        self.entry(
            LogVerbosity::Information,
            &format!("Log verbosity '{pushed}' pushed (on top of {current})."),
        );
        self.verbosity.push(pushed);
    }

    pub fn pop_verbosity(&mut self) {
        let popped = self.verbosity();
        self.verbosity.pop();
        if self.verbosity.is_empty() {
            self.verbosity.push(default_verbosity());
        }
        self.entry(
            LogVerbosity::Information,
            &format!(
                "Log verbosity '{popped}' popped, revealing '{}'.",
                self.verbosity()
            ),
        );
    }

    pub fn entry(&self, verbosity: LogVerbosity, message: &str) {
        if !verbosity.passes(self.verbosity()) {
            return;
        }
        let log_id = self.id.as_str();
        match verbosity {
            LogVerbosity::Silent => {}
            LogVerbosity::Fatal | LogVerbosity::Error => {
                tracing::error!(log_id, fatal = verbosity == LogVerbosity::Fatal, "{message}")
            }
            LogVerbosity::Warning => tracing::warn!(log_id, "{message}"),
            LogVerbosity::Information => tracing::info!(log_id, "{message}"),
            LogVerbosity::Debug => tracing::debug!(log_id, "{message}"),
        }
    }

    pub fn error(&self, message: &str) {
        self.entry(LogVerbosity::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.entry(LogVerbosity::Warning, message);
    }

    pub fn debug(&self, message: &str) {
        self.entry(LogVerbosity::Debug, message);
    }

    /// Log `err` at error verbosity and hand it back for propagation.
    pub(crate) fn fail(&self, err: Error) -> Error {
        self.error(&err.to_string());
        err
    }
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}
