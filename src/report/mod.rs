//! Error-reporting sinks and JSON summaries of descriptor lists
//!
//! Decoding functions never print. They hand diagnostics to a [`Report`]
//! supplied by the caller, which decides where they go.

pub mod json;

use std::fmt;
use std::sync::Mutex;

/// Message severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Fatal,
    Severe,
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Fatal => "fatal",
            Severity::Severe => "severe",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Verbose => "verbose",
            Severity::Debug => "debug",
        };
        f.write_str(s)
    }
}

/// Injectable diagnostic sink.
///
/// Implementations must be shareable between threads: the same sink is
/// typically handed to every decoder of a table.
pub trait Report: Send + Sync {
    fn log(&self, severity: Severity, msg: &str);

    fn error(&self, msg: &str) {
        self.log(Severity::Error, msg);
    }

    fn warning(&self, msg: &str) {
        self.log(Severity::Warning, msg);
    }

    fn info(&self, msg: &str) {
        self.log(Severity::Info, msg);
    }

    fn debug(&self, msg: &str) {
        self.log(Severity::Debug, msg);
    }
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReport;

impl Report for LogReport {
    fn log(&self, severity: Severity, msg: &str) {
        match severity {
            Severity::Fatal | Severity::Severe | Severity::Error => log::error!("{msg}"),
            Severity::Warning => log::warn!("{msg}"),
            Severity::Info => log::info!("{msg}"),
            Severity::Verbose => log::debug!("{msg}"),
            Severity::Debug => log::trace!("{msg}"),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReport;

impl Report for NullReport {
    fn log(&self, _severity: Severity, _msg: &str) {}
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct CollectReport {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl CollectReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the messages received so far.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        match self.messages.lock() {
            Ok(m) => m.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of messages at `Error` level or worse.
    pub fn error_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|(sev, _)| *sev <= Severity::Error)
            .count()
    }

    /// Most severe level received, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.messages().iter().map(|(sev, _)| *sev).min()
    }
}

impl Report for CollectReport {
    fn log(&self, severity: Severity, msg: &str) {
        let mut guard = match self.messages.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((severity, msg.to_string()));
    }
}
