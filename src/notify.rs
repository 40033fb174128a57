//! User-facing notifications.
//!
//! Notifications are fire-and-forget: the sink never looks at what happens to
//! a message after handing it over.

use std::collections::HashSet;

use tracing::{error, info, warn};

/// How loudly a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Show this message at most once per session.
    pub once: bool,
}

/// Delivers messages to the user.
pub trait Notifier {
    fn notify(&mut self, message: &str, severity: Severity, options: NotifyOptions);
}

/// Notifier that routes messages into the tracing subscriber.
///
/// Used by the binary, where stderr is the only place to show anything.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, message: &str, severity: Severity, _options: NotifyOptions) {
        match severity {
            Severity::Info => info!("{message}"),
            Severity::Warn => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}

/// Wraps a notifier and enforces `once` on this side of the boundary.
///
/// The host may or may not honour the `once` flag; the sink must not spam
/// identical errors either way.
#[derive(Debug)]
pub struct Reporter<N> {
    inner: N,
    shown_once: HashSet<String>,
}

impl<N: Notifier> Reporter<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            shown_once: HashSet::new(),
        }
    }

    pub fn error(&mut self, message: &str) {
        self.inner
            .notify(message, Severity::Error, NotifyOptions::default());
    }

    pub fn info(&mut self, message: &str) {
        self.inner
            .notify(message, Severity::Info, NotifyOptions::default());
    }

    /// Report an error unless the same message was already reported once.
    pub fn error_once(&mut self, message: &str) {
        if !self.shown_once.insert(message.to_string()) {
            return;
        }
        self.inner
            .notify(message, Severity::Error, NotifyOptions { once: true });
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

/// Notifier that keeps every message for later inspection.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub messages: Vec<(String, Severity, NotifyOptions)>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn errors(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(_, s, _)| *s == Severity::Error)
            .map(|(m, _, _)| m.as_str())
            .collect()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &str, severity: Severity, options: NotifyOptions) {
        self.messages.push((message.to_string(), severity, options));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_once_suppresses_repeats() {
        let mut reporter = Reporter::new(RecordingNotifier::default());

        reporter.error_once("cursor failed");
        reporter.error_once("cursor failed");
        reporter.error_once("something else");

        assert_eq!(
            reporter.inner().errors(),
            vec!["cursor failed", "something else"]
        );
        assert!(reporter.inner().messages.iter().all(|(_, _, o)| o.once));
    }

    #[test]
    fn plain_errors_are_never_suppressed() {
        let mut reporter = Reporter::new(RecordingNotifier::default());

        reporter.error("write failed");
        reporter.error("write failed");

        assert_eq!(reporter.inner().errors().len(), 2);
    }
}
