//! User-facing notifications.
//!
//! A [`Notifier`] is built once at startup with [`Notifier::setup`] and handed
//! to whatever needs to surface messages; there is no global instance.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DISPLAY_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub content: String,
    pub duration: Duration,
    pub keep_alive_on_hover: bool,
}

/// Where notifications end up (terminal, desktop, test buffer, ...).
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: Notification);
}

/// Sink that logs notifications through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn show(&self, n: Notification) {
        match n.level {
            Level::Error => tracing::error!(title = %n.title, "{}", n.content),
            Level::Warning => tracing::warn!(title = %n.title, "{}", n.content),
            Level::Info | Level::Success => tracing::info!(kind = %n.level, title = %n.title, "{}", n.content),
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn setup(sink: impl NotificationSink + 'static) -> Self {
        Self { sink: Arc::new(sink) }
    }

    pub fn send(&self, title: impl Into<String>, content: impl Into<String>, level: Level) {
        self.sink.show(Notification {
            level,
            title: title.into(),
            content: content.into(),
            duration: DISPLAY_DURATION,
            keep_alive_on_hover: true,
        });
    }

    pub fn info(&self, title: impl Into<String>, content: impl Into<String>) {
        self.send(title, content, Level::Info)
    }

    pub fn success(&self, title: impl Into<String>, content: impl Into<String>) {
        self.send(title, content, Level::Success)
    }

    pub fn warning(&self, title: impl Into<String>, content: impl Into<String>) {
        self.send(title, content, Level::Warning)
    }

    pub fn error(&self, title: impl Into<String>, content: impl Into<String>) {
        self.send(title, content, Level::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl NotificationSink for Arc<Recorder> {
        fn show(&self, n: Notification) {
            self.0.lock().unwrap().push(n);
        }
    }

    #[test]
    fn shortcuts_set_level_and_display_options() {
        let rec = Arc::new(Recorder::default());
        let notify = Notifier::setup(rec.clone());

        notify.success("Saved", "conversation created");
        notify.clone().error("Chat", "stream failed");

        let seen = rec.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].level, Level::Success);
        assert_eq!(seen[0].title, "Saved");
        assert_eq!(seen[1].level, Level::Error);
        assert!(seen.iter().all(|n| n.keep_alive_on_hover && n.duration == Duration::from_secs(5)));
    }
}
