//! User-facing notices emitted by the upload workflow

use std::fmt;
use tracing::{error, info, warn};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Progress information
    Info,
    /// Operation completed
    Success,
    /// Caller action needed
    Warning,
    /// Operation failed
    Error,
}

/// One banner-style message for the person driving the upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Human-readable text
    pub message: String,
}

impl Notice {
    /// Notice with an explicit level
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Informational notice
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    /// Success notice
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    /// Whether this notice ends an operation
    pub fn is_terminal(&self) -> bool {
        self.level != NoticeLevel::Info
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Sink for notices. Implementations must not block.
pub trait Notifier: Send + Sync {
    /// Deliver one notice
    fn notify(&self, notice: Notice);
}

/// Routes notices into the tracing pipeline
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => info!(target: "dehug::notice", "{}", notice),
            NoticeLevel::Warning => warn!(target: "dehug::notice", "{}", notice),
            NoticeLevel::Error => error!(target: "dehug::notice", "{}", notice),
        }
    }
}
