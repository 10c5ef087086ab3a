// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log event record, captured at the producer call site

use crate::level::Level;
use chrono::{DateTime, Local};

/// Call site of a log statement.
///
/// Captured where the logging macro expands, not inside the event
/// constructor, so the reported position is the user's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    file: &'static str,
    module: &'static str,
    line: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, module: &'static str, line: u32) -> Self {
        Self { file, module, line }
    }

    pub const fn file(&self) -> &'static str {
        self.file
    }

    pub const fn module(&self) -> &'static str {
        self.module
    }

    pub const fn line(&self) -> u32 {
        self.line
    }
}

/// One log occurrence. Immutable after construction.
///
/// Ownership follows the pipeline: producer, then ring buffer, then the
/// worker, which shares it read-only with each sink during dispatch.
#[derive(Debug, Clone)]
pub struct LogEvent {
    level: Level,
    message: String,
    location: SourceLocation,
    timestamp: DateTime<Local>,
    thread_id: u64,
}

impl LogEvent {
    /// Build an event. The timestamp is taken here, before the event is
    /// enqueued, so queued events keep real emission order under backlog.
    pub fn new(level: Level, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            level,
            message: message.into(),
            location,
            timestamp: Local::now(),
            thread_id: current_thread_id(),
        }
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Upper-case level name
    pub fn formatted_level(&self) -> &'static str {
        self.level.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Wall-clock moment of emission, in the local zone
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// OS-level id of the producing thread
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }
}

/// Get the OS thread id, cached in thread-local storage so repeat cost is a
/// TLS read.
pub(crate) fn current_thread_id() -> u64 {
    thread_local! {
        static TID: u64 = os_thread_id();
    }
    TID.with(|tid| *tid)
}

#[cfg(target_os = "linux")]
fn os_thread_id() -> u64 {
    unsafe { libc::gettid() as u64 }
}

#[cfg(not(target_os = "linux"))]
fn os_thread_id() -> u64 {
    // No portable numeric id; hash the opaque ThreadId instead
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}
