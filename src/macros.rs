// SPDX-License-Identifier: Apache-2.0 OR MIT
// Call-site logging macros

/// Submit a formatted message to `logger` at `level`.
///
/// The source location is captured where the macro expands, and the
/// threshold is checked before the event (and the formatted string) is
/// constructed at all. Submit errors are reported on stderr instead of
/// propagating into caller code.
///
/// # Examples
/// ```ignore
/// log_at!(logger, Level::Warn, "queue depth {} over limit", depth);
/// ```
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if level >= logger.threshold() {
            let event = $crate::LogEvent::new(
                level,
                format!($($arg)+),
                $crate::SourceLocation::new(file!(), module_path!(), line!()),
            );
            if let Err(err) = logger.submit(event) {
                eprintln!("ringlog: {err}");
            }
        }
    }};
}

/// Log at DEBUG
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Debug, $($arg)+)
    };
}

/// Log at INFO
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Info, $($arg)+)
    };
}

/// Log at NOTICE
#[macro_export]
macro_rules! log_notice {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Notice, $($arg)+)
    };
}

/// Log at WARN
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Warn, $($arg)+)
    };
}

/// Log at ERROR
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Error, $($arg)+)
    };
}

/// Log at FATAL
#[macro_export]
macro_rules! log_fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Fatal, $($arg)+)
    };
}
