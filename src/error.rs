// SPDX-License-Identifier: Apache-2.0 OR MIT
// Error kinds surfaced by the logging pipeline

use thiserror::Error;

/// Errors surfaced to callers of the logging pipeline.
///
/// Hot-path losses (level filtering, ring-buffer overflow) are not errors;
/// they are silent drops by design of the submission contract.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("ring buffer capacity {0} does not fit in the address space")]
    InvalidCapacity(usize),

    #[error("sink is already registered with this logger")]
    DuplicateSink,

    #[error("sink is not registered with this logger")]
    UnknownSink,

    #[error("logger `{0}` has no sinks and no root logger")]
    NoDestination(String),

    #[error("logger `{0}` already has a root logger")]
    RootAlreadySet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote sink: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_logger() {
        let err = Error::NoDestination("child".to_string());
        assert!(err.to_string().contains("child"));

        let err = Error::RootAlreadySet("child".to_string());
        assert!(err.to_string().contains("child"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
