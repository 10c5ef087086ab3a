// Console sink: rendered events to stdout or stderr

use super::Sink;
use crate::error::{Error, Result};
use crate::event::LogEvent;
use crate::format::{FormatSpec, Formatter};
use std::io::Write;

/// Which process stream the sink writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

impl ConsoleTarget {
    /// Parse a target name, `"stdout"` or `"stderr"`
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "stdout" => Ok(ConsoleTarget::Stdout),
            "stderr" => Ok(ConsoleTarget::Stderr),
            _ => Err(Error::InvalidArgument(
                "console target must be \"stdout\" or \"stderr\"",
            )),
        }
    }
}

/// Writes one line per event to the selected process stream.
///
/// The stream handle's own lock serializes concurrent appends.
pub struct ConsoleSink {
    target: ConsoleTarget,
    formatter: Formatter,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget, spec: FormatSpec) -> Self {
        Self {
            target,
            formatter: Formatter::new(spec),
        }
    }

    /// Sink writing to stdout with the default format
    pub fn stdout() -> Self {
        Self::new(ConsoleTarget::Stdout, FormatSpec::default())
    }

    /// Sink writing to stderr with the default format
    pub fn stderr() -> Self {
        Self::new(ConsoleTarget::Stderr, FormatSpec::default())
    }
}

impl Sink for ConsoleSink {
    fn append(&self, event: &LogEvent) -> Result<()> {
        let line = self.formatter.render(event);
        match self.target {
            ConsoleTarget::Stdout => {
                let mut handle = std::io::stdout().lock();
                writeln!(handle, "{line}")?;
            }
            ConsoleTarget::Stderr => {
                let mut handle = std::io::stderr().lock();
                writeln!(handle, "{line}")?;
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().lock().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().lock().flush()?,
        }
        Ok(())
    }
}
