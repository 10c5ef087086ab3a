// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Asynchronous process-local logging.
//!
//! Producer threads hand events to a [`Logger`] without blocking: submit
//! filters by level, pushes into a lock-free ring buffer and wakes the
//! logger's worker thread, which fans each event out to the registered
//! sinks (console, rolling file, remote stream). The [`registry`] owns
//! named loggers and a root logger that sink-less loggers fall back to.
//!
//! ```text
//!  producer threads              worker thread
//!    log_info!() ──▶ ring buffer ──▶ sinks
//! ```

#[macro_use]
mod macros;

mod config;
mod error;
mod event;
mod format;
mod level;
mod logger;
mod registry;
mod ring;
mod sink;

pub use config::{Config, ConfigError, SinkSpec};
pub use error::{Error, Result};
pub use event::{LogEvent, SourceLocation};
pub use format::{ComponentSpec, FormatSpec, Formatter};
pub use level::Level;
pub use logger::{Logger, DEFAULT_CAPACITY};
pub use registry::{get_logger, init, registry, Registry};
pub use ring::RingBuffer;
pub use sink::{ConsoleSink, ConsoleTarget, RemoteSink, RollingFileSink, Sink};
