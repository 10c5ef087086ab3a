// Sink contract the logger pipeline dispatches to

mod console;
mod file;
mod remote;

pub use console::{ConsoleSink, ConsoleTarget};
pub use file::RollingFileSink;
pub use remote::RemoteSink;

use crate::error::Result;
use crate::event::LogEvent;
use std::sync::Arc;

/// Destination for rendered events.
///
/// `append` may be invoked by the logger worker and by caller-driven
/// flushes concurrently; implementations serialize internally. Errors are
/// caught by the worker and reported on the fallback stream, never
/// propagated back to producers.
pub trait Sink: Send + Sync {
    /// Render the event and write it to the sink's target. May buffer.
    fn append(&self, event: &LogEvent) -> Result<()>;

    /// Force any buffered content out to the target.
    fn flush(&self) -> Result<()>;
}

/// Sinks are compared by identity, not by contents. Two handles to the same
/// allocation are the same sink; equal configuration is not.
pub(crate) fn same_sink(a: &Arc<dyn Sink>, b: &Arc<dyn Sink>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
