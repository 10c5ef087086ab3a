// Remote stream sink: pushes rendered events to an HTTP ingestion endpoint
//
// A dedicated thread owns the tokio runtime and the HTTP client; `append`
// only serializes the event and hands it over a channel, so the logger
// worker never waits on the network.

use super::Sink;
use crate::error::{Error, Result};
use crate::event::LogEvent;
use std::sync::atomic::{AtomicIsize, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const DEFAULT_MAX_QUEUE: isize = 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Streams events to a remote collector as JSON over HTTP POST.
///
/// Delivery is best effort: events beyond the queue bound are dropped and
/// counted, and failed posts are reported on the fallback stream.
pub struct RemoteSink {
    sender: Mutex<Option<Sender<String>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    queue_len: Arc<AtomicIsize>,
    max_queue: isize,
    dropped: AtomicU64,
}

impl RemoteSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_max_queue(url, DEFAULT_MAX_QUEUE)
    }

    /// Bound the number of events waiting for the network.
    pub fn with_max_queue(url: impl Into<String>, max_queue: isize) -> Self {
        let url = url.into();
        let (sender, receiver) = std::sync::mpsc::channel::<String>();
        let queue_len = Arc::new(AtomicIsize::new(0));
        let thread_queue = Arc::clone(&queue_len);
        let thread = std::thread::Builder::new()
            .name("ringlog-remote".to_string())
            .spawn(move || stream_thread(url, receiver, thread_queue))
            .ok();
        if thread.is_none() {
            eprintln!("ringlog: failed to spawn remote sink thread");
        }

        Self {
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(thread),
            queue_len,
            max_queue,
            dropped: AtomicU64::new(0),
        }
    }

    /// Events discarded because the outbound queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Sink for RemoteSink {
    fn append(&self, event: &LogEvent) -> Result<()> {
        if self.queue_len.load(Ordering::Relaxed) >= self.max_queue {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let location = event.location();
        let payload = serde_json::json!({
            "level": event.formatted_level(),
            "timestamp": event.timestamp().to_rfc3339(),
            "thread_id": event.thread_id(),
            "file": location.file(),
            "module": location.module(),
            "line": location.line(),
            "message": event.message(),
        })
        .to_string();

        let guard = self.sender.lock().unwrap();
        match guard.as_ref() {
            Some(sender) => {
                self.queue_len.fetch_add(1, Ordering::Relaxed);
                if sender.send(payload).is_err() {
                    self.queue_len.fetch_sub(1, Ordering::Relaxed);
                    return Err(Error::Remote("stream thread is gone".to_string()));
                }
                Ok(())
            }
            None => Err(Error::Remote("sink is shut down".to_string())),
        }
    }

    fn flush(&self) -> Result<()> {
        // Wait for the background thread to drain what was handed over,
        // bounded so a dead endpoint cannot wedge the caller.
        let deadline = Instant::now() + FLUSH_TIMEOUT;
        while self.queue_len.load(Ordering::Relaxed) > 0 && Instant::now() < deadline {
            std::thread::yield_now();
        }
        Ok(())
    }
}

impl Drop for RemoteSink {
    fn drop(&mut self) {
        // Disconnect the channel so the thread's recv loop ends
        *self.sender.lock().unwrap() = None;
        if let Some(handle) = self.thread.lock().unwrap().take() {
            if handle.join().is_err() {
                eprintln!("ringlog: remote sink thread panicked");
            }
        }
    }
}

fn stream_thread(url: String, receiver: Receiver<String>, queue_len: Arc<AtomicIsize>) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ringlog: remote sink runtime failed: {err}");
            return;
        }
    };

    runtime.block_on(async move {
        let client = match reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                eprintln!("ringlog: remote sink client failed: {err}");
                return;
            }
        };

        // recv fails only when every sender is gone: shutdown
        while let Ok(payload) = receiver.recv() {
            let request = client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
            if let Err(err) = request.send().await {
                eprintln!("ringlog: remote sink post failed: {err}");
            }
            queue_len.fetch_sub(1, Ordering::Relaxed);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Level, SourceLocation};

    fn event() -> LogEvent {
        LogEvent::new(
            Level::Error,
            "remote smoke test",
            SourceLocation::new("remote.rs", "tests", 9),
        )
    }

    #[test]
    fn test_append_enqueues_and_drains_without_server() {
        // Nothing listens on the discard port; posts fail fast and the
        // queue still drains.
        let sink = RemoteSink::new("http://127.0.0.1:9/ingest");
        sink.append(&event()).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_queue_bound_drops_beyond_limit() {
        let sink = RemoteSink::with_max_queue("http://127.0.0.1:9/ingest", 0);
        sink.append(&event()).unwrap();
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn test_drop_joins_cleanly() {
        let sink = RemoteSink::new("http://127.0.0.1:9/ingest");
        sink.append(&event()).unwrap();
        drop(sink);
    }
}
