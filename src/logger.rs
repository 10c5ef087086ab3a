// Asynchronous logger: filter, enqueue, worker, ordered dispatch
//
// The submit fast path is two atomic loads, one shared-lock acquisition,
// one ring-buffer CAS and a condvar notify. Producers never wait on a sink
// and never wait on a full buffer; overflow is a counted drop.

use crate::error::{Error, Result};
use crate::event::LogEvent;
use crate::level::Level;
use crate::ring::RingBuffer;
use crate::sink::{same_sink, Sink};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, Once, RwLock, Weak};
use std::thread::JoinHandle;

/// Ring slots per logger unless configured otherwise
pub const DEFAULT_CAPACITY: usize = 256;

/// Where a logger's events can go: its own sinks, or the root logger used
/// as a fallback only while the sink list is empty.
#[derive(Default)]
struct Destinations {
    sinks: Vec<Arc<dyn Sink>>,
    root: Option<Arc<Logger>>,
}

/// State shared between the logger handle and its worker thread
struct Shared {
    ring: RingBuffer<LogEvent>,
    threshold: AtomicU8,
    running: AtomicBool,
    destinations: RwLock<Destinations>,
    // The worker's wakeup must not share a lock with the sink list, or
    // shutdown could deadlock against configuration calls.
    wake_mutex: Mutex<()>,
    wake_cv: Condvar,
    dropped: AtomicU64,
}

/// A named asynchronous log pipeline.
///
/// Created stopped with no sinks. The worker thread starts on the first
/// submission that finds sinks and runs until the logger is dropped; drop
/// flushes, stops and joins, so every event enqueued before the drop has
/// reached the sinks by the time it returns.
///
/// A submission after the worker has stopped is accepted into the ring but
/// never dispatched; the events are released when the logger drops.
pub struct Logger {
    name: String,
    shared: Arc<Shared>,
    start: Once,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Logger {
    /// Logger with the default ring capacity
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
            .expect("default ring capacity is always valid")
    }

    /// Logger holding up to `capacity` queued events (rounded up to a
    /// power of two, minimum 2)
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Result<Self> {
        let ring = RingBuffer::with_capacity(capacity)?;
        Ok(Self {
            name: name.into(),
            shared: Arc::new(Shared {
                ring,
                threshold: AtomicU8::new(Level::Debug.as_u8()),
                running: AtomicBool::new(false),
                destinations: RwLock::new(Destinations::default()),
                wake_mutex: Mutex::new(()),
                wake_cv: Condvar::new(),
                dropped: AtomicU64::new(0),
            }),
            start: Once::new(),
            worker: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum level accepted by `submit`
    pub fn threshold(&self) -> Level {
        Level::from_u8(self.shared.threshold.load(Ordering::Acquire)).unwrap_or(Level::Debug)
    }

    pub fn set_threshold(&self, level: Level) {
        self.shared.threshold.store(level.as_u8(), Ordering::Release);
    }

    /// Events lost to ring-buffer overflow since creation
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Whether the worker thread is active
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Hand an event to the pipeline.
    ///
    /// Below-threshold events return without side effect. With sinks
    /// registered, the event is enqueued for the worker; a full ring drops
    /// it (counted, not an error). With no sinks, the event is forwarded to
    /// the root logger if one is set; the root is never consulted once this
    /// logger has sinks of its own.
    pub fn submit(&self, event: LogEvent) -> Result<()> {
        if event.level() < self.threshold() {
            return Ok(());
        }

        // Snapshot the routing under the read lock, then release it before
        // touching the ring.
        let root = {
            let destinations = self.shared.destinations.read().unwrap();
            if !destinations.sinks.is_empty() {
                None
            } else {
                match destinations.root.as_ref() {
                    Some(root) => Some(Arc::clone(root)),
                    None => return Err(Error::NoDestination(self.name.clone())),
                }
            }
        };

        match root {
            None => {
                self.start_worker();
                match self.shared.ring.push(event) {
                    Ok(()) => {
                        // Taking the wake mutex pairs with the worker's
                        // predicate check, so the notify cannot be lost.
                        let _wake = self.shared.wake_mutex.lock().unwrap();
                        self.shared.wake_cv.notify_one();
                    }
                    Err(_event) => {
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Ok(())
            }
            Some(root) => root.submit(event),
        }
    }

    /// Register a sink. Identity is by allocation; the same `Arc` twice is
    /// rejected with `DuplicateSink`.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) -> Result<()> {
        let mut destinations = self.shared.destinations.write().unwrap();
        if destinations.sinks.iter().any(|s| same_sink(s, &sink)) {
            return Err(Error::DuplicateSink);
        }
        destinations.sinks.push(sink);
        Ok(())
    }

    /// Remove a previously registered sink
    pub fn remove_sink(&self, sink: &Arc<dyn Sink>) -> Result<()> {
        let mut destinations = self.shared.destinations.write().unwrap();
        match destinations.sinks.iter().position(|s| same_sink(s, sink)) {
            Some(index) => {
                destinations.sinks.remove(index);
                Ok(())
            }
            None => Err(Error::UnknownSink),
        }
    }

    pub fn clear_sinks(&self) {
        self.shared.destinations.write().unwrap().sinks.clear();
    }

    /// Bind the fallback root logger. Write-once; a second call fails with
    /// `RootAlreadySet`.
    pub fn set_root(&self, root: Arc<Logger>) -> Result<()> {
        let mut destinations = self.shared.destinations.write().unwrap();
        if destinations.root.is_some() {
            return Err(Error::RootAlreadySet(self.name.clone()));
        }
        destinations.root = Some(root);
        Ok(())
    }

    /// Wait for the ring to drain, then flush every sink.
    ///
    /// Spin-yielding is acceptable here: flush is caller-initiated and off
    /// the hot path. The wait is skipped once the worker has stopped.
    pub fn flush(&self) {
        while self.shared.running.load(Ordering::Acquire) && !self.shared.ring.is_empty() {
            std::thread::yield_now();
        }

        let destinations = self.shared.destinations.write().unwrap();
        for sink in &destinations.sinks {
            if let Err(err) = sink.flush() {
                eprintln!("ringlog: sink flush failed: {err}");
            }
        }
    }

    /// Start the worker exactly once per logger.
    fn start_worker(&self) {
        self.start.call_once(|| {
            if self
                .shared
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            let shared = Arc::downgrade(&self.shared);
            let spawned = std::thread::Builder::new()
                .name(format!("ringlog-{}", self.name))
                .spawn(move || worker_loop(shared));
            match spawned {
                Ok(handle) => {
                    *self.worker.lock().unwrap() = Some(handle);
                }
                Err(err) => {
                    self.shared.running.store(false, Ordering::Release);
                    eprintln!("ringlog: failed to spawn worker for `{}`: {err}", self.name);
                }
            }
        });
    }

    /// Ask the worker to finish and wait for it. The worker drains the
    /// ring before exiting.
    fn stop(&self) {
        if self
            .shared
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _wake = self.shared.wake_mutex.lock().unwrap();
            self.shared.wake_cv.notify_all();
        }

        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                eprintln!("ringlog: worker for `{}` panicked", self.name);
            }
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.flush();
        self.stop();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("threshold", &self.threshold())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Single consumer per logger. Holds only a weak reference so a logger
/// being torn down is observed at the next iteration instead of being kept
/// alive by its own thread.
fn worker_loop(shared: Weak<Shared>) {
    loop {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        {
            let guard = shared.wake_mutex.lock().unwrap();
            let _guard = shared
                .wake_cv
                .wait_while(guard, |_| {
                    shared.running.load(Ordering::Acquire) && shared.ring.is_empty()
                })
                .unwrap();
        }

        if !shared.running.load(Ordering::Acquire) && shared.ring.is_empty() {
            return;
        }

        while let Some(event) = shared.ring.pop() {
            // Dispatch against a snapshot so configuration calls are never
            // blocked behind sink I/O.
            let sinks = shared.destinations.read().unwrap().sinks.clone();
            for sink in &sinks {
                // A misbehaving sink must not take the worker down; the
                // remaining sinks still get the event.
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    sink.append(&event)
                }));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => eprintln!("ringlog: sink append failed: {err}"),
                    Err(_) => eprintln!("ringlog: sink append panicked"),
                }
            }
        }
    }
}
