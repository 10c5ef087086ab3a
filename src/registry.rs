// Process-wide directory of named loggers

use crate::logger::Logger;
use crate::sink::ConsoleSink;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The process singleton, bootstrapped on first access.
///
/// Bootstrap runs exactly once across all threads: it creates the root
/// logger named `"root"`, attaches a default stdout console sink, and
/// registers it.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::bootstrap)
}

/// Idempotent initialization: ensures the root logger exists.
pub fn init() {
    let _ = registry();
}

/// Get or create the named logger. `"root"` returns the root logger.
pub fn get_logger(name: &str) -> Arc<Logger> {
    registry().get(name)
}

/// Directory of named loggers with a well-known root
pub struct Registry {
    root: Arc<Logger>,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl Registry {
    fn bootstrap() -> Self {
        let root = Arc::new(Logger::new("root"));
        root.add_sink(Arc::new(ConsoleSink::stdout()))
            .expect("fresh root logger has no sinks");

        let mut loggers = HashMap::new();
        loggers.insert("root".to_string(), Arc::clone(&root));

        Self {
            root,
            loggers: RwLock::new(loggers),
        }
    }

    /// The registry-owned root logger
    pub fn root(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    /// Return the named logger, creating it with the root as parent when it
    /// does not exist yet. Repeat calls for a name return the same logger
    /// from any thread.
    pub fn get(&self, name: &str) -> Arc<Logger> {
        if name == "root" {
            return Arc::clone(&self.root);
        }

        {
            let loggers = self.loggers.read().unwrap();
            if let Some(logger) = loggers.get(name) {
                return Arc::clone(logger);
            }
        }

        // Build outside the write lock; if another thread won the race the
        // fresh logger is discarded in favor of the existing entry.
        let logger = Arc::new(Logger::new(name));
        logger
            .set_root(Arc::clone(&self.root))
            .expect("fresh logger has no root");

        let mut loggers = self.loggers.write().unwrap();
        Arc::clone(loggers.entry(name.to_string()).or_insert(logger))
    }

    /// Drop every registered logger except the root itself. Each logger
    /// drains and joins its worker as its last handle goes away.
    pub fn shutdown(&self) {
        self.loggers.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_returns_same_logger_for_a_name() {
        let a = registry().get("identity");
        let b = registry().get("identity");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_root_is_stable() {
        let direct = registry().root();
        let by_name = registry().get("root");
        assert!(Arc::ptr_eq(&direct, &by_name));
    }

    #[test]
    fn test_named_loggers_are_distinct() {
        let a = registry().get("alpha");
        let b = registry().get("beta");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "alpha");
        assert_eq!(b.name(), "beta");
    }

    #[test]
    fn test_concurrent_get_converges() {
        let mut handles = Vec::new();
        for _ in 0..8 {
            handles.push(thread::spawn(|| registry().get("contended")));
        }
        let loggers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for logger in &loggers[1..] {
            assert!(Arc::ptr_eq(&loggers[0], logger));
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert_eq!(registry().get("root").name(), "root");
    }
}
