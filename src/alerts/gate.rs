//! Exclusive access to the configuration store.
//!
//! The [`ConfigGate`] owns the process' single [`ConfigStore`] instance and only
//! hands it out inside [`ConfigGate::run_exclusive`]. Push evaluations,
//! configuration writes and configuration reads therefore never interleave.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::alerts::config_store::ConfigStore;

/// Process-wide exclusive lock around the configuration store.
///
/// The lock is not reentrant: calling [`run_exclusive`](Self::run_exclusive)
/// from inside a body deadlocks. Waiting bodies are served in arrival order,
/// as [`tokio::sync::Mutex`] is fair.
///
/// Cloning the gate shares the same lock and store.
///
/// # Examples
///
/// ```no_run
/// use ridealert::alerts::{ConfigGate, ConfigStore, FileConfigStore};
///
/// # async fn example() {
/// let gate = ConfigGate::new(FileConfigStore::new("./data"));
/// let config = gate.run_exclusive(async |store| store.load().await).await;
/// # }
/// ```
pub struct ConfigGate<S: ConfigStore> {
    /// The store, reachable only while holding the lock
    store: Arc<Mutex<S>>,
}

impl<S: ConfigStore> ConfigGate<S> {
    /// Wraps `store` into a new gate.
    pub fn new(store: S) -> Self {
        ConfigGate {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Runs `body` with exclusive access to the store.
    ///
    /// The lock is held until the future returned by `body` completes, including
    /// every await inside it. No other body starts in between.
    pub async fn run_exclusive<T>(&self, body: impl AsyncFnOnce(&S) -> T) -> T {
        let store = self.store.lock().await;
        body(&*store).await
    }
}

impl<S: ConfigStore> Clone for ConfigGate<S> {
    fn clone(&self) -> Self {
        ConfigGate {
            store: Arc::clone(&self.store),
        }
    }
}
