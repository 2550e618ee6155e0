//! Contract with the proxy engine that performs the actual interception.
//!
//! The engine is an external collaborator. This module only fixes its shape:
//! built from a config path, refresh interval and diagnostics sink; a blocking
//! `run`; a non-blocking `close`; and a completion signal that fires once the
//! run loop has wound down.
//!
//! - [`ExternalEngine`]: drives an engine executable as a child process

pub mod external;

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

pub use external::{ExternalEngine, ExternalEngineFactory};

/// Where the engine writes its human-readable diagnostics.
pub type DiagnosticsSink = Box<dyn Write + Send>;

/// A running proxy engine instance.
pub trait ProxyEngine: Send + Sync {
    /// Block until the engine stops. Errors describe an ungraceful termination.
    fn run(&self) -> anyhow::Result<()>;

    /// Request graceful shutdown. Must not block.
    fn close(&self);

    /// Signal that fires once `run` has finished after a `close`.
    fn done(&self) -> Completion;
}

/// Builds a fresh engine for every start.
pub trait EngineFactory: Send + Sync {
    fn build(
        &self,
        config_path: &Path,
        refresh_interval: Duration,
        diagnostics: DiagnosticsSink,
    ) -> anyhow::Result<Arc<dyn ProxyEngine>>;
}

/// One-shot completion latch. Clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark complete and wake every waiter. Later calls are no-ops.
    pub fn fire(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Guard that fires the signal when dropped, on every exit path.
    pub fn fire_on_drop(&self) -> FireOnDrop {
        FireOnDrop(self.clone())
    }

    pub fn is_complete(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait up to `timeout`. Returns `true` if the signal fired in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |complete| !*complete)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Fires its [`Completion`] on drop. See [`Completion::fire_on_drop`].
#[must_use]
#[derive(Debug)]
pub struct FireOnDrop(Completion);

impl Drop for FireOnDrop {
    fn drop(&mut self) {
        self.0.fire();
    }
}
