//! Proxy engine lifecycle management.
//!
//! `LifecycleController` owns at most one engine instance. Start builds a
//! fresh engine and hands its blocking run loop to a named thread. Stop asks
//! the engine to close and then races its completion signal against a fixed
//! timeout. The controller lock is released for that wait, so a concurrent
//! Start is never stuck behind a slow shutdown. If the timeout wins, the
//! shutdown is treated as a deadlock: a [`HangReport`] is handed to the
//! [`HangHandler`], which ends the process.

use std::backtrace::Backtrace;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config;
use crate::core::PathResolver;
use crate::engine::{DiagnosticsSink, EngineFactory, ProxyEngine};
use crate::error::AppError;

/// Whether an engine instance is currently owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum LifecycleState {
    Stopped,
    Running,
}

/// Receives errors that happen away from the caller, e.g. on the engine thread.
pub trait ErrorSink: Send + Sync {
    fn report(&self, err: &dyn fmt::Display);
}

/// Logs reported errors through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, err: &dyn fmt::Display) {
        tracing::error!("{err:#}");
    }
}

/// Diagnostics captured when a graceful shutdown does not finish in time.
#[derive(Debug)]
pub struct HangReport {
    pub timeout: Duration,
    /// Engine threads owned by the controller and whether each is still alive.
    pub engine_threads: Vec<String>,
    pub backtrace: Backtrace,
}

impl fmt::Display for HangReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Failed to shutdown after {} seconds. Probably dead locked. Printing stack and killing.",
            self.timeout.as_secs()
        )?;
        for thread in &self.engine_threads {
            writeln!(f, "thread {thread}")?;
        }
        let trace = self.backtrace.to_string();
        for line in trace.lines().filter(|l| !l.trim().is_empty()) {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Decides what happens when an engine never finishes shutting down.
///
/// `halt` never returns: a hung shutdown is not a retryable error.
pub trait HangHandler: Send + Sync {
    fn halt(&self, report: HangReport) -> !;
}

/// Prints the hang report and exits the process with a fixed status.
#[derive(Debug, Clone, Copy)]
pub struct ExitProcess {
    pub code: i32,
}

impl Default for ExitProcess {
    fn default() -> Self {
        Self {
            code: config::FORCED_EXIT_CODE,
        }
    }
}

impl HangHandler for ExitProcess {
    fn halt(&self, report: HangReport) -> ! {
        tracing::error!(
            "Engine shutdown exceeded {:?}; terminating with status {}",
            report.timeout,
            self.code
        );
        print!("{report}");
        let _ = std::io::Write::flush(&mut std::io::stdout());
        std::process::exit(self.code)
    }
}

/// Tunables for [`LifecycleController`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Engine config file, resolved through the controller's [`PathResolver`].
    pub config_file: PathBuf,
    pub shutdown_timeout: Duration,
    pub refresh_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(config::CONFIG_FILE),
            shutdown_timeout: Duration::from_secs(config::SHUTDOWN_TIMEOUT_SECS),
            refresh_interval: Duration::from_secs(config::ENGINE_REFRESH_INTERVAL_SECS),
        }
    }
}

type DiagnosticsFactory = Box<dyn Fn() -> DiagnosticsSink + Send + Sync>;

struct OwnedEngine {
    engine: Arc<dyn ProxyEngine>,
    runner: JoinHandle<()>,
    /// Distinguishes instances across stop/start cycles.
    generation: u64,
}

#[derive(Default)]
struct Inner {
    owned: Option<OwnedEngine>,
    generation: u64,
}

/// Owns the single running proxy engine.
pub struct LifecycleController {
    inner: Mutex<Inner>,
    paths: PathResolver,
    factory: Box<dyn EngineFactory>,
    errors: Arc<dyn ErrorSink>,
    hang: Box<dyn HangHandler>,
    diagnostics: DiagnosticsFactory,
    options: ControllerOptions,
}

impl LifecycleController {
    pub fn new(
        paths: PathResolver,
        factory: impl EngineFactory + 'static,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            paths,
            factory: Box::new(factory),
            errors,
            hang: Box::new(ExitProcess::default()),
            diagnostics: Box::new(|| Box::new(std::io::stdout())),
            options: ControllerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hang_handler(mut self, hang: impl HangHandler + 'static) -> Self {
        self.hang = Box::new(hang);
        self
    }

    pub fn with_diagnostics(
        mut self,
        diagnostics: impl Fn() -> DiagnosticsSink + Send + Sync + 'static,
    ) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LifecycleState {
        if self.lock().owned.is_some() {
            LifecycleState::Running
        } else {
            LifecycleState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Start the engine. A no-op if one is already running.
    pub fn start(&self) -> Result<(), AppError> {
        let mut inner = self.lock();
        if inner.owned.is_some() {
            tracing::debug!("Start ignored: engine already running");
            return Ok(());
        }

        let config_path = self.paths.resolve_file(&self.options.config_file)?;
        let engine = self
            .factory
            .build(&config_path, self.options.refresh_interval, (self.diagnostics)())
            .map_err(|e| AppError::EngineConstruction(format!("{e:#}")))?;

        let runner_engine = Arc::clone(&engine);
        let errors = Arc::clone(&self.errors);
        let runner = std::thread::Builder::new()
            .name(config::ENGINE_THREAD_NAME.into())
            .spawn(move || {
                if let Err(e) = runner_engine.run() {
                    tracing::warn!("Proxy engine stopped with error: {e:#}");
                    errors.report(&e);
                }
            });
        let runner = match runner {
            Ok(handle) => handle,
            Err(e) => {
                engine.close();
                return Err(AppError::Io(format!("failed to spawn engine thread: {e}")));
            }
        };

        inner.generation += 1;
        let generation = inner.generation;
        inner.owned = Some(OwnedEngine {
            engine,
            runner,
            generation,
        });

        tracing::info!("shadow - a transparent proxy for Windows, Linux and macOS");
        tracing::info!("shadow is running with {}", config_path.display());
        Ok(())
    }

    /// Stop the engine and wait for it to finish. A no-op if nothing is running.
    ///
    /// Returns once the engine has completed. If it does not complete within
    /// the shutdown timeout the hang handler is invoked and this never returns.
    pub fn stop(&self) -> Result<(), AppError> {
        let (done, generation) = {
            let inner = self.lock();
            let Some(owned) = inner.owned.as_ref() else {
                tracing::debug!("Stop ignored: engine not running");
                return Ok(());
            };
            tracing::info!("shadow is closing...");
            owned.engine.close();
            (owned.engine.done(), owned.generation)
        };

        // The lock is not held here: a concurrent Start must not wait on us.
        if !done.wait_timeout(self.options.shutdown_timeout) {
            let report = self.hang_report();
            self.hang.halt(report);
        }

        let mut inner = self.lock();
        if inner
            .owned
            .as_ref()
            .is_some_and(|owned| owned.generation == generation)
        {
            inner.owned = None;
            tracing::info!("shadow stopped");
        }
        Ok(())
    }

    fn hang_report(&self) -> HangReport {
        let engine_threads = self
            .lock()
            .owned
            .iter()
            .map(|owned| {
                let name = owned.runner.thread().name().unwrap_or("<unnamed>").to_string();
                let status = if owned.runner.is_finished() { "finished" } else { "running" };
                format!("{name} ({status})")
            })
            .collect();
        HangReport {
            timeout: self.options.shutdown_timeout,
            engine_threads,
            backtrace: Backtrace::force_capture(),
        }
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Some(owned) = self.lock().owned.as_ref() {
            tracing::warn!("LifecycleController dropped while running, requesting engine close");
            owned.engine.close();
        }
    }
}
