//! Engine adapter that runs the proxy engine executable as a child process.
//!
//! The child is started as `<program> -c <config> [args...]` at build time so
//! that a bad program path or a rejected config surfaces as a construction
//! error. Its stdout/stderr are copied into the diagnostics sink.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};

use super::{Completion, DiagnosticsSink, EngineFactory, ProxyEngine};
use crate::config;

/// Poll interval while waiting for the child to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Builds [`ExternalEngine`]s for a fixed program.
#[derive(Debug, Clone)]
pub struct ExternalEngineFactory {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalEngineFactory {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

impl EngineFactory for ExternalEngineFactory {
    fn build(
        &self,
        config_path: &Path,
        refresh_interval: Duration,
        diagnostics: DiagnosticsSink,
    ) -> Result<Arc<dyn ProxyEngine>> {
        let engine = ExternalEngine::spawn(
            &self.program,
            &self.args,
            config_path,
            refresh_interval,
            diagnostics,
        )?;
        Ok(Arc::new(engine))
    }
}

/// A proxy engine running as a child process.
pub struct ExternalEngine {
    child: Mutex<Child>,
    closing: AtomicBool,
    done: Completion,
}

impl ExternalEngine {
    pub fn spawn(
        program: &Path,
        args: &[String],
        config_path: &Path,
        refresh_interval: Duration,
        diagnostics: DiagnosticsSink,
    ) -> Result<Self> {
        let mut child = Command::new(program)
            .arg("-c")
            .arg(config_path)
            .args(args)
            .env(
                config::REFRESH_INTERVAL_ENV,
                refresh_interval.as_secs().to_string(),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch engine {}", program.display()))?;

        let sink = Arc::new(Mutex::new(diagnostics));
        if let Some(stdout) = child.stdout.take() {
            forward_output("engine-stdout", stdout, Arc::clone(&sink))?;
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output("engine-stderr", stderr, sink)?;
        }

        tracing::info!("Engine process {} started (pid {})", program.display(), child.id());
        Ok(Self {
            child: Mutex::new(child),
            closing: AtomicBool::new(false),
            done: Completion::new(),
        })
    }

    fn child(&self) -> std::sync::MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProxyEngine for ExternalEngine {
    fn run(&self) -> Result<()> {
        let _done = self.done.fire_on_drop();
        let status = loop {
            let polled = self
                .child()
                .try_wait()
                .context("failed to poll engine process")?;
            if let Some(status) = polled {
                break status;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        };

        if status.success() || self.closing.load(Ordering::SeqCst) {
            tracing::info!("Engine process exited: {status}");
            Ok(())
        } else {
            anyhow::bail!("engine process exited unexpectedly: {status}")
        }
    }

    fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Err(e) = self.child().kill() {
            tracing::debug!("Engine kill request ignored: {e}");
        }
    }

    fn done(&self) -> Completion {
        self.done.clone()
    }
}

impl Drop for ExternalEngine {
    fn drop(&mut self) {
        if !self.done.is_complete() {
            let mut child = self.child();
            tracing::warn!(
                "ExternalEngine dropped while running, killing engine process (pid {})",
                child.id()
            );
            let _ = child.kill();
            // Reap it so no zombie is left behind.
            let _ = child.wait();
        }
    }
}

fn forward_output<R: Read + Send + 'static>(
    name: &str,
    stream: R,
    sink: Arc<Mutex<DiagnosticsSink>>,
) -> Result<()> {
    std::thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            for line in BufReader::new(stream).lines() {
                let Ok(line) = line else { break };
                let mut out = sink.lock().unwrap_or_else(PoisonError::into_inner);
                if writeln!(out, "{line}").is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn engine output forwarder")?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Diagnostics sink that appends into a shared buffer.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// `sh -c <config>` runs the config argument as the script body.
    fn build(script: &str, out: SharedBuf) -> Arc<dyn ProxyEngine> {
        ExternalEngineFactory::new("/bin/sh")
            .build(Path::new(script), Duration::from_secs(60), Box::new(out))
            .unwrap()
    }

    #[test]
    fn test_missing_program_fails_construction() {
        let factory = ExternalEngineFactory::new("/nonexistent/shadow-engine");
        let err = factory
            .build(Path::new("config.json"), Duration::from_secs(60), Box::new(std::io::sink()))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("failed to launch engine"));
    }

    #[test]
    fn test_clean_exit_fires_done() {
        let out = SharedBuf::default();
        let engine = build("echo refresh=$SHADOW_REFRESH_INTERVAL_SECS", out.clone());
        engine.run().unwrap();
        assert!(engine.done().is_complete());
        std::thread::sleep(Duration::from_millis(100));
        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("refresh=60"), "got {text:?}");
    }

    #[test]
    fn test_unexpected_failure_is_error() {
        let engine = build("exit 3", SharedBuf::default());
        assert!(engine.run().is_err());
        assert!(engine.done().is_complete());
    }

    #[test]
    fn test_close_kills_and_completes() {
        let engine = build("sleep 30", SharedBuf::default());
        let runner = Arc::clone(&engine);
        let handle = std::thread::spawn(move || runner.run());
        std::thread::sleep(Duration::from_millis(50));
        engine.close();
        assert!(engine.done().wait_timeout(Duration::from_secs(5)));
        assert!(handle.join().unwrap().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_drop_kills_and_reaps_child() {
        let engine = ExternalEngine::spawn(
            Path::new("/bin/sh"),
            &[],
            Path::new("sleep 30"),
            Duration::from_secs(60),
            Box::new(std::io::sink()),
        )
        .unwrap();
        let pid = engine.child().id();
        assert!(Path::new(&format!("/proc/{pid}")).exists());

        drop(engine);
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
    }

    #[test]
    fn test_factory_appends_extra_args() {
        let out = SharedBuf::default();
        let engine = ExternalEngineFactory::new("/bin/sh")
            .with_args(["shadow".to_string(), "--verbose".to_string()])
            .build(Path::new("echo \"$0 $1\""), Duration::from_secs(60), Box::new(out.clone()))
            .unwrap();
        engine.run().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.trim(), "shadow --verbose");
    }
}
