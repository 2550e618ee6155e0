//! Centralized runtime constants for shadow-monitor.
//!
//! All timeouts, exit codes, file names, and fixed rule values are collected
//! here so they can be found and adjusted in a single place rather than
//! scattered across modules.

/// How long `Stop` waits for the engine's completion signal before the
/// shutdown is treated as hung (seconds).
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Process exit status used when a hung shutdown forces termination.
pub const FORCED_EXIT_CODE: i32 = 777;

/// Interval at which the engine refreshes its runtime state (seconds).
pub const ENGINE_REFRESH_INTERVAL_SECS: u64 = 60;

/// Reserved range always appended as the last proxied CIDR.
pub const SENTINEL_CIDR: &str = "198.18.0.0/16";

/// Persisted engine configuration, relative to the working directory.
pub const CONFIG_FILE: &str = "config.json";

/// Server registry (display name -> connection URL).
pub const SERVERS_FILE: &str = "servers.json";

/// Rule directory scanned for selectable modes.
pub const RULES_DIR: &str = "rules";

/// Indentation used when rewriting the persisted config.
pub const CONFIG_INDENT: &[u8] = b"    ";

/// Name given to the thread that drives the engine's run loop.
pub const ENGINE_THREAD_NAME: &str = "proxy-engine";

/// Environment variable through which `ExternalEngine` passes the refresh interval.
pub const REFRESH_INTERVAL_ENV: &str = "SHADOW_REFRESH_INTERVAL_SECS";
