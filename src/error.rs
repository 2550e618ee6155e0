//! Unified error type for all command handlers.
//!
//! `AppError` is the single error type returned by every command and by the
//! lifecycle controller. It serializes as `{ "kind": "...", "message": "..." }`
//! so a UI adapter can programmatically distinguish error categories.

use serde::ser::SerializeStruct;

/// Application-level error returned by all commands.
///
/// Each variant maps to a distinct failure domain. A hung engine shutdown is
/// deliberately absent: it never returns to the caller (see
/// [`crate::controller::HangHandler`]).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A directory path is missing or names something other than a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The engine config file does not exist.
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    /// The engine config path names a directory instead of a file.
    #[error("config path is a directory: {0}")]
    ConfigIsDirectory(String),

    /// Other I/O and OS-level errors (reading rules, writing config).
    #[error("{0}")]
    Io(String),

    /// The persisted engine config is missing or is not valid JSON.
    #[error("config unreadable: {0}")]
    ConfigUnreadable(String),

    /// The server registry is not a JSON object of name -> URL.
    #[error("server registry unreadable: {0}")]
    RegistryUnreadable(String),

    /// A server name could not be resolved to a usable endpoint.
    #[error("cannot resolve server: {0}")]
    ServerResolution(String),

    /// Invalid or missing user input.
    #[error("{0}")]
    InvalidInput(String),

    /// The engine rejected its configuration at construction time.
    #[error("engine construction failed: {0}")]
    EngineConstruction(String),
}

impl AppError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotADirectory(_) => "NotADirectory",
            AppError::ConfigNotFound(_) => "ConfigNotFound",
            AppError::ConfigIsDirectory(_) => "ConfigIsDirectory",
            AppError::Io(_) => "Io",
            AppError::ConfigUnreadable(_) => "ConfigUnreadable",
            AppError::RegistryUnreadable(_) => "RegistryUnreadable",
            AppError::ServerResolution(_) => "ServerResolution",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::EngineConstruction(_) => "EngineConstruction",
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }` for UI adapters.
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

// ---- From implementations for ergonomic error conversion ----

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::EngineConstruction(format!("{err:#}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ConfigUnreadable(err.to_string())
    }
}
