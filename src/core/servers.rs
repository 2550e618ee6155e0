//! Server registry: display name -> connection URL, loaded from `servers.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Canonical form of the `server` config field.
///
/// The legacy bare-string form (`"ss://..."`) is accepted on read and
/// normalized, taking the protocol from the URL scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ServerRepr")]
pub struct ServerEndpoint {
    pub protocol: String,
    pub url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ServerRepr {
    Structured { protocol: String, url: String },
    Legacy(String),
}

impl From<ServerRepr> for ServerEndpoint {
    fn from(repr: ServerRepr) -> Self {
        match repr {
            ServerRepr::Structured { protocol, url } => Self { protocol, url },
            ServerRepr::Legacy(url) => Self {
                protocol: scheme_of(&url).unwrap_or_default().to_string(),
                url,
            },
        }
    }
}

impl ServerEndpoint {
    /// Build an endpoint from a URL, rejecting anything without a `scheme://` prefix.
    pub fn from_url(url: &str) -> Result<Self, AppError> {
        let protocol = scheme_of(url)
            .ok_or_else(|| AppError::ServerResolution(format!("missing scheme in {url:?}")))?;
        Ok(Self {
            protocol: protocol.to_string(),
            url: url.to_string(),
        })
    }
}

fn scheme_of(url: &str) -> Option<&str> {
    let (scheme, rest) = url.split_once("://")?;
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (valid && !rest.is_empty()).then_some(scheme)
}

/// Named servers in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerRegistry {
    entries: Vec<(String, String)>,
}

impl ServerRegistry {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)
            .map_err(|e| AppError::RegistryUnreadable(e.to_string()))?;

        let mut entries = Vec::with_capacity(map.len());
        for (name, value) in map {
            let serde_json::Value::String(url) = value else {
                return Err(AppError::RegistryUnreadable(format!(
                    "server {name:?} must map to a URL string"
                )));
            };
            entries.push((name, url));
        }
        Ok(Self { entries })
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn url(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, url)| url.as_str())
    }

    /// Resolve a display name to a structured endpoint.
    pub fn resolve(&self, name: &str) -> Result<ServerEndpoint, AppError> {
        let url = self
            .url(name)
            .ok_or_else(|| AppError::ServerResolution(format!("unknown server {name:?}")))?;
        ServerEndpoint::from_url(url)
    }
}
