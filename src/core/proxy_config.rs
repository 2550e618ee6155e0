//! Persisted engine configuration and the rule-based generator that rewrites it.
//!
//! The config is handled as an ordered JSON object so that every field this
//! crate does not own survives a read-modify-write cycle unchanged and in
//! place. Only `server`, `ipCidrRules.proxy` and `appRules.proxy` are written.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config;
use crate::error::AppError;

use super::rule_parser::ParsedRule;
use super::servers::{ServerEndpoint, ServerRegistry};

const SERVER_KEY: &str = "server";
#[cfg(test)]
const NAME_SERVER_KEY: &str = "nameServer";
#[cfg(test)]
const FILTER_STRING_KEY: &str = "filterString";
const IP_CIDR_RULES_KEY: &str = "ipCidrRules";
const APP_RULES_KEY: &str = "appRules";
const PROXY_KEY: &str = "proxy";

/// The engine's JSON config, kept as an ordered object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyConfig {
    fields: Map<String, Value>,
}

impl ProxyConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::ConfigUnreadable(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let fields: Map<String, Value> = serde_json::from_str(text)?;
        Ok(Self { fields })
    }

    /// Serialize with a 4-space indent.
    pub fn to_json(&self) -> Result<String, AppError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(config::CONFIG_INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| AppError::Io(e.to_string()))
    }

    /// Truncate and rewrite `path`. Not atomic: a failed write leaves a partial file.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let json = self.to_json()?;
        let mut file = std::fs::File::create(path)
            .map_err(|e| AppError::Io(format!("{}: {e}", path.display())))?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn set_server(&mut self, endpoint: &ServerEndpoint) -> Result<(), AppError> {
        self.fields
            .insert(SERVER_KEY.to_string(), serde_json::to_value(endpoint)?);
        Ok(())
    }

    /// Set `ipCidrRules.proxy` to `cidrs` followed by the sentinel range.
    pub fn set_ip_cidr_proxy(&mut self, cidrs: &[String]) -> Result<(), AppError> {
        let mut list = cidrs.to_vec();
        list.push(config::SENTINEL_CIDR.to_string());
        self.set_proxy_list(IP_CIDR_RULES_KEY, list)
    }

    pub fn set_app_proxy(&mut self, apps: &[String]) -> Result<(), AppError> {
        self.set_proxy_list(APP_RULES_KEY, apps.to_vec())
    }

    fn set_proxy_list(&mut self, group: &str, list: Vec<String>) -> Result<(), AppError> {
        let entry = self
            .fields
            .entry(group.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(obj) = entry else {
            return Err(AppError::ConfigUnreadable(format!("{group} must be an object")));
        };
        obj.insert(
            PROXY_KEY.to_string(),
            Value::Array(list.into_iter().map(Value::String).collect()),
        );
        Ok(())
    }
}

// Read accessors, used to inspect generated configs.
#[cfg(test)]
impl ProxyConfig {
    /// The configured server, normalizing the legacy bare-string form.
    pub(crate) fn server(&self) -> Option<ServerEndpoint> {
        self.fields
            .get(SERVER_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub(crate) fn name_server(&self) -> Option<&str> {
        self.fields.get(NAME_SERVER_KEY).and_then(Value::as_str)
    }

    pub(crate) fn filter_string(&self) -> Option<&str> {
        self.fields.get(FILTER_STRING_KEY).and_then(Value::as_str)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub(crate) fn ip_cidr_proxy(&self) -> Vec<String> {
        self.proxy_list(IP_CIDR_RULES_KEY)
    }

    pub(crate) fn app_proxy(&self) -> Vec<String> {
        self.proxy_list(APP_RULES_KEY)
    }

    fn proxy_list(&self, group: &str) -> Vec<String> {
        self.fields
            .get(group)
            .and_then(|g| g.get(PROXY_KEY))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Writes a selected server and rule set into the persisted engine config.
pub struct ConfigGenerator<'a> {
    registry: &'a ServerRegistry,
    config_path: PathBuf,
}

impl<'a> ConfigGenerator<'a> {
    pub fn new(registry: &'a ServerRegistry, config_path: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            config_path: config_path.into(),
        }
    }

    /// Resolve `server_name`, then read-modify-write the config file.
    ///
    /// Nothing is touched if the server cannot be resolved or the existing
    /// config cannot be read.
    pub fn generate(&self, server_name: &str, rule: &ParsedRule) -> Result<ProxyConfig, AppError> {
        let endpoint = self.registry.resolve(server_name)?;
        let mut conf = ProxyConfig::load(&self.config_path)?;

        conf.set_server(&endpoint)?;
        conf.set_ip_cidr_proxy(&rule.cidr_blocks)?;
        conf.set_app_proxy(&rule.app_patterns)?;
        conf.save(&self.config_path)?;

        tracing::info!(
            "Generated {} for server {server_name} ({} apps, {} cidrs)",
            self.config_path.display(),
            rule.app_patterns.len(),
            rule.cidr_blocks.len()
        );
        Ok(conf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    const BASE_CONFIG: &str = r#"{
    "server": "ss://aes-256-gcm:old@9.9.9.9:443",
    "nameServer": "https://1.1.1.1/dns-query",
    "filterString": "outbound and ip",
    "ipCidrRules": {
        "proxy": ["1.1.1.1/32"],
        "direct": ["192.168.0.0/16"]
    },
    "appRules": {
        "proxy": ["old.exe"]
    },
    "domainRules": {
        "proxy": ["*.google.com"],
        "blocked": []
    },
    "tun": {"mtu": 1500}
}"#;

    fn registry() -> ServerRegistry {
        ServerRegistry::from_json(r#"{"Tokyo": "trojan://pw@jp.example:443"}"#).unwrap()
    }

    fn rule(apps: &[&str], cidrs: &[&str]) -> ParsedRule {
        ParsedRule {
            app_patterns: apps.iter().map(|s| s.to_string()).collect(),
            cidr_blocks: cidrs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_generate_overwrites_three_fields() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), BASE_CONFIG);
        let registry = registry();

        ConfigGenerator::new(&registry, &path)
            .generate("Tokyo", &rule(&["steam.exe"], &["10.0.0.0/8"]))
            .unwrap();

        let conf = ProxyConfig::load(&path).unwrap();
        assert_eq!(
            conf.get("server").unwrap(),
            &json!({"protocol": "trojan", "url": "trojan://pw@jp.example:443"})
        );
        assert_eq!(conf.ip_cidr_proxy(), vec!["10.0.0.0/8", "198.18.0.0/16"]);
        assert_eq!(conf.app_proxy(), vec!["steam.exe"]);
    }

    #[test]
    fn test_generate_preserves_other_fields() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), BASE_CONFIG);
        let before: Value = serde_json::from_str(BASE_CONFIG).unwrap();
        let registry = registry();

        ConfigGenerator::new(&registry, &path)
            .generate("Tokyo", &rule(&[], &[]))
            .unwrap();

        let after: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in ["nameServer", "filterString", "domainRules", "tun"] {
            assert_eq!(after[key], before[key], "{key} changed");
        }
        assert_eq!(after["ipCidrRules"]["direct"], before["ipCidrRules"]["direct"]);
    }

    #[test]
    fn test_generate_keeps_key_order() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), BASE_CONFIG);
        let registry = registry();

        let conf = ConfigGenerator::new(&registry, &path)
            .generate("Tokyo", &rule(&[], &[]))
            .unwrap();
        let keys: Vec<&String> = conf.fields.keys().collect();
        assert_eq!(
            keys,
            vec!["server", "nameServer", "filterString", "ipCidrRules", "appRules", "domainRules", "tun"]
        );
    }

    #[test]
    fn test_sentinel_appended_when_cidrs_empty() {
        let mut conf = ProxyConfig::default();
        conf.set_ip_cidr_proxy(&[]).unwrap();
        assert_eq!(conf.ip_cidr_proxy(), vec![config::SENTINEL_CIDR]);
    }

    #[test]
    fn test_sentinel_not_deduplicated() {
        let mut conf = ProxyConfig::default();
        conf.set_ip_cidr_proxy(&["198.18.0.0/16".to_string()]).unwrap();
        assert_eq!(conf.ip_cidr_proxy(), vec!["198.18.0.0/16", "198.18.0.0/16"]);
    }

    #[test]
    fn test_generate_unknown_server_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), BASE_CONFIG);
        let registry = registry();

        let err = ConfigGenerator::new(&registry, &path)
            .generate("Nowhere", &rule(&["a.exe"], &[]))
            .unwrap_err();
        assert_eq!(err.kind(), "ServerResolution");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), BASE_CONFIG);
    }

    #[test]
    fn test_generate_missing_or_malformed_config() {
        let dir = tempdir().unwrap();
        let registry = registry();
        let path = dir.path().join("config.json");

        let err = ConfigGenerator::new(&registry, &path)
            .generate("Tokyo", &rule(&[], &[]))
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigUnreadable");

        std::fs::write(&path, "{ not json").unwrap();
        let err = ConfigGenerator::new(&registry, &path)
            .generate("Tokyo", &rule(&[], &[]))
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigUnreadable");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_rule_group_must_be_object() {
        let mut conf = ProxyConfig::from_json(r#"{"appRules": ["x.exe"]}"#).unwrap();
        let err = conf.set_app_proxy(&[]).unwrap_err();
        assert_eq!(err.kind(), "ConfigUnreadable");
    }

    #[test]
    fn test_output_uses_four_space_indent() {
        let conf = ProxyConfig::from_json(r#"{"a": {"b": 1}}"#).unwrap();
        assert_eq!(conf.to_json().unwrap(), "{\n    \"a\": {\n        \"b\": 1\n    }\n}");
    }

    #[test]
    fn test_legacy_server_normalized_on_read() {
        let conf = ProxyConfig::from_json(BASE_CONFIG).unwrap();
        let server = conf.server().unwrap();
        assert_eq!(server.protocol, "ss");
        assert_eq!(conf.name_server(), Some("https://1.1.1.1/dns-query"));
        assert_eq!(conf.filter_string(), Some("outbound and ip"));
    }

    #[test]
    fn test_shorter_rewrite_truncates_file() {
        let dir = tempdir().unwrap();
        let padded = format!("{BASE_CONFIG}{}", " ".repeat(4096));
        let path = write_config(dir.path(), &padded);
        let registry = registry();

        ConfigGenerator::new(&registry, &path)
            .generate("Tokyo", &rule(&[], &[]))
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('}'));
    }
}
