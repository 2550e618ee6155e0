//! Core logic: rule discovery, rule parsing, and config generation.
//!
//! - [`PathResolver`]: resolves configured names against the working directory
//! - [`rule_store`]: two-level rule directory scan into a [`RuleCatalog`]
//! - [`rule_parser`]: rule file → application patterns + CIDR blocks
//! - [`ServerRegistry`] / [`ServerEndpoint`]: `servers.json` lookup
//! - [`ConfigGenerator`] / [`ProxyConfig`]: read-modify-write of the engine config

pub mod paths;
pub mod proxy_config;
pub mod rule_parser;
pub mod rule_store;
pub mod servers;

pub use paths::PathResolver;
pub use proxy_config::{ConfigGenerator, ProxyConfig};
pub use rule_parser::ParsedRule;
pub use rule_store::RuleCatalog;
pub use servers::{ServerEndpoint, ServerRegistry};
