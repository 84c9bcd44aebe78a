//! Node configuration.
//!
//! Configuration is a JSON document. Every field is optional; missing fields
//! take the values of [`NodeConfig::default`], which describes a three
//! principal demonstration deployment on localhost:
//!
//! ```json
//! {
//!   "kdc_addr": "127.0.0.1:8888",
//!   "principal_host": "127.0.0.1",
//!   "base_port": 9000,
//!   "key_dir": "keys",
//!   "step_timeout_secs": null,
//!   "principals": [
//!     { "id": "A", "key": "90bd4cb0…" },
//!     { "id": "B", "key": "7fbe9fd9…", "port": 9101 }
//!   ]
//! }
//! ```
//!
//! A principal listens on its explicit `host`/`port` when given, otherwise
//! on `principal_host` and `base_port` plus its position in the table.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tessera_core::{DriverConfig, PrincipalRegistry};
use tessera_proto::{KeyMaterial, PrincipalId};

use crate::error::NodeError;

/// One row of the principal table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalEntry {
    /// Identity, e.g. `"A"`
    pub id: String,
    /// Long-term key shared with the KDC, hex encoded (16, 24 or 32 bytes)
    pub key: String,
    /// Listening host, defaults to [`NodeConfig::principal_host`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Listening port, defaults to `base_port + position`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl PrincipalEntry {
    fn new(id: &str, key: &str) -> Self {
        Self { id: id.to_string(), key: key.to_string(), host: None, port: None }
    }
}

/// Deployment-wide configuration shared by the KDC and every principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Address of the KDC (`host:port`)
    pub kdc_addr: String,
    /// Default listening host for principals
    pub principal_host: String,
    /// First principal port
    pub base_port: u16,
    /// Directory receiving `<min>_<max>.key` files
    pub key_dir: PathBuf,
    /// Per-step wait limit. `None` waits forever.
    pub step_timeout_secs: Option<u64>,
    /// Principal table, in registry order
    pub principals: Vec<PrincipalEntry>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            kdc_addr: "127.0.0.1:8888".to_string(),
            principal_host: "127.0.0.1".to_string(),
            base_port: 9000,
            key_dir: "keys".into(),
            step_timeout_secs: None,
            principals: vec![
                PrincipalEntry::new(
                    "A",
                    "90bd4cb0fb331c80f157b2e74475151797aafca67099e1302ef1f93f889c1271",
                ),
                PrincipalEntry::new(
                    "B",
                    "7fbe9fd9045a8eba6c37125e46a9debcbaa51122953ee1889902c50f0a00977d",
                ),
                PrincipalEntry::new(
                    "C",
                    "d51eaa8015f2d67318820dff66a5279dbc3ced30d6f30e8709fca8ab8f8d6900",
                ),
            ],
        }
    }
}

impl NodeConfig {
    /// Read and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if the file is unreadable, is not valid
    /// JSON, or fails [`NodeConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|err| NodeError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json(&bytes)
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Same as [`NodeConfig::load`].
    pub fn from_json(bytes: &[u8]) -> Result<Self, NodeError> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|err| NodeError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the table: identities, hex keys, key lengths, duplicates and
    /// port arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), NodeError> {
        let registry = self.registry()?;
        for id in registry.principals() {
            self.listen_addr(id)?;
        }
        Ok(())
    }

    /// Build the long-term key registry.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] for an invalid identity, bad hex, an
    /// unsupported key length or a duplicate identity.
    pub fn registry(&self) -> Result<PrincipalRegistry, NodeError> {
        let entries = self
            .principals
            .iter()
            .map(|entry| {
                let id = PrincipalId::new(entry.id.as_str())
                    .map_err(|err| NodeError::Config(err.to_string()))?;
                let key = hex::decode(&entry.key)
                    .map_err(|err| NodeError::Config(format!("key of {id}: {err}")))?;
                Ok((id, KeyMaterial::new(key)))
            })
            .collect::<Result<Vec<_>, NodeError>>()?;

        Ok(PrincipalRegistry::new(entries)?)
    }

    /// Listening address (`host:port`) of `id`.
    ///
    /// # Errors
    ///
    /// - [`NodeError::UnknownPrincipal`] if `id` is not in the table
    /// - [`NodeError::Config`] if the derived port overflows
    pub fn listen_addr(&self, id: &PrincipalId) -> Result<String, NodeError> {
        let (position, entry) = self
            .principals
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.id == id.as_str())
            .ok_or_else(|| NodeError::UnknownPrincipal(id.to_string()))?;

        let port = match entry.port {
            Some(port) => port,
            None => u16::try_from(position)
                .ok()
                .and_then(|offset| self.base_port.checked_add(offset))
                .ok_or_else(|| NodeError::Config(format!("no port left for {id}")))?,
        };
        let host = entry.host.as_deref().unwrap_or(&self.principal_host);

        Ok(format!("{host}:{port}"))
    }

    /// Listening addresses of every principal.
    ///
    /// # Errors
    ///
    /// Same as [`NodeConfig::registry`] and [`NodeConfig::listen_addr`].
    pub fn directory(&self) -> Result<HashMap<PrincipalId, String>, NodeError> {
        let registry = self.registry()?;
        registry
            .principals()
            .map(|id| Ok((id.clone(), self.listen_addr(id)?)))
            .collect()
    }

    /// Driver settings derived from this configuration.
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig { step_timeout: self.step_timeout_secs.map(Duration::from_secs) }
    }
}

/// Replace the port of a `host:port` address.
#[must_use]
pub fn with_port(addr: &str, port: u16) -> String {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> PrincipalId {
        PrincipalId::new(name).unwrap()
    }

    #[test]
    fn default_table_is_valid() {
        let config = NodeConfig::default();
        config.validate().unwrap();

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.principals().all(|p| registry.key(p).unwrap().len() == 32));
    }

    #[test]
    fn ports_follow_table_order() {
        let config = NodeConfig::default();

        assert_eq!(config.listen_addr(&id("A")).unwrap(), "127.0.0.1:9000");
        assert_eq!(config.listen_addr(&id("C")).unwrap(), "127.0.0.1:9002");
        assert!(matches!(config.listen_addr(&id("Z")), Err(NodeError::UnknownPrincipal(_))));
    }

    #[test]
    fn explicit_host_and_port_win() {
        let json = br#"{
            "principals": [
                { "id": "A", "key": "00112233445566778899aabbccddeeff" },
                { "id": "B", "key": "00112233445566778899aabbccddeeff", "host": "b", "port": 7 }
            ]
        }"#;
        let config = NodeConfig::from_json(json).unwrap();

        assert_eq!(config.listen_addr(&id("B")).unwrap(), "b:7");
        assert_eq!(config.kdc_addr, "127.0.0.1:8888");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = NodeConfig::from_json(br#"{ "base_port": 9100 }"#).unwrap();

        assert_eq!(config.principals.len(), 3);
        assert_eq!(config.listen_addr(&id("B")).unwrap(), "127.0.0.1:9101");
        assert_eq!(config.key_dir, Path::new("keys"));
    }

    #[test]
    fn bad_tables_rejected() {
        let cases: [&[u8]; 5] = [
            br#"{ "principals": [{ "id": "A", "key": "zz" }] }"#,
            br#"{ "principals": [{ "id": "A", "key": "0011" }] }"#,
            br#"{ "principals": [{ "id": "a/b", "key": "00112233445566778899aabbccddeeff" }] }"#,
            br#"{ "principals": [
                { "id": "A", "key": "00112233445566778899aabbccddeeff" },
                { "id": "A", "key": "00112233445566778899aabbccddeeff" }
            ] }"#,
            br#"{ "unknown_field": 1 }"#,
        ];

        for json in cases {
            let result = NodeConfig::from_json(json);
            assert!(matches!(result, Err(NodeError::Config(_))), "accepted {json:?}");
        }
    }

    #[test]
    fn port_overflow_rejected() {
        let config = NodeConfig::from_json(br#"{ "base_port": 65535 }"#);
        assert!(matches!(config, Err(NodeError::Config(_))));
    }

    #[test]
    fn timeout_maps_to_driver_config() {
        let config = NodeConfig { step_timeout_secs: Some(3), ..NodeConfig::default() };
        assert_eq!(config.driver_config().step_timeout, Some(Duration::from_secs(3)));
        assert_eq!(NodeConfig::default().driver_config().step_timeout, None);
    }

    #[test]
    fn port_override_keeps_host() {
        assert_eq!(with_port("127.0.0.1:8888", 7000), "127.0.0.1:7000");
        assert_eq!(with_port("kdc", 7000), "kdc:7000");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tessera.json");
        fs::write(&path, serde_json::to_vec_pretty(&NodeConfig::default()).unwrap()).unwrap();

        assert_eq!(NodeConfig::load(&path).unwrap(), NodeConfig::default());
        assert!(matches!(NodeConfig::load(dir.path().join("missing")), Err(NodeError::Config(_))));
    }
}
