use std::{fs, io, path::Path};

use derive_builder::Builder;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {}", .0)]
    IoError(std::io::Error),
    #[error("deserialization error: {}", .0)]
    DeserializationError(serde_yaml::Error),
}

/// Declarative cluster-membership configuration, immutable for one
/// compilation run. An empty `token` marks the first-node case; an empty
/// `node_name` defers to the local hostname.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
#[serde(default, rename_all = "camelCase")]
#[builder(default, setter(into))]
pub struct Config {
    pub server: String,
    pub token: String,
    pub role: String,
    pub kubernetes_version: String,
    pub node_name: String,
    pub address: String,
    pub internal_address: String,
    pub labels: Vec<String>,
    pub taints: Vec<String>,
    pub runtime_installer_image: String,
    pub system_default_registry: String,
    /// caller-supplied resource documents applied ahead of the synthetic
    /// bootstrap documents
    pub resources: Vec<serde_yaml::Value>,
}

impl Config {
    /// A missing config file is an empty config; role validation downstream
    /// rejects it if that is not enough to compile anything.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Used config path: {path:?}");

        match fs::read(path) {
            Ok(data) if data.iter().all(u8::is_ascii_whitespace) => Ok(Self::default()),
            Ok(data) => serde_yaml::from_slice(&data).map_err(ConfigError::DeserializationError),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(ConfigError::IoError(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "server: https://vip:443\ntoken: abc\nrole: worker\nkubernetesVersion: v1.27.13+rke2r1\nnodeName: node-1\nlabels:\n- env=test\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.server, "https://vip:443");
        assert_eq!(config.kubernetes_version, "v1.27.13+rke2r1");
        assert_eq!(config.node_name, "node-1");
        assert_eq!(config.labels, vec!["env=test"]);
    }

    #[test]
    fn missing_file_is_an_empty_config() {
        let dir = tempfile::tempdir().unwrap();

        let config = Config::load(&dir.path().join("absent.yaml")).unwrap();

        assert!(config.server.is_empty());
        assert!(config.resources.is_empty());
    }

    #[test]
    fn builder_assembles_a_config() {
        let config = ConfigBuilder::default()
            .server("https://vip:443")
            .role("worker")
            .token("abc")
            .build()
            .unwrap();

        assert_eq!(config.role, "worker");
        assert!(config.node_name.is_empty());
    }
}
