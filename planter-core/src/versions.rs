use regex::Regex;
use thiserror::Error;

const VERSION_SCHEMES: &str = r"^v\d+\.\d+\.\d+\+(rke2r\d+|k3s\d+)$";

#[derive(Debug, Error)]
#[error("unsupported kubernetes version ({0})")]
pub struct UnsupportedVersionError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    Rke2,
    K3s,
}

/// A requested version string resolved against the known distribution
/// schemes. Resolution is a pure mapping with no network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubernetesVersion {
    version: String,
    distro: Distro,
}

impl KubernetesVersion {
    pub fn resolve(requested: &str) -> Result<Self, UnsupportedVersionError> {
        let scheme = Regex::new(VERSION_SCHEMES).expect("hard-coded pattern");
        if !scheme.is_match(requested) {
            return Err(UnsupportedVersionError(requested.to_owned()));
        }

        let distro = if requested.contains("+rke2r") {
            Distro::Rke2
        } else {
            Distro::K3s
        };

        Ok(Self {
            version: requested.to_owned(),
            distro,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.version
    }

    pub fn distro(&self) -> Distro {
        self.distro
    }

    /// Container tags reject `+`, so build metadata is joined with `-`
    /// instead (v1.27.13+rke2r1 becomes v1.27.13-rke2r1).
    pub fn image_tag(&self) -> String {
        self.version.replace('+', "-")
    }
}
