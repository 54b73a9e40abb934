use std::str::FromStr;

use thiserror::Error;

pub const ETCD_ROLE: &str = "etcd";
pub const CONTROL_PLANE_ROLE: &str = "control-plane";
pub const WORKER_ROLE: &str = "worker";

#[derive(Debug, Error)]
#[error("invalid role ({0}) defined")]
pub struct InvalidRoleError(pub String);

/// The three orthogonal capabilities a node can take in the cluster. Parsed
/// once from the comma-separated role string; the compiler only ever sees
/// these booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet {
    pub etcd: bool,
    pub control_plane: bool,
    pub worker: bool,
}

impl RoleSet {
    /// Matches known role tokens case-sensitively; unknown tokens are
    /// ignored so the set can end up empty.
    pub fn classify(role: &str) -> Self {
        let mut roles = Self::default();

        for token in role.split(',').map(str::trim) {
            match token {
                ETCD_ROLE => roles.etcd = true,
                CONTROL_PLANE_ROLE => roles.control_plane = true,
                WORKER_ROLE => roles.worker = true,
                _ => (),
            }
        }

        roles
    }

    pub fn is_empty(&self) -> bool {
        !(self.etcd || self.control_plane || self.worker)
    }
}

impl FromStr for RoleSet {
    type Err = InvalidRoleError;

    fn from_str(role: &str) -> Result<Self, Self::Err> {
        let roles = Self::classify(role);
        if roles.is_empty() {
            return Err(InvalidRoleError(role.to_owned()));
        }

        Ok(roles)
    }
}
