use crate::versions::{Distro, KubernetesVersion};

/// Composes the system-agent installer image reference for the resolved
/// distribution. A non-empty override wins verbatim.
pub fn installer_image(
    image_override: &str,
    system_default_registry: &str,
    version: &KubernetesVersion,
) -> String {
    if !image_override.is_empty() {
        return image_override.to_owned();
    }

    let repository = match version.distro() {
        Distro::Rke2 => "rancher/system-agent-installer-rke2",
        Distro::K3s => "rancher/system-agent-installer-k3s",
    };

    if system_default_registry.is_empty() {
        format!("{}:{}", repository, version.image_tag())
    } else {
        format!(
            "{}/{}:{}",
            system_default_registry.trim_end_matches('/'),
            repository,
            version.image_tag()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versions::KubernetesVersion;

    fn rke2() -> KubernetesVersion {
        KubernetesVersion::resolve("v1.27.13+rke2r1").unwrap()
    }

    #[test]
    fn tag_never_contains_build_metadata_separator() {
        for registry in ["", "registry.example.com", "registry.example.com/"] {
            let image = installer_image("", registry, &rke2());

            assert!(image.contains("v1.27.13-rke2r1"), "{image}");
            assert!(!image.contains('+'), "{image}");
        }
    }

    #[test]
    fn registry_prefixes_the_repository() {
        assert_eq!(
            installer_image("", "registry.example.com", &rke2()),
            "registry.example.com/rancher/system-agent-installer-rke2:v1.27.13-rke2r1"
        );
        assert_eq!(
            installer_image("", "", &rke2()),
            "rancher/system-agent-installer-rke2:v1.27.13-rke2r1"
        );
    }

    #[test]
    fn override_wins_verbatim() {
        assert_eq!(
            installer_image("custom/installer:v1", "registry.example.com", &rke2()),
            "custom/installer:v1"
        );
    }

    #[test]
    fn k3s_uses_its_own_repository() {
        let k3s = KubernetesVersion::resolve("v1.27.4+k3s1").unwrap();

        assert_eq!(
            installer_image("", "", &k3s),
            "rancher/system-agent-installer-k3s:v1.27.4-k3s1"
        );
    }
}
