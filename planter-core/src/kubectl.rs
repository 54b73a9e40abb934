use crate::versions::{Distro, KubernetesVersion};

/// Path of the kubectl binary shipped by the resolved distribution.
pub fn command(version: &KubernetesVersion) -> String {
    match version.distro() {
        Distro::Rke2 => "/var/lib/rancher/rke2/bin/kubectl".to_owned(),
        Distro::K3s => "/usr/local/bin/kubectl".to_owned(),
    }
}

/// Environment lines pointing kubectl at the distribution's admin kubeconfig.
pub fn env(version: &KubernetesVersion) -> Vec<String> {
    match version.distro() {
        Distro::Rke2 => vec!["KUBECONFIG=/etc/rancher/rke2/rke2.yaml".to_owned()],
        Distro::K3s => vec!["KUBECONFIG=/etc/rancher/k3s/k3s.yaml".to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_and_env_follow_the_distro() {
        let rke2 = KubernetesVersion::resolve("v1.27.13+rke2r1").unwrap();
        let k3s = KubernetesVersion::resolve("v1.27.4+k3s1").unwrap();

        assert_eq!(command(&rke2), "/var/lib/rancher/rke2/bin/kubectl");
        assert_eq!(env(&rke2), vec!["KUBECONFIG=/etc/rancher/rke2/rke2.yaml"]);
        assert_eq!(command(&k3s), "/usr/local/bin/kubectl");
        assert_eq!(env(&k3s), vec!["KUBECONFIG=/etc/rancher/k3s/k3s.yaml"]);
    }
}
