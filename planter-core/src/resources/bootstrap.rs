use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{Namespace, Node, Secret},
    ByteString,
};
use kube::core::ObjectMeta;

use crate::versions::KubernetesVersion;

use super::{
    provisioning::{Cluster, ClusterSpec, RkeConfig},
    Document,
};

pub const FLEET_LOCAL_NAMESPACE: &str = "fleet-local";
pub const LOCAL_CLUSTER_NAME: &str = "local";
pub const CLUSTER_STATE_SECRET_NAME: &str = "local-rke-state";
pub const CLUSTER_STATE_SECRET_TYPE: &str = "rke.cattle.io/cluster-state";

const ETCD_ROLE_LABEL: &str = "node-role.kubernetes.io/etcd";
const MANAGEMENT_CLUSTER_LABEL: &str = "provisioning.cattle.io/management-cluster-name";

/// Builds the bootstrap document set: caller resources first, then the four
/// synthetic documents seeding the local cluster, in a fixed order the
/// provisioning layer depends on.
pub fn bootstrap_documents(
    node_name: &str,
    k8s_version: &KubernetesVersion,
    token: &str,
    resources: &[serde_yaml::Value],
) -> Vec<Document> {
    let mut documents: Vec<Document> = resources.iter().cloned().map(Document::Custom).collect();

    documents.push(Document::Node(etcd_node(node_name)));
    documents.push(Document::Namespace(fleet_local_namespace()));
    documents.push(Document::Cluster(local_cluster(k8s_version)));
    documents.push(Document::Secret(cluster_state_secret(token)));

    documents
}

fn etcd_node(name: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            labels: Some(BTreeMap::from([(
                ETCD_ROLE_LABEL.to_owned(),
                "true".to_owned(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn fleet_local_namespace() -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(FLEET_LOCAL_NAMESPACE.to_owned()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn local_cluster(k8s_version: &KubernetesVersion) -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            name: Some(LOCAL_CLUSTER_NAME.to_owned()),
            namespace: Some(FLEET_LOCAL_NAMESPACE.to_owned()),
            labels: Some(BTreeMap::from([(
                MANAGEMENT_CLUSTER_LABEL.to_owned(),
                LOCAL_CLUSTER_NAME.to_owned(),
            )])),
            ..Default::default()
        },
        spec: ClusterSpec {
            kubernetes_version: k8s_version.as_str().to_owned(),
            rke_config: RkeConfig::default(),
        },
    }
}

/// The same token lands under both key names, one read by the server side
/// and one by agents.
fn cluster_state_secret(token: &str) -> Secret {
    let token = ByteString(token.as_bytes().to_vec());

    Secret {
        metadata: ObjectMeta {
            name: Some(CLUSTER_STATE_SECRET_NAME.to_owned()),
            namespace: Some(FLEET_LOCAL_NAMESPACE.to_owned()),
            ..Default::default()
        },
        type_: Some(CLUSTER_STATE_SECRET_TYPE.to_owned()),
        data: Some(BTreeMap::from([
            ("agentToken".to_owned(), token.clone()),
            ("serverToken".to_owned(), token),
        ])),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::resources::serialize_documents;

    fn rke2() -> KubernetesVersion {
        KubernetesVersion::resolve("v1.27.13+rke2r1").unwrap()
    }

    fn decoded_stream(documents: &[Document]) -> Vec<serde_yaml::Value> {
        let data = serialize_documents(documents).unwrap();

        serde_yaml::Deserializer::from_slice(&data)
            .map(|document| serde_yaml::Value::deserialize(document).unwrap())
            .collect()
    }

    #[test]
    fn synthetic_documents_follow_caller_resources() {
        let extra: serde_yaml::Value =
            serde_yaml::from_str("kind: ConfigMap\napiVersion: v1\nmetadata:\n  name: extra\n")
                .unwrap();

        let documents = bootstrap_documents("node-1", &rke2(), "token-1", &[extra]);
        let stream = decoded_stream(&documents);

        let kinds: Vec<&str> = stream
            .iter()
            .map(|document| document["kind"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec!["ConfigMap", "Node", "Namespace", "Cluster", "Secret"]
        );
    }

    #[test]
    fn node_is_labeled_as_etcd() {
        let documents = bootstrap_documents("node-1", &rke2(), "token-1", &[]);
        let stream = decoded_stream(&documents);

        assert_eq!(stream[0]["metadata"]["name"].as_str(), Some("node-1"));
        assert_eq!(
            stream[0]["metadata"]["labels"][ETCD_ROLE_LABEL].as_str(),
            Some("true")
        );
    }

    #[test]
    fn cluster_references_the_resolved_version() {
        let documents = bootstrap_documents("node-1", &rke2(), "token-1", &[]);
        let stream = decoded_stream(&documents);

        assert_eq!(
            stream[2]["spec"]["kubernetesVersion"].as_str(),
            Some("v1.27.13+rke2r1")
        );
        assert!(stream[2]["spec"]["rkeConfig"].is_mapping());
    }

    #[test]
    fn secret_duplicates_the_token() {
        let documents = bootstrap_documents("node-1", &rke2(), "token-1", &[]);
        let stream = decoded_stream(&documents);

        let data = &stream[3]["data"];
        assert_eq!(stream[3]["type"].as_str(), Some(CLUSTER_STATE_SECRET_TYPE));
        assert_eq!(data["serverToken"], data["agentToken"]);
        assert!(!data["serverToken"].as_str().unwrap().is_empty());
    }
}
