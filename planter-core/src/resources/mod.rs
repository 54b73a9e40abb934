use data_encoding::BASE64;
use k8s_openapi::api::core::v1::{Namespace, Node, Secret};
use serde::Serialize;
use thiserror::Error;

use crate::steps::File;

pub mod bootstrap;
pub mod provisioning;
pub mod upgrade;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("serializing manifest document: {}", .0)]
    Serialization(#[from] serde_yaml::Error),
}

/// One manifest document. The closed set of shapes this compiler emits,
/// plus `Custom` for caller-supplied documents carried through verbatim.
/// Serialization is untagged so the stream is plain Kubernetes YAML.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Document {
    Node(Node),
    Namespace(Namespace),
    Cluster(provisioning::Cluster),
    Secret(Secret),
    UpgradePlan(upgrade::Plan),
    Custom(serde_yaml::Value),
}

/// Serializes the documents as one `---`-separated stream, in input order.
pub fn serialize_documents(documents: &[Document]) -> Result<Vec<u8>, ResourceError> {
    let mut data = Vec::new();

    for (index, document) in documents.iter().enumerate() {
        if index > 0 {
            data.extend_from_slice(b"---\n");
        }
        data.extend_from_slice(serde_yaml::to_string(document)?.as_bytes());
    }

    Ok(data)
}

/// Wraps the serialized documents as a file step with transport-safe
/// content. An empty document list produces no step at all; callers skip a
/// `None` rather than treating it as an error.
pub fn manifest_file(documents: &[Document], path: &str) -> Result<Option<File>, ResourceError> {
    if documents.is_empty() {
        return Ok(None);
    }

    let data = serialize_documents(documents)?;

    Ok(Some(File {
        content: BASE64.encode(&data),
        path: path.to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn sample_documents() -> Vec<Document> {
        bootstrap::bootstrap_documents(
            "node-1",
            &crate::versions::KubernetesVersion::resolve("v1.27.13+rke2r1").unwrap(),
            "token-1",
            &[],
        )
    }

    #[test]
    fn empty_documents_produce_no_file() {
        assert!(manifest_file(&[], "/tmp/manifest.yaml").unwrap().is_none());
    }

    #[test]
    fn file_content_decodes_to_the_stream() {
        let documents = sample_documents();
        let file = manifest_file(&documents, "/tmp/manifest.yaml")
            .unwrap()
            .unwrap();

        assert_eq!(file.path, "/tmp/manifest.yaml");
        assert_eq!(
            BASE64.decode(file.content.as_bytes()).unwrap(),
            serialize_documents(&documents).unwrap()
        );
    }

    #[test]
    fn stream_round_trips_losslessly() {
        let encoded = serialize_documents(&sample_documents()).unwrap();

        let decoded: Vec<serde_yaml::Value> = serde_yaml::Deserializer::from_slice(&encoded)
            .map(|document| serde_yaml::Value::deserialize(document).unwrap())
            .collect();
        let reencoded =
            serialize_documents(&decoded.into_iter().map(Document::Custom).collect::<Vec<_>>())
                .unwrap();

        assert_eq!(encoded, reencoded);
    }
}
