use data_encoding::HEXLOWER;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const INSTALL_SCRIPT_ENDPOINT: &str = "/system-agent-install.sh";
pub const CACERTS_ENDPOINT: &str = "/cacerts";

#[derive(Debug, Error)]
pub enum TrustFetchError {
    #[error("requesting {url}: {source}")]
    Transport { url: String, source: reqwest::Error },
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: StatusCode },
    #[error("verifying the CA certificate from {server}: {reason}")]
    Verification { server: String, reason: String },
    #[error("building http client: {}", .0)]
    Client(reqwest::Error),
}

/// Black-box collaborator fetching trust material from the cluster's
/// bootstrap endpoint. No caching and no retry here: every compilation must
/// observe current server state, and retry belongs to the emitted steps.
#[allow(async_fn_in_trait)]
pub trait TrustFetcher {
    async fn install_script(&self, server: &str, token: &str) -> Result<Vec<u8>, TrustFetchError>;
    async fn ca_checksum(
        &self,
        server: &str,
        token: &str,
        verify: bool,
    ) -> Result<String, TrustFetchError>;
}

/// Fetches over HTTPS without certificate validation; the whole point of the
/// exchange is to learn the cluster CA before it can be trusted. `verify`
/// re-issues the request against a client pinned to the fetched CA.
#[derive(Default)]
pub struct HttpTrustFetcher;

impl HttpTrustFetcher {
    fn insecure_client() -> Result<Client, TrustFetchError> {
        Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(TrustFetchError::Client)
    }

    async fn fetch(
        &self,
        client: &Client,
        server: &str,
        token: &str,
        endpoint: &str,
    ) -> Result<Vec<u8>, TrustFetchError> {
        let url = format!("{}{}", server.trim_end_matches('/'), endpoint);

        let mut request = client.get(&url);
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|source| TrustFetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrustFetchError::Status { url, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| TrustFetchError::Transport { url, source })?;

        Ok(body.to_vec())
    }
}

impl TrustFetcher for HttpTrustFetcher {
    async fn install_script(&self, server: &str, token: &str) -> Result<Vec<u8>, TrustFetchError> {
        self.fetch(&Self::insecure_client()?, server, token, INSTALL_SCRIPT_ENDPOINT)
            .await
    }

    async fn ca_checksum(
        &self,
        server: &str,
        token: &str,
        verify: bool,
    ) -> Result<String, TrustFetchError> {
        let ca = self
            .fetch(&Self::insecure_client()?, server, token, CACERTS_ENDPOINT)
            .await?;

        if verify {
            let certificate = reqwest::Certificate::from_pem(&ca).map_err(|error| {
                TrustFetchError::Verification {
                    server: server.to_owned(),
                    reason: error.to_string(),
                }
            })?;
            let pinned = Client::builder()
                .add_root_certificate(certificate)
                .tls_built_in_root_certs(false)
                .build()
                .map_err(TrustFetchError::Client)?;

            let confirmed = self
                .fetch(&pinned, server, token, CACERTS_ENDPOINT)
                .await
                .map_err(|error| TrustFetchError::Verification {
                    server: server.to_owned(),
                    reason: error.to_string(),
                })?;

            if confirmed != ca {
                return Err(TrustFetchError::Verification {
                    server: server.to_owned(),
                    reason: "CA certificate changed between fetches".to_owned(),
                });
            }
        }

        Ok(ca_fingerprint(&ca))
    }
}

/// Lowercase hex SHA-256 over the CA bundle bytes, the value the install
/// script pins trust with.
pub fn ca_fingerprint(ca: &[u8]) -> String {
    HEXLOWER.encode(&Sha256::digest(ca))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_matches_known_vector() {
        assert_eq!(
            ca_fingerprint(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(ca_fingerprint(b"ca"), ca_fingerprint(b"ca"));
        assert_ne!(ca_fingerprint(b"ca"), ca_fingerprint(b"other"));
    }
}
