//! Vault-style HTTP secret store.
//!
//! Speaks the KV v2 read API: `GET <base>/v1/<mount>/data/<path>` with a
//! token header, payload under `data.data`.

use crate::ports::{PortResult, SecretPayload, SecretStore};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

/// A secret store backed by a Vault HTTP endpoint.
#[derive(Debug, Clone)]
pub struct VaultSecretStore {
    http: reqwest::Client,
    base_url: String,
    mount: String,
    token: String,
}

impl VaultSecretStore {
    /// Creates a client against `base_url` with the default `secret`
    /// mount.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            mount: "secret".to_string(),
            token: token.into(),
        }
    }

    /// Overrides the KV mount.
    #[must_use]
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    /// Overrides the HTTP client, e.g. to set timeouts.
    #[must_use]
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn secret_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}/data/{}",
            self.base_url.trim_end_matches('/'),
            self.mount,
            path
        )
    }
}

#[derive(Debug, Deserialize)]
struct ReadSecretResponse {
    data: ReadSecretData,
}

#[derive(Debug, Deserialize)]
struct ReadSecretData {
    data: SecretPayload,
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn get_secret(&self, path: &str) -> PortResult<SecretPayload> {
        let url = self.secret_url(path);
        let response = self
            .http
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;

        let body: ReadSecretResponse = response
            .json()
            .await
            .with_context(|| format!("decode secret at {path}"))?;
        Ok(body.data.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_urls_use_the_kv_v2_layout() {
        let store = VaultSecretStore::new("http://vault:8200/", "token");
        assert_eq!(
            store.secret_url("systemIntegrations/abc"),
            "http://vault:8200/v1/secret/data/systemIntegrations/abc"
        );
    }

    #[test]
    fn the_mount_is_overridable() {
        let store = VaultSecretStore::new("http://vault:8200", "token").with_mount("platform");
        assert_eq!(
            store.secret_url("x"),
            "http://vault:8200/v1/platform/data/x"
        );
    }

    #[test]
    fn payloads_deserialize_from_the_data_data_envelope() {
        let body: ReadSecretResponse = serde_json::from_value(serde_json::json!({
            "data": {
                "data": { "clientId": "key-1", "clientSecret": "secret-1" }
            }
        }))
        .unwrap();

        assert_eq!(
            body.data.data.get("clientId").and_then(|v| v.as_str()),
            Some("key-1")
        );
    }
}
