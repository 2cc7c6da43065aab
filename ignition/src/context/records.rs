//! Reference-data and integration record types threaded through bootstrap.

use crate::ports::BrokerHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A system property row; bootstrap caches the plucked field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProperty {
    /// Row id.
    pub id: Uuid,
    /// The property's field name.
    pub field_name: String,
}

/// A system code row, cached whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemCode {
    /// Code name.
    pub name: String,
    /// Numeric code.
    pub code: i64,
    /// Code group.
    pub group: String,
}

/// One label/value pair from a flattened secret payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValue {
    /// The payload key.
    pub label: String,
    /// The payload value, stringified.
    pub value: String,
}

/// An auth integration row: one per configured external identity provider
/// needing a client key/secret pair.
///
/// Enriched in place during bootstrap: first with the flattened secret
/// payload, then with the provider id and credential pair derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthIntegration {
    /// Row id; also keys the integration's secret-store entry.
    pub id: Uuid,
    /// Provider name, e.g. `bitbucket`.
    pub name: String,
    /// Integration category; auth integrations carry `auth`.
    pub master_type: String,
    /// Flattened secret payload, populated by the secret-fetch stage.
    #[serde(default)]
    pub form_values: Vec<FormValue>,
    /// Provider id derived from the payload.
    #[serde(default)]
    pub provider_id: Option<Uuid>,
    /// Client key derived from the payload.
    #[serde(default)]
    pub client_key: Option<String>,
    /// Client secret derived from the payload.
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl AuthIntegration {
    /// Creates an integration row as loaded from the reference store.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            master_type: "auth".to_string(),
            form_values: Vec::new(),
            provider_id: None,
            client_key: None,
            client_secret: None,
        }
    }

    /// Looks up a flattened payload value by label.
    #[must_use]
    pub fn form_value(&self, label: &str) -> Option<&str> {
        self.form_values
            .iter()
            .find(|v| v.label == label)
            .map(|v| v.value.as_str())
    }
}

/// Reference data identifying an external identity provider by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    /// Provider id, referenced by derived integration credentials.
    pub id: Uuid,
    /// Provider name.
    pub name: String,
    /// The provider's external URL; keys the published credential map.
    pub url: String,
}

/// A client key/secret pair published per provider URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerCredentials {
    /// OAuth client key.
    pub client_key: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Which broker a connection descriptor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerScope {
    /// The application-scope broker.
    App,
    /// The root/administrative-scope broker.
    Root,
}

impl fmt::Display for BrokerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::Root => write!(f, "root"),
        }
    }
}

/// Pairs a broker target URL with the slot holding its live connection.
#[derive(Debug, Clone)]
pub struct BrokerBinding {
    /// The broker scope.
    pub scope: BrokerScope,
    /// The target URL.
    pub url: String,
    /// The live connection handle, populated on successful connect.
    pub handle: Option<BrokerHandle>,
}

impl BrokerBinding {
    /// Creates an unconnected binding.
    #[must_use]
    pub fn new(scope: BrokerScope, url: impl Into<String>) -> Self {
        Self {
            scope,
            url: url.into(),
            handle: None,
        }
    }

    /// Returns true once the binding holds a live connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }
}

/// Reference data cached during bootstrap and read-mostly thereafter.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCaches {
    /// Plucked system property field names.
    pub property_names: Vec<String>,
    /// System code rows.
    pub codes: Vec<SystemCode>,
    /// The first row of the full configuration scan.
    pub primary_config: Option<super::SystemConfigRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_value_lookup_finds_by_label() {
        let mut integration = AuthIntegration::new(Uuid::new_v4(), "bitbucket");
        integration.form_values = vec![
            FormValue {
                label: "clientId".to_string(),
                value: "key-1".to_string(),
            },
            FormValue {
                label: "clientSecret".to_string(),
                value: "secret-1".to_string(),
            },
        ];

        assert_eq!(integration.form_value("clientId"), Some("key-1"));
        assert_eq!(integration.form_value("providerId"), None);
    }

    #[test]
    fn broker_binding_starts_unconnected() {
        let binding = BrokerBinding::new(BrokerScope::App, "amqp://broker:5672");
        assert!(!binding.is_connected());
        assert_eq!(binding.scope.to_string(), "app");
    }
}
