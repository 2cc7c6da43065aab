//! Record fixtures shared across unit and scenario tests.

use crate::context::{
    AuthIntegration, EnvMap, ProviderRecord, SystemCode, SystemConfigRecord, SystemProperty,
    REQUIRED_ENV_KEYS,
};
use crate::ports::SecretPayload;
use uuid::Uuid;

/// A complete environment map covering every required key.
#[must_use]
pub fn env_map() -> EnvMap {
    REQUIRED_ENV_KEYS
        .iter()
        .map(|key| ((*key).to_string(), format!("{}-value", key.to_lowercase())))
        .collect()
}

/// A fully-populated system configuration record.
#[must_use]
pub fn system_config() -> SystemConfigRecord {
    SystemConfigRecord {
        amqp_url: Some("amqp://broker:5672".to_string()),
        amqp_url_root: Some("amqp://root@broker:5672".to_string()),
        amqp_url_admin: Some("http://broker:15672".to_string()),
        api_port: Some(8080),
        api_url: Some("https://api.example.com".to_string()),
        service_user_token: Some("service-token".to_string()),
        www_url: Some("https://www.example.com".to_string()),
        run_mode: Some("production".to_string()),
        root_queue_list: Some("core|www|sync".to_string()),
        vault_url: Some("http://vault:8200".to_string()),
        vault_token: Some("vault-token".to_string()),
    }
}

/// An auth integration row as loaded from the reference store.
#[must_use]
pub fn auth_integration(name: &str) -> AuthIntegration {
    AuthIntegration::new(Uuid::new_v4(), name)
}

/// A secret payload carrying the provider id and credential pair.
#[must_use]
pub fn secret_payload(provider_id: Uuid, client_id: &str, client_secret: &str) -> SecretPayload {
    let mut payload = SecretPayload::new();
    payload.insert(
        "providerId".to_string(),
        serde_json::Value::String(provider_id.to_string()),
    );
    payload.insert(
        "clientId".to_string(),
        serde_json::Value::String(client_id.to_string()),
    );
    payload.insert(
        "clientSecret".to_string(),
        serde_json::Value::String(client_secret.to_string()),
    );
    payload
}

/// A provider record.
#[must_use]
pub fn provider(id: Uuid, url: &str) -> ProviderRecord {
    ProviderRecord {
        id,
        name: "bitbucket".to_string(),
        url: url.to_string(),
    }
}

/// A handful of system property rows.
#[must_use]
pub fn system_properties() -> Vec<SystemProperty> {
    ["amqpUrl", "wwwUrl", "apiPort"]
        .iter()
        .map(|field| SystemProperty {
            id: Uuid::new_v4(),
            field_name: (*field).to_string(),
        })
        .collect()
}

/// A handful of system code rows.
#[must_use]
pub fn system_codes() -> Vec<SystemCode> {
    vec![
        SystemCode {
            name: "user".to_string(),
            code: 1000,
            group: "roles".to_string(),
        },
        SystemCode {
            name: "admin".to_string(),
            code: 1001,
            group: "roles".to_string(),
        },
    ]
}
