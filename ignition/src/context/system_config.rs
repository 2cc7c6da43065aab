//! The system configuration record and the service configuration derived
//! from it.

use crate::errors::ParamReport;
use serde::{Deserialize, Serialize};

/// The single configuration row fetched from the configuration store.
///
/// The record may not exist yet at process start (a separate bootstrap
/// process may still be writing it), and an existing record may be sparsely
/// populated; derivation into [`ServiceConfig`] validates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemConfigRecord {
    /// Application-scope broker URL.
    pub amqp_url: Option<String>,
    /// Root/administrative-scope broker URL.
    pub amqp_url_root: Option<String>,
    /// Broker management endpoint URL.
    pub amqp_url_admin: Option<String>,
    /// Port the service listens on.
    pub api_port: Option<u16>,
    /// Public URL of the service.
    pub api_url: Option<String>,
    /// Token the service uses for its own API calls.
    pub service_user_token: Option<String>,
    /// Frontend URL.
    pub www_url: Option<String>,
    /// Run mode, e.g. `dev` or `production`.
    pub run_mode: Option<String>,
    /// Pipe-delimited list of root queue names.
    pub root_queue_list: Option<String>,
    /// Secret-store endpoint URL.
    pub vault_url: Option<String>,
    /// Secret-store access token.
    pub vault_token: Option<String>,
}

/// Service-wide settings derived from the configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Application-scope broker URL.
    pub amqp_url: String,
    /// Root/administrative-scope broker URL.
    pub root_amqp_url: String,
    /// Broker management endpoint URL.
    pub amqp_management_url: String,
    /// Port the service listens on.
    pub api_port: u16,
    /// Public URL of the service.
    pub api_url: String,
    /// Token the service uses for its own API calls.
    pub api_token: String,
    /// Frontend URL.
    pub frontend_url: String,
    /// Run mode; defaults to `dev` when the record does not set one.
    pub run_mode: String,
    /// Root queue names.
    pub root_queue_list: Vec<String>,
    /// Secret-store endpoint URL, when configured.
    pub vault_url: Option<String>,
    /// Secret-store access token, when configured.
    pub vault_token: Option<String>,
}

impl ServiceConfig {
    /// Derives the service configuration from a fetched record.
    ///
    /// Uses the same accumulate-then-report pattern as environment
    /// validation: every missing field is collected before reporting.
    pub fn derive(record: &SystemConfigRecord) -> Result<Self, ParamReport> {
        let mut report = ParamReport::new();

        let amqp_url = report.require("amqpUrl", record.amqp_url.as_ref());
        let root_amqp_url = report.require("rootAmqpUrl", record.amqp_url_root.as_ref());
        let amqp_management_url =
            report.require("amqpManagementUrl", record.amqp_url_admin.as_ref());
        let api_port = report.require("apiPort", record.api_port);
        let api_url = report.require("apiUrl", record.api_url.as_ref());
        let api_token = report.require("serviceUserToken", record.service_user_token.as_ref());
        let frontend_url = report.require("wwwUrl", record.www_url.as_ref());

        match (
            amqp_url,
            root_amqp_url,
            amqp_management_url,
            api_port,
            api_url,
            api_token,
            frontend_url,
        ) {
            (Some(amqp), Some(root), Some(mgmt), Some(port), Some(api), Some(token), Some(www)) => {
                Ok(Self {
                    amqp_url: amqp.clone(),
                    root_amqp_url: root.clone(),
                    amqp_management_url: mgmt.clone(),
                    api_port: port,
                    api_url: api.clone(),
                    api_token: token.clone(),
                    frontend_url: www.clone(),
                    run_mode: record.run_mode.clone().unwrap_or_else(|| "dev".to_string()),
                    root_queue_list: record
                        .root_queue_list
                        .as_deref()
                        .map(split_queue_list)
                        .unwrap_or_default(),
                    vault_url: record.vault_url.clone(),
                    vault_token: record.vault_token.clone(),
                })
            }
            _ => Err(report),
        }
    }
}

fn split_queue_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
