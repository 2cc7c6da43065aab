//! Environment-derived settings and their validation.

use crate::errors::ParamReport;
use std::collections::BTreeMap;

/// The raw environment key/value inputs, captured once at startup.
pub type EnvMap = BTreeMap<String, String>;

/// Captures the current process environment.
#[must_use]
pub fn process_env() -> EnvMap {
    std::env::vars().collect()
}

/// The environment keys that must be present before the config store is
/// connected.
pub const REQUIRED_ENV_KEYS: [&str; 6] = [
    "DBNAME",
    "DBUSERNAME",
    "DBPASSWORD",
    "DBHOST",
    "DBPORT",
    "DBDIALECT",
];

/// Validated database connection settings.
///
/// All fields are opaque to the orchestrator; they are handed to the config
/// store collaborator as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    /// Database name.
    pub db_name: String,
    /// Database username.
    pub db_username: String,
    /// Database password.
    pub db_password: String,
    /// Database host.
    pub db_host: String,
    /// Database port.
    pub db_port: String,
    /// Database dialect.
    pub db_dialect: String,
}

impl EnvSettings {
    /// Validates the required environment keys.
    ///
    /// Every key is checked before reporting; a failure lists exactly the
    /// missing keys, never just the first one.
    pub fn from_env(env: &EnvMap) -> Result<Self, ParamReport> {
        let mut report = ParamReport::new();

        let db_name = report.require("DBNAME", env.get("DBNAME"));
        let db_username = report.require("DBUSERNAME", env.get("DBUSERNAME"));
        let db_password = report.require("DBPASSWORD", env.get("DBPASSWORD"));
        let db_host = report.require("DBHOST", env.get("DBHOST"));
        let db_port = report.require("DBPORT", env.get("DBPORT"));
        let db_dialect = report.require("DBDIALECT", env.get("DBDIALECT"));

        match (db_name, db_username, db_password, db_host, db_port, db_dialect) {
            (Some(name), Some(username), Some(password), Some(host), Some(port), Some(dialect)) => {
                Ok(Self {
                    db_name: name.clone(),
                    db_username: username.clone(),
                    db_password: password.clone(),
                    db_host: host.clone(),
                    db_port: port.clone(),
                    db_dialect: dialect.clone(),
                })
            }
            _ => Err(report),
        }
    }
}
