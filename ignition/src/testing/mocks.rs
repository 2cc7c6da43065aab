//! Mock port implementations that record calls and take scripted outcomes.

use crate::context::{
    AuthIntegration, EnvSettings, ProviderRecord, SystemCode, SystemConfigRecord,
    SystemProperty,
};
use crate::ports::{
    BoundListener, BrokerConnector, BrokerHandle, ConfigStore, ListenerBinder, PortResult,
    ProviderDirectory, ReferenceStore, SecretPayload, SecretStore,
};
use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use uuid::Uuid;

/// One scripted reply for the single-record configuration query.
#[derive(Debug, Clone)]
pub enum ConfigReply {
    /// The record exists.
    Record(SystemConfigRecord),
    /// The record does not exist yet ("not ready").
    Empty,
    /// The query itself fails.
    Error(String),
}

/// A config store driven by a scripted reply queue.
///
/// An exhausted script is an error, not a silent default, so a test that
/// under-scripts fails fast instead of polling forever.
#[derive(Debug, Default)]
pub struct ScriptedConfigStore {
    replies: Mutex<VecDeque<ConfigReply>>,
    all: Mutex<Vec<SystemConfigRecord>>,
    connect_failure: Mutex<Option<String>>,
    connect_calls: Mutex<u32>,
    find_calls: Mutex<u32>,
}

impl ScriptedConfigStore {
    /// Creates a store with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reply to the script.
    pub fn push_reply(&self, reply: ConfigReply) {
        self.replies.lock().push_back(reply);
    }

    /// Appends `count` not-ready replies.
    pub fn push_empty(&self, count: usize) {
        for _ in 0..count {
            self.push_reply(ConfigReply::Empty);
        }
    }

    /// Appends a populated-record reply.
    pub fn push_record(&self, record: SystemConfigRecord) {
        self.push_reply(ConfigReply::Record(record));
    }

    /// Appends a query-error reply.
    pub fn push_error(&self, message: impl Into<String>) {
        self.push_reply(ConfigReply::Error(message.into()));
    }

    /// Sets the rows returned by the find-all query.
    pub fn set_all(&self, records: Vec<SystemConfigRecord>) {
        *self.all.lock() = records;
    }

    /// Makes `connect` fail with the given message.
    pub fn fail_connect(&self, message: impl Into<String>) {
        *self.connect_failure.lock() = Some(message.into());
    }

    /// How many times `connect` was called.
    #[must_use]
    pub fn connect_calls(&self) -> u32 {
        *self.connect_calls.lock()
    }

    /// How many times the single-record query was called.
    #[must_use]
    pub fn find_calls(&self) -> u32 {
        *self.find_calls.lock()
    }
}

#[async_trait]
impl ConfigStore for ScriptedConfigStore {
    async fn connect(&self, _settings: &EnvSettings) -> PortResult<()> {
        *self.connect_calls.lock() += 1;
        match self.connect_failure.lock().clone() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }

    async fn find_system_config(&self) -> PortResult<Option<SystemConfigRecord>> {
        *self.find_calls.lock() += 1;
        match self.replies.lock().pop_front() {
            Some(ConfigReply::Record(record)) => Ok(Some(record)),
            Some(ConfigReply::Empty) => Ok(None),
            Some(ConfigReply::Error(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("config store script exhausted")),
        }
    }

    async fn find_all_system_configs(&self) -> PortResult<Vec<SystemConfigRecord>> {
        Ok(self.all.lock().clone())
    }
}

/// A reference store serving fixed rows, with an optional blanket failure.
#[derive(Debug, Default)]
pub struct StaticReferenceStore {
    properties: Mutex<Vec<SystemProperty>>,
    codes: Mutex<Vec<SystemCode>>,
    integrations: Mutex<Vec<AuthIntegration>>,
    failure: Mutex<Option<String>>,
}

impl StaticReferenceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the system property rows.
    pub fn set_properties(&self, rows: Vec<SystemProperty>) {
        *self.properties.lock() = rows;
    }

    /// Sets the system code rows.
    pub fn set_codes(&self, rows: Vec<SystemCode>) {
        *self.codes.lock() = rows;
    }

    /// Sets the auth integration rows.
    pub fn set_integrations(&self, rows: Vec<AuthIntegration>) {
        *self.integrations.lock() = rows;
    }

    /// Makes every query fail with the given message.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    fn check_failure(&self) -> PortResult<()> {
        match self.failure.lock().clone() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReferenceStore for StaticReferenceStore {
    async fn find_system_properties(&self) -> PortResult<Vec<SystemProperty>> {
        self.check_failure()?;
        Ok(self.properties.lock().clone())
    }

    async fn find_system_codes(&self) -> PortResult<Vec<SystemCode>> {
        self.check_failure()?;
        Ok(self.codes.lock().clone())
    }

    async fn find_auth_integrations(&self) -> PortResult<Vec<AuthIntegration>> {
        self.check_failure()?;
        Ok(self.integrations.lock().clone())
    }
}

/// A secret store backed by a path → payload map, recording every request.
#[derive(Debug, Default)]
pub struct MapSecretStore {
    secrets: Mutex<HashMap<String, SecretPayload>>,
    failing_paths: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl MapSecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload at `path`.
    pub fn insert_secret(&self, path: impl Into<String>, payload: SecretPayload) {
        self.secrets.lock().insert(path.into(), payload);
    }

    /// Makes requests for `path` fail.
    pub fn fail_path(&self, path: impl Into<String>) {
        self.failing_paths.lock().insert(path.into());
    }

    /// The paths requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SecretStore for MapSecretStore {
    async fn get_secret(&self, path: &str) -> PortResult<SecretPayload> {
        self.requests.lock().push(path.to_string());
        if self.failing_paths.lock().contains(path) {
            return Err(anyhow!("secret store unavailable for {path}"));
        }
        self.secrets
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("secret not found: {path}"))
    }
}

/// A broker connector that records connected URLs and fails on demand.
#[derive(Debug, Default)]
pub struct RecordingBrokerConnector {
    connected: Mutex<Vec<String>>,
    failing_urls: Mutex<HashSet<String>>,
}

impl RecordingBrokerConnector {
    /// Creates a connector where every connect succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes connects to `url` fail.
    pub fn fail_url(&self, url: impl Into<String>) {
        self.failing_urls.lock().insert(url.into());
    }

    /// The URLs successfully connected, in order.
    #[must_use]
    pub fn connected(&self) -> Vec<String> {
        self.connected.lock().clone()
    }
}

#[async_trait]
impl BrokerConnector for RecordingBrokerConnector {
    async fn connect(&self, url: &str) -> PortResult<BrokerHandle> {
        if self.failing_urls.lock().contains(url) {
            return Err(anyhow!("connection refused: {url}"));
        }
        self.connected.lock().push(url.to_string());
        Ok(BrokerHandle::new(url.to_string()))
    }
}

/// A provider directory serving fixed rows, filtered by the queried ids.
#[derive(Debug, Default)]
pub struct StaticProviderDirectory {
    providers: Mutex<Vec<ProviderRecord>>,
    failure: Mutex<Option<String>>,
    queries: Mutex<Vec<Vec<Uuid>>>,
}

impl StaticProviderDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the provider rows.
    pub fn set_providers(&self, rows: Vec<ProviderRecord>) {
        *self.providers.lock() = rows;
    }

    /// Makes the bulk lookup fail with the given message.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// The id sets queried so far.
    #[must_use]
    pub fn queries(&self) -> Vec<Vec<Uuid>> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ProviderDirectory for StaticProviderDirectory {
    async fn find_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<ProviderRecord>> {
        self.queries.lock().push(ids.to_vec());
        if let Some(message) = self.failure.lock().clone() {
            return Err(anyhow!(message));
        }
        Ok(self
            .providers
            .lock()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

/// A bound listener that serves nothing; reports a fixed local address.
#[derive(Debug)]
pub struct NullListener {
    addr: SocketAddr,
}

impl NullListener {
    /// Creates a listener reporting `addr`.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl BoundListener for NullListener {
    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Ok(self.addr)
    }
}

/// A binder whose first N attempts fail with address-in-use.
#[derive(Debug, Default)]
pub struct FlakyBinder {
    failing_attempts: Mutex<u32>,
    attempts: Mutex<u32>,
}

impl FlakyBinder {
    /// Creates a binder that succeeds on the first attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the first `count` attempts fail with address-in-use.
    pub fn fail_first(&self, count: u32) {
        *self.failing_attempts.lock() = count;
    }

    /// How many bind attempts were made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock()
    }
}

#[async_trait]
impl ListenerBinder for FlakyBinder {
    async fn bind(&self, addr: SocketAddr) -> PortResult<Box<dyn BoundListener>> {
        let mut attempts = self.attempts.lock();
        *attempts += 1;
        if *attempts <= *self.failing_attempts.lock() {
            return Err(anyhow::Error::from(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("address already in use: {addr}"),
            )));
        }
        Ok(Box::new(NullListener::new(addr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn scripted_store_replays_in_order() {
        let store = ScriptedConfigStore::new();
        store.push_empty(2);
        store.push_record(fixtures::system_config());

        assert!(store.find_system_config().await.unwrap().is_none());
        assert!(store.find_system_config().await.unwrap().is_none());
        assert!(store.find_system_config().await.unwrap().is_some());
        assert_eq!(store.find_calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_script_fails_fast() {
        let store = ScriptedConfigStore::new();
        assert!(store.find_system_config().await.is_err());
    }

    #[tokio::test]
    async fn flaky_binder_recovers_after_failures() {
        let binder = FlakyBinder::new();
        binder.fail_first(2);
        let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();

        assert!(binder.bind(addr).await.is_err());
        assert!(binder.bind(addr).await.is_err());
        assert!(binder.bind(addr).await.is_ok());
        assert_eq!(binder.attempts(), 3);
    }
}
