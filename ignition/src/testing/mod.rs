//! Test support: mock ports and record fixtures.
//!
//! The mocks record their calls and take scripted failures so unit and
//! scenario tests can drive every bootstrap path without real
//! collaborators.

pub mod fixtures;
pub mod mocks;

pub use mocks::{
    ConfigReply, FlakyBinder, MapSecretStore, NullListener, RecordingBrokerConnector,
    ScriptedConfigStore, StaticProviderDirectory, StaticReferenceStore,
};
