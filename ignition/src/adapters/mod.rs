//! Provided collaborator adapters.
//!
//! Most collaborators (web framework, ORM, broker client) are supplied by
//! the embedding service; these are the two the stack covers natively.

pub mod net;

#[cfg(feature = "vault")]
pub mod vault;

pub use net::{TcpBoundListener, TcpListenerBinder};

#[cfg(feature = "vault")]
pub use vault::VaultSecretStore;
