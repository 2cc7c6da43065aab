//! TCP listener binding over tokio.

use crate::ports::{BoundListener, ListenerBinder, PortResult};
use anyhow::Context;
use async_trait::async_trait;
use std::net::SocketAddr;

/// Binds TCP listeners with `tokio::net`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpListenerBinder;

impl TcpListenerBinder {
    /// Creates the binder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ListenerBinder for TcpListenerBinder {
    async fn bind(&self, addr: SocketAddr) -> PortResult<Box<dyn BoundListener>> {
        let inner = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind {addr}"))?;
        Ok(Box::new(TcpBoundListener { inner }))
    }
}

/// A live TCP listener.
///
/// The web-framework collaborator takes ownership via [`Self::into_inner`]
/// to start serving.
#[derive(Debug)]
pub struct TcpBoundListener {
    inner: tokio::net::TcpListener,
}

impl TcpBoundListener {
    /// Borrows the underlying listener.
    #[must_use]
    pub fn inner(&self) -> &tokio::net::TcpListener {
        &self.inner
    }

    /// Takes ownership of the underlying listener.
    #[must_use]
    pub fn into_inner(self) -> tokio::net::TcpListener {
        self.inner
    }
}

impl BoundListener for TcpBoundListener {
    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::is_addr_in_use;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let binder = TcpListenerBinder::new();
        let listener = binder.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn a_held_port_surfaces_addr_in_use() {
        let binder = TcpListenerBinder::new();
        let first = binder.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr().unwrap();

        let err = binder.bind(taken).await.unwrap_err();
        assert!(is_addr_in_use(&err));
    }
}
