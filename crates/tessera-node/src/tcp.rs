//! Tokio TCP implementation of [`Transport`].

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use tessera_core::Transport;
use tokio::net::{
    TcpListener, TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

/// TCP transport.
///
/// A transport created with [`TcpTransport::bind`] can both accept and
/// dial; one created with [`TcpTransport::dialer`] can only dial.
#[derive(Debug)]
pub struct TcpTransport {
    listener: Option<TcpListener>,
}

impl TcpTransport {
    /// Bind a listener on `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns the bind error, e.g. if the port is in use.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener: Some(listener) })
    }

    /// Transport that only opens outbound connections.
    #[must_use]
    pub fn dialer() -> Self {
        Self { listener: None }
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` for a dial-only transport.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener()?.local_addr()
    }

    fn listener(&self) -> io::Result<&TcpListener> {
        self.listener.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "transport is not listening")
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type SendStream = OwnedWriteHalf;
    type RecvStream = OwnedReadHalf;

    async fn accept(&self) -> io::Result<(Self::SendStream, Self::RecvStream)> {
        let (stream, peer) = self.listener()?.accept().await?;
        tracing::debug!(%peer, "accepted connection");
        split(stream)
    }

    async fn connect(&self, remote: &str) -> io::Result<(Self::SendStream, Self::RecvStream)> {
        let stream = TcpStream::connect(remote).await?;
        split(stream)
    }
}

fn split(stream: TcpStream) -> io::Result<(OwnedWriteHalf, OwnedReadHalf)> {
    stream.set_nodelay(true)?;
    let (recv, send) = stream.into_split();
    Ok((send, recv))
}
