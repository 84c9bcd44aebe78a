//! Turmoil-based Transport implementation using simulated TCP streams.

use std::io;

use async_trait::async_trait;
use tessera_core::Transport;
use tokio::io::{ReadHalf, WriteHalf};
use turmoil::net::{TcpListener, TcpStream};

/// [`Transport`] over turmoil's deterministic TCP.
///
/// Addresses are `host:port` strings naming simulated hosts, e.g.
/// `"kdc:8888"`. Turmoil decides delivery order and timing and can inject
/// partitions and latency.
pub struct SimTransport {
    listener: Option<TcpListener>,
}

impl std::fmt::Debug for SimTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimTransport").field("listening", &self.listener.is_some()).finish()
    }
}

impl SimTransport {
    /// Bind a listener inside the current simulated host
    /// (e.g. `"0.0.0.0:9000"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the port is already bound on this host.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener: Some(listener) })
    }

    /// Transport that only dials.
    #[must_use]
    pub fn dialer() -> Self {
        Self { listener: None }
    }
}

#[async_trait]
impl Transport for SimTransport {
    type SendStream = WriteHalf<TcpStream>;
    type RecvStream = ReadHalf<TcpStream>;

    async fn accept(&self) -> io::Result<(Self::SendStream, Self::RecvStream)> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "transport is not listening")
        })?;
        let (stream, _peer) = listener.accept().await?;
        let (recv, send) = tokio::io::split(stream);
        Ok((send, recv))
    }

    async fn connect(&self, remote: &str) -> io::Result<(Self::SendStream, Self::RecvStream)> {
        let stream = TcpStream::connect(remote).await?;
        let (recv, send) = tokio::io::split(stream);
        Ok((send, recv))
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::transport::{read_frame, write_frame};
    use tessera_proto::{Frame, FrameHeader, Opcode};

    use super::*;

    #[test]
    fn frames_cross_the_simulated_network() {
        let mut sim = turmoil::Builder::new().build();

        sim.host("server", || async {
            let transport = SimTransport::bind("0.0.0.0:700").await?;
            let (mut send, mut recv) = transport.accept().await?;

            let frame = read_frame(&mut recv).await?;
            write_frame(&mut send, &frame).await?;
            Ok(())
        });

        sim.client("client", async {
            let frame = Frame::new(FrameHeader::new(Opcode::AuthRequest), vec![5u8; 20]);
            let (mut send, mut recv) = SimTransport::dialer().connect("server:700").await?;

            write_frame(&mut send, &frame).await?;
            assert_eq!(read_frame(&mut recv).await?, frame);
            Ok(())
        });

        sim.run().unwrap();
    }

    #[test]
    fn debug_shows_listener_presence() {
        assert_eq!(format!("{:?}", SimTransport::dialer()), "SimTransport { listening: false }");
    }

    #[test]
    fn dialing_a_silent_host_fails() {
        let mut sim = turmoil::Builder::new().build();

        sim.host("server", || async {
            std::future::pending::<()>().await;
            Ok(())
        });

        sim.client("client", async {
            let result = SimTransport::dialer().connect("server:700").await;
            assert!(result.is_err());
            Ok(())
        });

        sim.run().unwrap();
    }
}
