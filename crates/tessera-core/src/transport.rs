//! Transport abstraction for network I/O.
//!
//! The `Transport` trait abstracts over reliable, bidirectional byte streams.
//! This allows the same drivers to run over:
//!
//! - **TCP streams** (production via tokio, in `tessera-node`)
//! - **Simulated TCP streams** (deterministic testing via Turmoil)
//!
//! Every protocol message is one [`Frame`]: a fixed 12-byte header followed
//! by exactly `payload_size` bytes. [`read_frame`] and [`write_frame`] do the
//! framing on top of any stream half.

use std::io;

use async_trait::async_trait;
use tessera_proto::{Frame, FrameHeader};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::SessionError;

/// Abstract transport for reliable, ordered byte streams.
///
/// # Lifecycle
///
/// ```text
/// Listener:                    Dialer:
/// bind (implementation)        connect(addr)
///   ↓                            ↓
/// accept()                     [(send, recv) returned]
///   ↓
/// [(send, recv) returned]
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Type of stream for sending data.
    type SendStream: AsyncWrite + Unpin + Send + 'static;

    /// Type of stream for receiving data.
    type RecvStream: AsyncRead + Unpin + Send + 'static;

    /// Accepts an incoming connection, returning send/receive streams.
    ///
    /// Blocks until a peer connects.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if the listener is shut down or the network
    /// fails.
    async fn accept(&self) -> io::Result<(Self::SendStream, Self::RecvStream)>;

    /// Connects to `remote`, returning send/receive streams.
    ///
    /// `remote` is a `host:port` string. Real transports resolve it with
    /// DNS; the simulator resolves simulated host names.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if the remote is unreachable or refuses the
    /// connection.
    async fn connect(&self, remote: &str) -> io::Result<(Self::SendStream, Self::RecvStream)>;
}

/// Read exactly one frame from `recv`.
///
/// The header is validated before the payload buffer is allocated, so a peer
/// cannot make us allocate more than
/// [`FrameHeader::MAX_PAYLOAD_SIZE`] bytes.
///
/// # Errors
///
/// - [`SessionError::Connection`] on EOF or reset
/// - [`SessionError::MalformedMessage`] if the header is invalid
pub async fn read_frame<R>(recv: &mut R) -> Result<Frame, SessionError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header_bytes = [0u8; FrameHeader::SIZE];
    recv.read_exact(&mut header_bytes).await?;

    let header = *FrameHeader::from_bytes(&header_bytes)?;

    let mut payload = vec![0u8; header.payload_size() as usize];
    recv.read_exact(&mut payload).await?;

    Ok(Frame::new(header, payload))
}

/// Write one frame to `send` and flush it.
///
/// # Errors
///
/// - [`SessionError::MalformedMessage`] if the payload exceeds the size limit
/// - [`SessionError::Connection`] if the write fails
pub async fn write_frame<W>(send: &mut W, frame: &Frame) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let bytes = frame.to_vec()?;
    send.write_all(&bytes).await?;
    send.flush().await?;
    Ok(())
}
