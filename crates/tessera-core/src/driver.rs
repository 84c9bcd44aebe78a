//! Async drivers: run one protocol role over a pair of stream halves.
//!
//! Drivers are the only code in this crate that awaits. Each one reads a
//! frame, feeds it to a state machine, executes the returned
//! [`SessionAction`]s and repeats until the run ends. They never spawn tasks
//! and never panic; the outcome is returned to the caller (an accept loop or
//! a command handler), which decides what to do with it.
//!
//! Every failure is logged once here, with the role, the peer (when known)
//! and the step that was in progress.

use std::{future::Future, time::Duration};

use tessera_proto::{KeyMaterial, PrincipalId};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::{
    crypto::AeadChannel,
    env::Environment,
    error::SessionError,
    initiator::InitiatorSession,
    kdc::KdcService,
    responder::ResponderSession,
    session::SessionAction,
    transport::{Transport, read_frame, write_frame},
};

/// Driver configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverConfig {
    /// Upper bound on each wait for a peer message. `None` waits forever.
    pub step_timeout: Option<Duration>,
}

/// A completed, mutually authenticated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Established {
    /// The other principal of the pair
    pub peer: PrincipalId,
    /// Agreed session key
    pub session_key: KeyMaterial,
}

/// Executes protocol runs with a fixed environment and AEAD.
#[derive(Debug, Clone)]
pub struct Driver<E, A> {
    env: E,
    aead: A,
    config: DriverConfig,
}

impl<E, A> Driver<E, A>
where
    E: Environment,
    A: AeadChannel + Clone,
{
    /// Create a driver.
    pub fn new(env: E, aead: A, config: DriverConfig) -> Self {
        Self { env, aead, config }
    }

    /// Environment used for timeouts and randomness
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Driver configuration
    pub fn config(&self) -> DriverConfig {
        self.config
    }

    /// KDC: answer the single request on this connection.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the run. For an unknown
    /// principal nothing is written back.
    pub async fn serve_kdc_connection<S, R>(
        &self,
        kdc: &KdcService,
        send: &mut S,
        recv: &mut R,
    ) -> Result<(), SessionError>
    where
        S: AsyncWrite + Unpin + Send,
        R: AsyncRead + Unpin + Send,
    {
        let mut step = "auth_request";
        let result = async {
            let request = self.bounded("auth_request", read_frame(recv)).await?;
            let actions = kdc.handle_frame(&request, &self.env, &self.aead)?;
            step = "kdc_reply";
            execute(send, actions).await?;
            Ok::<(), SessionError>(())
        }
        .await;

        if let Err(err) = &result {
            tracing::warn!(role = "kdc", step, error = %err, "request dropped");
        }
        result
    }

    /// Initiator: obtain a ticket from the KDC at `kdc_addr`, deliver it to
    /// the responder at `responder_addr` and answer its challenge.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the run. A rejected KDC reply
    /// aborts before the responder is contacted.
    pub async fn run_initiator<T: Transport>(
        &self,
        transport: &T,
        mut session: InitiatorSession,
        kdc_addr: &str,
        responder_addr: &str,
    ) -> Result<Established, SessionError> {
        let peer = session.peer().clone();
        let mut step = "connect_kdc";

        let result = async {
            let (mut kdc_send, mut kdc_recv) = transport.connect(kdc_addr).await?;
            execute(&mut kdc_send, session.start()?).await?;

            step = "kdc_reply";
            let reply = self.bounded("kdc_reply", read_frame(&mut kdc_recv)).await?;
            let ticket = session.handle_kdc_reply(&reply, &self.aead)?;
            drop((kdc_send, kdc_recv));

            step = "connect_responder";
            let (mut send, mut recv) = transport.connect(responder_addr).await?;
            execute(&mut send, ticket).await?;

            step = "challenge";
            let challenge = self.bounded("challenge", read_frame(&mut recv)).await?;
            let actions = session.handle_challenge(&challenge, &self.aead)?;
            execute(&mut send, actions).await?.ok_or(SessionError::InvalidState {
                state: session.state().name(),
                operation: "establish",
            })
        }
        .await;

        match &result {
            Ok(_) => tracing::info!(role = "initiator", peer = %peer, "session established"),
            Err(err) => {
                tracing::warn!(
                    role = "initiator",
                    peer = %peer,
                    step,
                    error = %err,
                    "session failed"
                );
            },
        }
        result
    }

    /// Responder: accept a ticket, challenge the initiator and check the
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the run. No key is returned
    /// unless the answer matched.
    pub async fn serve_responder_connection<S, R>(
        &self,
        mut session: ResponderSession,
        send: &mut S,
        recv: &mut R,
    ) -> Result<Established, SessionError>
    where
        S: AsyncWrite + Unpin + Send,
        R: AsyncRead + Unpin + Send,
    {
        let mut step = "ticket";
        let result = async {
            let ticket = self.bounded("ticket", read_frame(recv)).await?;
            let challenge = session.handle_frame(&ticket, &self.aead)?;
            execute(send, challenge).await?;

            step = "challenge_response";
            let answer = self.bounded("challenge_response", read_frame(recv)).await?;
            let actions = session.handle_frame(&answer, &self.aead)?;
            execute(send, actions).await?.ok_or(SessionError::InvalidState {
                state: session.state().name(),
                operation: "establish",
            })
        }
        .await;

        match &result {
            Ok(established) => {
                tracing::info!(role = "responder", peer = %established.peer, "session established");
            },
            Err(err) => {
                let peer = session.peer().map_or("unknown", PrincipalId::as_str);
                tracing::warn!(role = "responder", peer, step, error = %err, "session rejected");
            },
        }
        result
    }

    async fn bounded<T, F>(&self, step: &'static str, future: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        let Some(limit) = self.config.step_timeout else {
            return future.await;
        };

        tokio::select! {
            result = future => result,
            () = self.env.sleep(limit) => Err(SessionError::Timeout { step, elapsed: limit }),
        }
    }
}

/// Execute actions against the current peer.
///
/// Returns the established session, if the actions contained one.
async fn execute<S>(
    send: &mut S,
    actions: Vec<SessionAction>,
) -> Result<Option<Established>, SessionError>
where
    S: AsyncWrite + Unpin + Send,
{
    let mut established = None;

    for action in actions {
        match action {
            SessionAction::SendFrame(frame) => write_frame(send, &frame).await?,
            SessionAction::Established { peer, session_key } => {
                established = Some(Established { peer, session_key });
            },
            SessionAction::Close { reason } => {
                tracing::debug!(%reason, "closing connection");
                if let Err(err) = send.shutdown().await {
                    tracing::debug!(error = %err, "shutdown after close failed");
                }
            },
        }
    }

    Ok(established)
}
