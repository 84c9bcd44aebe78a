//! Accept loops and the principal node.
//!
//! Both roles follow the same shape: one accept loop, one spawned task per
//! connection, and a per-connection failure never reaches the loop. The
//! drivers in `tessera-core` already log every failure with its role, peer
//! and step, so the tasks here only deal with successful outcomes.

use std::{collections::HashMap, sync::Arc};

use tessera_core::{
    AeadChannel, Driver, Environment, Established, InitiatorSession, KdcService, NonceSource,
    ResponderSession, SessionKeyStore, SessionTable, Transport,
};
use tessera_proto::{KeyMaterial, PrincipalId};
use tracing::Instrument;

use crate::{config::NodeConfig, error::NodeError};

/// Run the KDC accept loop until the listener fails.
///
/// # Errors
///
/// Returns [`NodeError::Io`] if `accept` fails. Per-connection errors are
/// logged by the driver and do not stop the loop.
pub async fn serve_kdc<T, E, A>(
    transport: T,
    kdc: KdcService,
    driver: Driver<E, A>,
) -> Result<(), NodeError>
where
    T: Transport,
    E: Environment,
    A: AeadChannel + Clone + 'static,
{
    tracing::info!(principals = kdc.registry().len(), "KDC ready");

    loop {
        let (mut send, mut recv) = transport.accept().await?;
        let kdc = kdc.clone();
        let driver = driver.clone();

        tokio::spawn(
            async move {
                // failures are logged by the driver
                let _ = driver.serve_kdc_connection(&kdc, &mut send, &mut recv).await;
            }
            .in_current_span(),
        );
    }
}

/// A principal: listens for tickets and opens sessions on request.
///
/// Clones share the session table and the key store, so the listener task
/// and the command loop see the same sessions.
#[derive(Debug, Clone)]
pub struct PrincipalNode<E, A, S> {
    local: PrincipalId,
    long_term_key: KeyMaterial,
    kdc_addr: String,
    directory: Arc<HashMap<PrincipalId, String>>,
    driver: Driver<E, A>,
    sessions: SessionTable,
    store: S,
}

impl<E, A, S> PrincipalNode<E, A, S>
where
    E: Environment,
    A: AeadChannel + Clone + 'static,
    S: SessionKeyStore + Clone + 'static,
{
    /// Build the node for `local` from the deployment configuration.
    ///
    /// # Errors
    ///
    /// - [`NodeError::UnknownPrincipal`] if `local` is not in the table
    /// - [`NodeError::Config`] if the table is invalid
    pub fn from_config(
        config: &NodeConfig,
        local: PrincipalId,
        driver: Driver<E, A>,
        store: S,
    ) -> Result<Self, NodeError> {
        let registry = config.registry()?;
        let long_term_key = registry
            .key(&local)
            .cloned()
            .ok_or_else(|| NodeError::UnknownPrincipal(local.to_string()))?;

        Ok(Self {
            local,
            long_term_key,
            kdc_addr: config.kdc_addr.clone(),
            directory: Arc::new(config.directory()?),
            driver,
            sessions: SessionTable::new(),
            store,
        })
    }

    /// Identity of this node
    #[must_use]
    pub fn local(&self) -> &PrincipalId {
        &self.local
    }

    /// Established sessions, by peer
    #[must_use]
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Key store receiving established keys
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registered principals other than this one, sorted.
    #[must_use]
    pub fn known_peers(&self) -> Vec<PrincipalId> {
        let mut peers: Vec<_> =
            self.directory.keys().filter(|id| **id != self.local).cloned().collect();
        peers.sort();
        peers
    }

    /// Run the responder accept loop until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Io`] if `accept` fails.
    pub async fn listen<T: Transport>(&self, transport: T) -> Result<(), NodeError> {
        tracing::info!(principal = %self.local, "listening for tickets");

        loop {
            let (mut send, mut recv) = transport.accept().await?;
            let node = self.clone();

            tokio::spawn(
                async move {
                    let session = ResponderSession::new(
                        node.local.clone(),
                        node.long_term_key.clone(),
                        node.driver.env().next_nonce(),
                    );
                    let outcome =
                        node.driver.serve_responder_connection(session, &mut send, &mut recv).await;
                    if let Ok(established) = outcome {
                        if let Err(err) = node.record(&established) {
                            tracing::warn!(peer = %established.peer, error = %err, "key not saved");
                        }
                    }
                }
                .in_current_span(),
            );
        }
    }

    /// Open a session with `peer`: fetch a ticket from the KDC, deliver it
    /// and answer the challenge.
    ///
    /// # Errors
    ///
    /// - [`NodeError::SelfSession`] if `peer` is this node
    /// - [`NodeError::UnknownPrincipal`] if `peer` is not registered
    /// - [`NodeError::Session`] if the run fails or the key cannot be saved
    pub async fn initiate<T: Transport>(
        &self,
        transport: &T,
        peer: &PrincipalId,
    ) -> Result<Established, NodeError> {
        if *peer == self.local {
            return Err(NodeError::SelfSession);
        }
        let peer_addr = self
            .directory
            .get(peer)
            .ok_or_else(|| NodeError::UnknownPrincipal(peer.to_string()))?;

        tracing::info!(%peer, addr = %peer_addr, "opening session");

        let session = InitiatorSession::new(
            self.local.clone(),
            peer.clone(),
            self.long_term_key.clone(),
            self.driver.env().next_nonce(),
        );
        let established =
            self.driver.run_initiator(transport, session, &self.kdc_addr, peer_addr).await?;

        self.record(&established)?;
        Ok(established)
    }

    fn record(&self, established: &Established) -> Result<(), NodeError> {
        let Established { peer, session_key } = established;

        if self.sessions.insert(peer.clone(), session_key.clone()) {
            tracing::info!(%peer, "replaced existing session");
        }
        self.store.persist(&self.local, peer, session_key)?;
        Ok(())
    }
}
