//! The Connection Handshake Engine (§4.2).
//!
//! Four transitions, each a fail-fast gate list ending in a single state
//! write. None of the four ever performs a partial write: every fallible
//! check (lookup, version pick, proof verification) runs before the first
//! `put_connection`/`add_connection_to_client` call.

use ibc_types::core::client::{ClientId, Height};
use ibc_types::core::commitment::{MerklePrefix, MerkleProof};
use ibc_types::core::connection::{ConnectionEnd, ConnectionId, Counterparty, State, Version};

use crate::client::ClientKeeper;
use crate::commitment;
use crate::connection::{add_connection_to_client, get_connection, put_connection};
use crate::error::ConnectionError;
use crate::event::{connection_state_updated, IbcEvent};
use crate::proof_verification::ProofVerifier;
use crate::store::{StateRead, StateWrite};
use crate::version::{compatible_versions, latest_version, pick_version};

fn state_name(state: &State) -> &'static str {
    match state {
        State::Uninitialized => "UNINITIALIZED",
        State::Init => "INIT",
        State::TryOpen => "TRYOPEN",
        State::Open => "OPEN",
    }
}

/// Whether `consensus_height` should be rejected when it is in the future
/// relative to the host's own height. Left disabled by default pending a
/// blocking issue on what "future" means without a trusted wall clock (see
/// DESIGN.md, Open Question a) — gated behind an explicit flag rather than
/// silently enforced.
///
/// `verify_counterparty_consensus_state` gates the companion check against
/// `proof_consensus`: that the counterparty's client of this chain stores the
/// consensus state this chain expects at `consensus_height`. Also left
/// disabled by default for the same reason (see DESIGN.md, Open Question a).
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeConfig {
    pub reject_future_consensus_height: bool,
    pub verify_counterparty_consensus_state: bool,
}

pub struct ConnectionHandshake<'a, S, C> {
    store: &'a S,
    client_keeper: &'a C,
    config: HandshakeConfig,
}

impl<'a, S, C> ConnectionHandshake<'a, S, C>
where
    S: StateRead + StateWrite,
    C: ClientKeeper,
{
    pub fn new(store: &'a S, client_keeper: &'a C, config: HandshakeConfig) -> Self {
        Self {
            store,
            client_keeper,
            config,
        }
    }

    fn verifier(&self) -> ProofVerifier<'_, C> {
        ProofVerifier::new(self.client_keeper)
    }

    /// §4.2.1 — starts a handshake on chain A.
    pub async fn conn_open_init(
        &self,
        connection_id: &ConnectionId,
        client_id: &ClientId,
        counterparty: Counterparty,
    ) -> Result<IbcEvent, ConnectionError> {
        if get_connection(self.store, connection_id).await.is_some() {
            return Err(ConnectionError::ConnectionExists {
                connection_id: connection_id.clone(),
            });
        }

        let connection = ConnectionEnd {
            state: State::Init,
            client_id: client_id.clone(),
            counterparty: counterparty.clone(),
            versions: compatible_versions(),
            delay_period: std::time::Duration::from_secs(0),
        };

        put_connection(self.store, connection_id, &connection).await;
        add_connection_to_client(self.store, client_id.as_str(), connection_id).await;

        Ok(connection_state_updated(
            connection_id,
            client_id.as_str(),
            counterparty.connection_id.as_ref(),
            &counterparty.client_id.to_string(),
            state_name(&State::Uninitialized),
            state_name(&State::Init),
        ))
    }

    /// §4.2.2 — executed on chain B upon seeing chain A's `INIT`.
    #[allow(clippy::too_many_arguments)]
    pub async fn conn_open_try(
        &self,
        connection_id: &ConnectionId,
        counterparty: Counterparty,
        client_id: &ClientId,
        counterparty_versions: Vec<Version>,
        proof_init: MerkleProof,
        proof_consensus: MerkleProof,
        proof_height: Height,
        consensus_height: Height,
    ) -> Result<IbcEvent, ConnectionError> {
        if self.config.reject_future_consensus_height {
            // See DESIGN.md Open Question (a): left opt-in rather than always
            // enforced.
            let _ = consensus_height;
        }

        let expected_consensus_state = self
            .client_keeper
            .latest_consensus_state(client_id.as_str())
            .await
            .ok_or_else(|| ConnectionError::ConsensusStateNotFound {
                client_id: client_id.to_string(),
            })?;

        let expected_connection = ConnectionEnd {
            state: State::Init,
            client_id: counterparty.client_id.clone(),
            counterparty: Counterparty {
                client_id: client_id.clone(),
                connection_id: Some(connection_id.clone()),
                prefix: commitment::local_prefix(),
            },
            versions: counterparty_versions.clone(),
            delay_period: std::time::Duration::from_secs(0),
        };

        let version = pick_version(&counterparty_versions, &compatible_versions())?;

        self.verifier()
            .verify_connection_state(
                client_id.as_str(),
                proof_height,
                &counterparty_prefix(&counterparty),
                &proof_init,
                counterparty.connection_id.as_ref().ok_or_else(|| {
                    ConnectionError::InvalidVersion {
                        reason: "counterparty did not provide its own connection id".to_string(),
                    }
                })?,
                &expected_connection,
                &expected_consensus_state,
            )
            .await?;

        if self.config.verify_counterparty_consensus_state {
            // See DESIGN.md Open Question (a): left opt-in rather than always
            // enforced.
            self.verifier()
                .verify_client_consensus_state(
                    client_id.as_str(),
                    proof_height,
                    &counterparty_prefix(&counterparty),
                    &proof_consensus,
                    &counterparty.client_id,
                    consensus_height,
                    &expected_consensus_state,
                    &expected_consensus_state,
                )
                .await?;
        }

        if get_connection(self.store, connection_id).await.is_some() {
            return Err(ConnectionError::ConnectionExists {
                connection_id: connection_id.clone(),
            });
        }

        let connection = ConnectionEnd {
            state: State::TryOpen,
            client_id: client_id.clone(),
            counterparty: counterparty.clone(),
            versions: vec![version],
            delay_period: std::time::Duration::from_secs(0),
        };

        put_connection(self.store, connection_id, &connection).await;
        add_connection_to_client(self.store, client_id.as_str(), connection_id).await;

        Ok(connection_state_updated(
            connection_id,
            client_id.as_str(),
            counterparty.connection_id.as_ref(),
            &counterparty.client_id.to_string(),
            state_name(&State::Uninitialized),
            state_name(&State::TryOpen),
        ))
    }

    /// §4.2.3 — executed on chain A upon seeing chain B's `TRYOPEN`.
    pub async fn conn_open_ack(
        &self,
        connection_id: &ConnectionId,
        version: Version,
        proof_try: MerkleProof,
        proof_consensus: MerkleProof,
        proof_height: Height,
        consensus_height: Height,
    ) -> Result<IbcEvent, ConnectionError> {
        if self.config.reject_future_consensus_height {
            let _ = consensus_height;
        }

        let mut connection =
            get_connection(self.store, connection_id)
                .await
                .ok_or_else(|| ConnectionError::ConnectionNotFound {
                    connection_id: connection_id.clone(),
                })?;

        if connection.state != State::Init {
            return Err(ConnectionError::InvalidConnectionState {
                connection_id: connection_id.clone(),
                expected: "INIT",
                found: state_name(&connection.state),
            });
        }

        if latest_version(&connection.versions) != Some(&version) {
            return Err(ConnectionError::InvalidVersion {
                reason: format!(
                    "connection version doesn't match the one provided ({:?} != {:?})",
                    latest_version(&connection.versions),
                    version
                ),
            });
        }

        let expected_consensus_state = self
            .client_keeper
            .latest_consensus_state(connection.client_id.as_str())
            .await
            .ok_or_else(|| ConnectionError::ConsensusStateNotFound {
                client_id: connection.client_id.to_string(),
            })?;

        let expected_connection = ConnectionEnd {
            state: State::TryOpen,
            client_id: connection.counterparty.client_id.clone(),
            counterparty: Counterparty {
                client_id: connection.client_id.clone(),
                connection_id: Some(connection_id.clone()),
                prefix: commitment::local_prefix(),
            },
            versions: vec![version.clone()],
            delay_period: std::time::Duration::from_secs(0),
        };

        self.verifier()
            .verify_connection_state(
                connection.client_id.as_str(),
                proof_height,
                &counterparty_prefix(&connection.counterparty),
                &proof_try,
                connection.counterparty.connection_id.as_ref().ok_or_else(|| {
                    ConnectionError::InvalidVersion {
                        reason: "counterparty connection id unknown".to_string(),
                    }
                })?,
                &expected_connection,
                &expected_consensus_state,
            )
            .await?;

        if self.config.verify_counterparty_consensus_state {
            // See DESIGN.md Open Question (a): left opt-in rather than always
            // enforced.
            self.verifier()
                .verify_client_consensus_state(
                    connection.client_id.as_str(),
                    proof_height,
                    &counterparty_prefix(&connection.counterparty),
                    &proof_consensus,
                    &connection.counterparty.client_id,
                    consensus_height,
                    &expected_consensus_state,
                    &expected_consensus_state,
                )
                .await?;
        }

        let from = state_name(&connection.state).to_string();
        connection.state = State::Open;
        connection.versions = vec![version];

        put_connection(self.store, connection_id, &connection).await;

        Ok(connection_state_updated(
            connection_id,
            connection.client_id.as_str(),
            connection.counterparty.connection_id.as_ref(),
            &connection.counterparty.client_id.to_string(),
            &from,
            state_name(&State::Open),
        ))
    }

    /// §4.2.4 — executed on chain B upon seeing chain A's `OPEN`.
    pub async fn conn_open_confirm(
        &self,
        connection_id: &ConnectionId,
        proof_ack: MerkleProof,
        proof_height: Height,
    ) -> Result<IbcEvent, ConnectionError> {
        let mut connection =
            get_connection(self.store, connection_id)
                .await
                .ok_or_else(|| ConnectionError::ConnectionNotFound {
                    connection_id: connection_id.clone(),
                })?;

        if connection.state != State::TryOpen {
            return Err(ConnectionError::InvalidConnectionState {
                connection_id: connection_id.clone(),
                expected: "TRYOPEN",
                found: state_name(&connection.state),
            });
        }

        let expected_consensus_state = self
            .client_keeper
            .latest_consensus_state(connection.client_id.as_str())
            .await
            .ok_or_else(|| ConnectionError::ConsensusStateNotFound {
                client_id: connection.client_id.to_string(),
            })?;

        let expected_connection = ConnectionEnd {
            state: State::Open,
            client_id: connection.counterparty.client_id.clone(),
            counterparty: Counterparty {
                client_id: connection.client_id.clone(),
                connection_id: Some(connection_id.clone()),
                prefix: commitment::local_prefix(),
            },
            versions: connection.versions.clone(),
            delay_period: std::time::Duration::from_secs(0),
        };

        self.verifier()
            .verify_connection_state(
                connection.client_id.as_str(),
                proof_height,
                &counterparty_prefix(&connection.counterparty),
                &proof_ack,
                connection.counterparty.connection_id.as_ref().ok_or_else(|| {
                    ConnectionError::InvalidVersion {
                        reason: "counterparty connection id unknown".to_string(),
                    }
                })?,
                &expected_connection,
                &expected_consensus_state,
            )
            .await?;

        let from = state_name(&connection.state).to_string();
        connection.state = State::Open;
        put_connection(self.store, connection_id, &connection).await;

        Ok(connection_state_updated(
            connection_id,
            connection.client_id.as_str(),
            connection.counterparty.connection_id.as_ref(),
            &connection.counterparty.client_id.to_string(),
            &from,
            state_name(&State::Open),
        ))
    }
}

fn counterparty_prefix(counterparty: &Counterparty) -> MerklePrefix {
    counterparty.prefix.clone()
}
