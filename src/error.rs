//! Error kinds raised by the connection handshake and packet timeout engines.

use ibc_types::core::connection::ConnectionId;
use ibc_types::core::channel::{ChannelId, PortId};

/// Errors surfaced by the [`crate::handshake`] connection handshake engine.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection {connection_id} already exists")]
    ConnectionExists { connection_id: ConnectionId },

    #[error("connection {connection_id} not found")]
    ConnectionNotFound { connection_id: ConnectionId },

    #[error("connection {connection_id} is in state {found:?}, expected {expected:?}")]
    InvalidConnectionState {
        connection_id: ConnectionId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("no compatible version: {reason}")]
    InvalidVersion { reason: String },

    #[error("consensus state for client {client_id} not found")]
    ConsensusStateNotFound { client_id: String },

    #[error("client {client_id} not found")]
    ClientNotFound { client_id: String },

    #[error("proof verification failed: {0}")]
    ProofVerification(#[source] anyhow::Error),
}

/// Errors surfaced by the [`crate::timeout`] packet timeout engine.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("channel not found for port {port_id} channel {channel_id}")]
    ChannelNotFound {
        port_id: PortId,
        channel_id: ChannelId,
    },

    #[error("channel is in state {found:?}, expected OPEN")]
    InvalidChannelState { found: &'static str },

    #[error("connection {connection_id} not found")]
    ConnectionNotFound { connection_id: ConnectionId },

    #[error("invalid packet: {reason}")]
    InvalidPacket { reason: String },

    #[error("packet timeout height has not yet elapsed on the counterparty")]
    PacketTimeout,

    #[error("unrecognized channel ordering variant")]
    InvalidChannelOrdering,

    #[error("consensus state for client {client_id} not found")]
    ConsensusStateNotFound { client_id: String },

    #[error("client {client_id} not found")]
    ClientNotFound { client_id: String },

    #[error("proof verification failed: {0}")]
    ProofVerification(#[source] anyhow::Error),
}

impl From<ConnectionError> for PacketError {
    /// `timeout_packet`/`timeout_on_close` resolve a connection through the same
    /// lookup the handshake engine uses; fold its error variants into the
    /// packet-path ones that carry the same meaning.
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::ConnectionNotFound { connection_id } => {
                PacketError::ConnectionNotFound { connection_id }
            }
            ConnectionError::ConsensusStateNotFound { client_id } => {
                PacketError::ConsensusStateNotFound { client_id }
            }
            ConnectionError::ClientNotFound { client_id } => PacketError::ClientNotFound { client_id },
            ConnectionError::ProofVerification(e) => PacketError::ProofVerification(e),
            other => PacketError::InvalidPacket {
                reason: other.to_string(),
            },
        }
    }
}
