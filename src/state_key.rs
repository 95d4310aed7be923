//! Persisted state key layout (§6, "Persisted state keys").
//!
//! These strings are part of the protocol's wire contract: remote chains
//! prove membership/non-membership against exactly this layout via Merkle
//! proofs, so the format must not drift once deployed.

use ibc_types::core::channel::{ChannelId, PortId};
use ibc_types::core::connection::ConnectionId;

pub fn connection(connection_id: &ConnectionId) -> String {
    format!("connections/{connection_id}")
}

pub fn client_connections(client_id: &str) -> String {
    format!("clients/{client_id}/connections")
}

pub fn packet_commitment(port_id: &PortId, channel_id: &ChannelId, sequence: u64) -> String {
    format!("commitments/ports/{port_id}/channels/{channel_id}/sequences/{sequence}/packet")
}
