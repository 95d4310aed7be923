//! Packets and packet commitments (§3, §4.3.4).
//!
//! No behavior varies by packet subtype, so a packet is a concrete record
//! rather than a trait object.

use ibc_types::core::channel::{ChannelId, PortId};
use ibc_types::core::client::Height;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub sequence: u64,
    pub source_port: PortId,
    pub source_channel: ChannelId,
    pub dest_port: PortId,
    pub dest_channel: ChannelId,
    pub data: Vec<u8>,
    pub timeout_height: Height,
}

/// A deterministic digest of a packet's data. Both sides must compute
/// identical commitments for identical packet bytes; this is a protocol
/// constant shared with all counterparties, not a local implementation
/// choice, so it is not configurable.
pub fn commit_packet(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}
