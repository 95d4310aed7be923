//! The Proof Verification Facade (§4.1).
//!
//! The only path through which the core learns facts about the remote chain:
//! resolve `client_id -> ClientState`, fail `ClientNotFound` if absent, then
//! delegate to the resolved state's capability methods. This module is
//! stateless — every semantic check lives inside [`crate::client::LightClientState`].

use ibc_types::core::channel::{ChannelEnd, ChannelId, PortId};
use ibc_types::core::client::{ClientId, Height};
use ibc_types::core::commitment::{MerklePrefix, MerkleProof};
use ibc_types::core::connection::{ConnectionEnd, ConnectionId};
use ibc_types::path::{ClientConsensusStatePath, ConnectionPath};

use crate::client::{ClientKeeper, LightConsensusState, VerifyingClientState};
use crate::error::{ConnectionError, PacketError};

pub struct ProofVerifier<'a, C> {
    client_keeper: &'a C,
}

impl<'a, C: ClientKeeper> ProofVerifier<'a, C> {
    pub fn new(client_keeper: &'a C) -> Self {
        Self { client_keeper }
    }

    async fn resolve(&self, client_id: &str) -> Result<crate::client::LightClientState, ConnectionError> {
        self.client_keeper
            .client_state(client_id)
            .await
            .ok_or_else(|| ConnectionError::ClientNotFound {
                client_id: client_id.to_string(),
            })
    }

    pub async fn verify_client_consensus_state(
        &self,
        client_id: &str,
        height: Height,
        prefix: &MerklePrefix,
        proof: &MerkleProof,
        remote_client_id: &ClientId,
        consensus_height: Height,
        expected_consensus_state: &LightConsensusState,
        consensus_state: &LightConsensusState,
    ) -> Result<(), ConnectionError> {
        let client_state = self.resolve(client_id).await?;
        client_state
            .verify_client_consensus_state(
                height,
                prefix,
                proof,
                expected_consensus_state,
                ClientConsensusStatePath {
                    client_id: remote_client_id.clone(),
                    epoch: consensus_height.revision_number(),
                    height: consensus_height.revision_height(),
                },
                consensus_state,
            )
            .map_err(ConnectionError::ProofVerification)
    }

    pub async fn verify_connection_state(
        &self,
        client_id: &str,
        height: Height,
        prefix: &MerklePrefix,
        proof: &MerkleProof,
        connection_id: &ConnectionId,
        expected_connection: &ConnectionEnd,
        consensus_state: &LightConsensusState,
    ) -> Result<(), ConnectionError> {
        let client_state = self.resolve(client_id).await?;
        client_state
            .verify_connection_state(
                height,
                prefix,
                proof,
                expected_connection,
                ConnectionPath::new(connection_id),
                consensus_state,
            )
            .map_err(ConnectionError::ProofVerification)
    }

    pub async fn verify_channel_state(
        &self,
        client_id: &str,
        height: Height,
        prefix: &MerklePrefix,
        proof: &MerkleProof,
        port_id: &PortId,
        channel_id: &ChannelId,
        expected_channel: &ChannelEnd,
        consensus_state: &LightConsensusState,
    ) -> Result<(), PacketError> {
        let client_state = self.resolve(client_id).await.map_err(PacketError::from)?;
        client_state
            .verify_channel_state(height, prefix, proof, expected_channel, port_id, channel_id, consensus_state)
            .map_err(PacketError::ProofVerification)
    }

    pub async fn verify_next_sequence_recv(
        &self,
        client_id: &str,
        height: Height,
        prefix: &MerklePrefix,
        proof: &MerkleProof,
        port_id: &PortId,
        channel_id: &ChannelId,
        next_sequence_recv: u64,
        consensus_state: &LightConsensusState,
    ) -> Result<(), PacketError> {
        let client_state = self.resolve(client_id).await.map_err(PacketError::from)?;
        client_state
            .verify_next_sequence_recv(height, prefix, proof, port_id, channel_id, next_sequence_recv, consensus_state)
            .map_err(PacketError::ProofVerification)
    }

    pub async fn verify_packet_acknowledgement_absence(
        &self,
        client_id: &str,
        height: Height,
        prefix: &MerklePrefix,
        proof: &MerkleProof,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
        consensus_state: &LightConsensusState,
    ) -> Result<(), PacketError> {
        let client_state = self.resolve(client_id).await.map_err(PacketError::from)?;
        client_state
            .verify_packet_acknowledgement_absence(height, prefix, proof, port_id, channel_id, sequence, consensus_state)
            .map_err(PacketError::ProofVerification)
    }
}
