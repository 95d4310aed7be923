//! The Packet Timeout Engine (§4.3).
//!
//! Both entry points are fail-fast gate lists, same shape as the handshake
//! engine: every lookup and proof check runs to completion before the single
//! state write. `timeout_packet` itself never mutates state — the caller
//! applies [`PacketTimeout::timeout_executed`] only after it has also driven
//! any outer effects (e.g. refunding an escrowed token) that must still see
//! the packet as committed.

use ibc_types::core::channel::Counterparty as ChannelCounterparty;
use ibc_types::core::client::Height;
use ibc_types::core::commitment::MerkleProof;

use crate::channel::{ChannelEnd, ChannelKeeper, ChannelOrdering, ChannelState};
use crate::client::ClientKeeper;
use crate::connection::get_connection;
use crate::error::PacketError;
use crate::packet::{commit_packet, Packet};
use crate::proof_verification::ProofVerifier;
use crate::state_key;
use crate::store::{StateRead, StateWrite};

pub struct PacketTimeout<'a, S, C, H> {
    store: &'a S,
    client_keeper: &'a C,
    channel_keeper: &'a H,
}

impl<'a, S, C, H> PacketTimeout<'a, S, C, H>
where
    S: StateRead + StateWrite,
    C: ClientKeeper,
    H: ChannelKeeper,
{
    pub fn new(store: &'a S, client_keeper: &'a C, channel_keeper: &'a H) -> Self {
        Self {
            store,
            client_keeper,
            channel_keeper,
        }
    }

    fn verifier(&self) -> ProofVerifier<'_, C> {
        ProofVerifier::new(self.client_keeper)
    }

    async fn source_channel(&self, packet: &Packet) -> Result<ChannelEnd, PacketError> {
        self.channel_keeper
            .channel(&packet.source_port, &packet.source_channel)
            .await
            .ok_or_else(|| PacketError::ChannelNotFound {
                port_id: packet.source_port.clone(),
                channel_id: packet.source_channel.clone(),
            })
    }

    fn check_destination(&self, packet: &Packet, channel: &ChannelEnd) -> Result<(), PacketError> {
        if packet.dest_port != channel.counterparty().port_id
            || Some(packet.dest_channel.clone()) != channel.counterparty().channel_id
        {
            return Err(PacketError::InvalidPacket {
                reason: "packet destination doesn't match the channel's counterparty".to_string(),
            });
        }
        Ok(())
    }

    async fn resolve_connection(
        &self,
        channel: &ChannelEnd,
    ) -> Result<crate::connection::ConnectionEnd, PacketError> {
        let connection_id = channel.connection_hops[0].clone();
        get_connection(self.store, &connection_id)
            .await
            .ok_or(PacketError::ConnectionNotFound { connection_id })
    }

    async fn check_commitment_present(&self, packet: &Packet) -> Result<(), PacketError> {
        let key = state_key::packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence);
        let stored = self
            .store
            .get_raw(&key)
            .await
            .ok_or_else(|| PacketError::InvalidPacket {
                reason: "packet hasn't been sent".to_string(),
            })?;
        if stored != commit_packet(&packet.data) {
            return Err(PacketError::InvalidPacket {
                reason: "packet hasn't been sent".to_string(),
            });
        }
        Ok(())
    }

    /// §4.3.1 — proves a packet timed out on the counterparty. Does not
    /// mutate state; the caller follows a success with [`Self::timeout_executed`].
    pub async fn timeout_packet(
        &self,
        packet: &Packet,
        proof: MerkleProof,
        proof_height: Height,
        next_sequence_recv: u64,
    ) -> Result<(), PacketError> {
        let channel = self.source_channel(packet).await?;

        if channel.state != ChannelState::Open {
            return Err(PacketError::InvalidChannelState {
                found: channel_state_name(&channel.state),
            });
        }

        self.check_destination(packet, &channel)?;
        let connection = self.resolve_connection(&channel).await?;

        if proof_height < packet.timeout_height {
            return Err(PacketError::PacketTimeout);
        }

        if next_sequence_recv >= packet.sequence {
            return Err(PacketError::InvalidPacket {
                reason: "packet already received".to_string(),
            });
        }

        self.check_commitment_present(packet).await?;

        let consensus_state = self
            .client_keeper
            .consensus_state_at(connection.client_id.as_str(), proof_height)
            .await
            .ok_or_else(|| PacketError::ConsensusStateNotFound {
                client_id: connection.client_id.to_string(),
            })?;

        match channel.ordering {
            ChannelOrdering::Ordered => {
                self.verifier()
                    .verify_next_sequence_recv(
                        connection.client_id.as_str(),
                        proof_height,
                        &connection.counterparty.prefix,
                        &proof,
                        &packet.dest_port,
                        &packet.dest_channel,
                        next_sequence_recv,
                        &consensus_state,
                    )
                    .await
            }
            ChannelOrdering::Unordered => {
                self.verifier()
                    .verify_packet_acknowledgement_absence(
                        connection.client_id.as_str(),
                        proof_height,
                        &connection.counterparty.prefix,
                        &proof,
                        &packet.dest_port,
                        &packet.dest_channel,
                        packet.sequence,
                        &consensus_state,
                    )
                    .await
            }
            ChannelOrdering::None => {
                tracing::error!(ordering = ?channel.ordering, "unrecognized channel ordering reached the timeout engine");
                unreachable!(
                    "channel ordering is validated at channel-open time; {:?} should never reach the timeout engine",
                    channel.ordering
                )
            }
        }
    }

    /// §4.3.2 — applied after a successful [`Self::timeout_packet`]. Deletes
    /// the commitment and, for ordered channels, closes the channel: an
    /// ordered channel cannot skip the sequence that just timed out, so a
    /// proven timeout means the two ends have permanently diverged.
    pub async fn timeout_executed(&self, packet: &Packet) -> Result<(), PacketError> {
        let mut channel = self.source_channel(packet).await?;

        let key = state_key::packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence);
        if self.store.get_raw(&key).await.is_none() {
            return Err(PacketError::InvalidPacket {
                reason: "packet hasn't been sent".to_string(),
            });
        }
        self.store.delete_raw(&key).await;

        if channel.ordering == ChannelOrdering::Ordered {
            channel.state = ChannelState::Closed;
            self.channel_keeper
                .set_channel(&packet.source_port, &packet.source_channel, channel)
                .await;
        }

        Ok(())
    }

    /// §4.3.3 — proves the counterparty channel closed before the timeout
    /// height elapsed; the timeout height itself need not have passed.
    /// `proof_non_membership` is part of the external message shape but,
    /// matching the keeper this is grounded on, unused: the absence check
    /// below runs entirely on `proof_closed`.
    pub async fn timeout_on_close(
        &self,
        packet: &Packet,
        _proof_non_membership: MerkleProof,
        proof_closed: MerkleProof,
        proof_height: Height,
        next_sequence_recv: u64,
    ) -> Result<(), PacketError> {
        let channel = self.source_channel(packet).await?;
        self.check_destination(packet, &channel)?;
        let connection = self.resolve_connection(&channel).await?;
        self.check_commitment_present(packet).await?;

        let connection_id = channel.connection_hops[0].clone();
        let counterparty_hops = vec![connection.counterparty.connection_id.clone().unwrap_or_else(|| {
            // The connection was just resolved above, so its counterparty
            // binding is known to exist; its absence here is a broken invariant.
            tracing::error!(%connection_id, "connection has no counterparty connection id");
            panic!("connection {connection_id} has no counterparty connection id")
        })];

        let expected_channel = ChannelEnd::new(
            ChannelState::Closed,
            channel.ordering,
            ChannelCounterparty::new(packet.source_port.clone(), Some(packet.source_channel.clone())),
            counterparty_hops,
            channel.version.clone(),
        );

        let consensus_state = self
            .client_keeper
            .consensus_state_at(connection.client_id.as_str(), proof_height)
            .await
            .ok_or_else(|| PacketError::ConsensusStateNotFound {
                client_id: connection.client_id.to_string(),
            })?;

        self.verifier()
            .verify_channel_state(
                connection.client_id.as_str(),
                proof_height,
                &connection.counterparty.prefix,
                &proof_closed,
                &channel.counterparty().port_id,
                channel.counterparty().channel_id.as_ref().ok_or_else(|| {
                    PacketError::InvalidPacket {
                        reason: "channel counterparty channel id unknown".to_string(),
                    }
                })?,
                &expected_channel,
                &consensus_state,
            )
            .await?;

        match channel.ordering {
            ChannelOrdering::Ordered => {
                self.verifier()
                    .verify_next_sequence_recv(
                        connection.client_id.as_str(),
                        proof_height,
                        &connection.counterparty.prefix,
                        &proof_closed,
                        &packet.dest_port,
                        &packet.dest_channel,
                        next_sequence_recv,
                        &consensus_state,
                    )
                    .await?
            }
            ChannelOrdering::Unordered => {
                // NOTE: verifies absence at (source_port, source_channel) rather
                // than (dest_port, dest_channel) as `timeout_packet` does. This
                // is asymmetric with the ordinary timeout path and may be a
                // protocol bug; reproduced here as-is rather than silently
                // "corrected". Flagged for protocol review — see DESIGN.md.
                self.verifier()
                    .verify_packet_acknowledgement_absence(
                        connection.client_id.as_str(),
                        proof_height,
                        &connection.counterparty.prefix,
                        &proof_closed,
                        &packet.source_port,
                        &packet.source_channel,
                        packet.sequence,
                        &consensus_state,
                    )
                    .await?
            }
            ChannelOrdering::None => {
                tracing::error!(ordering = ?channel.ordering, "unrecognized channel ordering reached the timeout engine");
                unreachable!(
                    "channel ordering is validated at channel-open time; {:?} should never reach the timeout engine",
                    channel.ordering
                )
            }
        }

        let key = state_key::packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence);
        self.store.delete_raw(&key).await;

        Ok(())
    }
}

fn channel_state_name(state: &ChannelState) -> &'static str {
    match state {
        ChannelState::Uninitialized => "UNINITIALIZED",
        ChannelState::Init => "INIT",
        ChannelState::TryOpen => "TRYOPEN",
        ChannelState::Open => "OPEN",
        ChannelState::Closed => "CLOSED",
    }
}
