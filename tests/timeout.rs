//! End-to-end packet-timeout scenarios against a single simulated chain.
//!
//! The timeout engine only ever touches local state (its own channel and
//! commitment records) plus a counterparty proof blob, so unlike the
//! handshake these scenarios don't need a second simulated chain — just a
//! sender-side view and a mock proof that always verifies.

use ibc_core_connection::channel::{ChannelEnd, ChannelKeeper, ChannelOrdering, ChannelRegistry, ChannelState};
use ibc_core_connection::client::ClientRegistry;
use ibc_core_connection::connection::{put_connection, ConnectionEnd, ConnectionState};
use ibc_core_connection::error::PacketError;
use ibc_core_connection::packet::{commit_packet, Packet};
use ibc_core_connection::state_key;
use ibc_core_connection::store::{InMemoryStore, StateRead, StateWrite};
use ibc_core_connection::PacketTimeout;

use ibc_types::core::channel::{ChannelId, Counterparty as ChannelCounterparty, PortId, Version as ChannelVersion};
use ibc_types::core::client::Height;
use ibc_types::core::commitment::MerkleProof;
use ibc_types::core::connection::{ConnectionId, Counterparty as ConnCounterparty, Version};

fn nonempty_proof() -> MerkleProof {
    MerkleProof {
        proofs: vec![Default::default()],
    }
}

struct Fixture {
    store: InMemoryStore,
    clients: ClientRegistry,
    channels: ChannelRegistry,
    port_id: PortId,
    channel_id: ChannelId,
}

async fn build(ordering: ChannelOrdering) -> Fixture {
    let store = InMemoryStore::new();
    let clients = ClientRegistry::new();
    let channels = ChannelRegistry::new();
    clients.register_mock_client("client-a", b"root".to_vec());

    let connection_id: ConnectionId = "connection-0".parse().unwrap();
    let port_id: PortId = "transfer".parse().unwrap();
    let channel_id: ChannelId = "channel-0".parse().unwrap();

    put_connection(
        &store,
        &connection_id,
        &ConnectionEnd::new(
            ConnectionState::Open,
            "client-a".parse().unwrap(),
            ConnCounterparty::new(
                "client-b".parse().unwrap(),
                Some("connection-1".parse().unwrap()),
                b"ibc".to_vec().try_into().unwrap(),
            ),
            vec![Version { identifier: "1".to_string(), features: vec![] }],
            std::time::Duration::from_secs(0),
        ),
    )
    .await;

    channels
        .set_channel(
            &port_id,
            &channel_id,
            ChannelEnd::new(
                ChannelState::Open,
                ordering,
                ChannelCounterparty::new(port_id.clone(), Some(channel_id.clone())),
                vec![connection_id.clone()],
                ChannelVersion::new("ics20-1".to_string()),
            ),
        )
        .await;

    Fixture {
        store,
        clients,
        channels,
        port_id,
        channel_id,
    }
}

fn packet(fx: &Fixture, sequence: u64, timeout_height: Height) -> Packet {
    Packet {
        sequence,
        source_port: fx.port_id.clone(),
        source_channel: fx.channel_id.clone(),
        dest_port: fx.port_id.clone(),
        dest_channel: fx.channel_id.clone(),
        data: b"transfer-payload".to_vec(),
        timeout_height,
    }
}

#[tokio::test]
async fn ordered_channel_timeout_closes_the_channel() {
    let fx = build(ChannelOrdering::Ordered).await;
    let pkt = packet(&fx, 5, Height::new(0, 100).unwrap());
    let key = state_key::packet_commitment(&fx.port_id, &fx.channel_id, pkt.sequence);
    fx.store.put_raw(key.clone(), commit_packet(&pkt.data)).await;

    let engine = PacketTimeout::new(&fx.store, &fx.clients, &fx.channels);
    engine
        .timeout_packet(&pkt, nonempty_proof(), Height::new(0, 100).unwrap(), 3)
        .await
        .expect("inclusive height bound should succeed");
    engine.timeout_executed(&pkt).await.unwrap();

    assert!(fx.store.get_raw(&key).await.is_none());
    let channel = fx.channels.channel(&fx.port_id, &fx.channel_id).await.unwrap();
    assert_eq!(channel.state, ChannelState::Closed);
}

#[tokio::test]
async fn unordered_channel_timeout_leaves_the_channel_open() {
    let fx = build(ChannelOrdering::Unordered).await;
    let pkt = packet(&fx, 5, Height::new(0, 100).unwrap());
    let key = state_key::packet_commitment(&fx.port_id, &fx.channel_id, pkt.sequence);
    fx.store.put_raw(key.clone(), commit_packet(&pkt.data)).await;

    let engine = PacketTimeout::new(&fx.store, &fx.clients, &fx.channels);
    engine
        .timeout_packet(&pkt, nonempty_proof(), Height::new(0, 100).unwrap(), 3)
        .await
        .unwrap();
    engine.timeout_executed(&pkt).await.unwrap();

    assert!(fx.store.get_raw(&key).await.is_none());
    let channel = fx.channels.channel(&fx.port_id, &fx.channel_id).await.unwrap();
    assert_eq!(channel.state, ChannelState::Open);
}

#[tokio::test]
async fn timeout_one_height_early_fails() {
    let fx = build(ChannelOrdering::Unordered).await;
    let pkt = packet(&fx, 5, Height::new(0, 100).unwrap());
    let key = state_key::packet_commitment(&fx.port_id, &fx.channel_id, pkt.sequence);
    fx.store.put_raw(key, commit_packet(&pkt.data)).await;

    let engine = PacketTimeout::new(&fx.store, &fx.clients, &fx.channels);
    let result = engine
        .timeout_packet(&pkt, nonempty_proof(), Height::new(0, 99).unwrap(), 3)
        .await;
    assert!(matches!(result, Err(PacketError::PacketTimeout)));
}

#[tokio::test]
async fn already_received_sequence_fails() {
    let fx = build(ChannelOrdering::Unordered).await;
    let pkt = packet(&fx, 5, Height::new(0, 100).unwrap());
    let key = state_key::packet_commitment(&fx.port_id, &fx.channel_id, pkt.sequence);
    fx.store.put_raw(key, commit_packet(&pkt.data)).await;

    let engine = PacketTimeout::new(&fx.store, &fx.clients, &fx.channels);
    let result = engine
        .timeout_packet(&pkt, nonempty_proof(), Height::new(0, 100).unwrap(), 5)
        .await;
    assert!(matches!(result, Err(PacketError::InvalidPacket { .. })));
}

#[tokio::test]
async fn timeout_on_close_clears_commitment_without_closing_the_channel() {
    let fx = build(ChannelOrdering::Unordered).await;
    // timeout_height is 100, far in the future; timeout-on-close doesn't wait for it.
    let pkt = packet(&fx, 5, Height::new(0, 100).unwrap());
    let key = state_key::packet_commitment(&fx.port_id, &fx.channel_id, pkt.sequence);
    fx.store.put_raw(key.clone(), commit_packet(&pkt.data)).await;

    let engine = PacketTimeout::new(&fx.store, &fx.clients, &fx.channels);
    engine
        .timeout_on_close(
            &pkt,
            nonempty_proof(),
            nonempty_proof(),
            Height::new(0, 50).unwrap(),
            0,
        )
        .await
        .unwrap();

    assert!(fx.store.get_raw(&key).await.is_none());
    let channel = fx.channels.channel(&fx.port_id, &fx.channel_id).await.unwrap();
    assert_eq!(channel.state, ChannelState::Open);
}

#[tokio::test]
async fn timeout_packet_then_timeout_executed_is_not_idempotent() {
    let fx = build(ChannelOrdering::Unordered).await;
    let pkt = packet(&fx, 5, Height::new(0, 100).unwrap());
    let key = state_key::packet_commitment(&fx.port_id, &fx.channel_id, pkt.sequence);
    fx.store.put_raw(key, commit_packet(&pkt.data)).await;

    let engine = PacketTimeout::new(&fx.store, &fx.clients, &fx.channels);
    engine
        .timeout_packet(&pkt, nonempty_proof(), Height::new(0, 100).unwrap(), 3)
        .await
        .unwrap();
    engine.timeout_executed(&pkt).await.unwrap();

    let result = engine.timeout_executed(&pkt).await;
    assert!(matches!(result, Err(PacketError::InvalidPacket { .. })));
}
