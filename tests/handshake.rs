//! End-to-end connection handshakes between two in-process simulated chains.

use ibc_core_connection::client::ClientRegistry;
use ibc_core_connection::connection::get_connection;
use ibc_core_connection::error::ConnectionError;
use ibc_core_connection::store::InMemoryStore;
use ibc_core_connection::version::compatible_versions;
use ibc_core_connection::{ConnectionHandshake, HandshakeConfig};

use ibc_types::core::client::Height;
use ibc_types::core::commitment::MerkleProof;
use ibc_types::core::connection::{ConnectionId, Counterparty, State};

struct Chain {
    store: InMemoryStore,
    clients: ClientRegistry,
}

impl Chain {
    fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            clients: ClientRegistry::new(),
        }
    }

    fn engine(&self) -> ConnectionHandshake<'_, InMemoryStore, ClientRegistry> {
        ConnectionHandshake::new(&self.store, &self.clients, HandshakeConfig::default())
    }
}

fn nonempty_proof() -> MerkleProof {
    MerkleProof {
        proofs: vec![Default::default()],
    }
}

#[tokio::test]
async fn happy_path_handshake_reaches_open_on_both_ends() {
    let a = Chain::new();
    let b = Chain::new();
    a.clients.register_mock_client("client-b", b"root-b".to_vec());
    b.clients.register_mock_client("client-a", b"root-a".to_vec());

    let conn_a: ConnectionId = "connection-0".parse().unwrap();
    let conn_b: ConnectionId = "connection-0".parse().unwrap();
    let client_a = "client-a".parse().unwrap();
    let client_b = "client-b".parse().unwrap();

    a.engine()
        .conn_open_init(
            &conn_a,
            &client_b,
            Counterparty::new(client_a, None, b"ibc".to_vec().try_into().unwrap()),
        )
        .await
        .unwrap();

    let conn_on_a = get_connection(&a.store, &conn_a).await.unwrap();
    assert_eq!(conn_on_a.state, State::Init);

    b.engine()
        .conn_open_try(
            &conn_b,
            Counterparty::new(
                "client-b".parse().unwrap(),
                Some(conn_a.clone()),
                b"ibc".to_vec().try_into().unwrap(),
            ),
            &"client-a".parse().unwrap(),
            compatible_versions(),
            nonempty_proof(),
            nonempty_proof(),
            Height::new(0, 1).unwrap(),
            Height::new(0, 1).unwrap(),
        )
        .await
        .unwrap();

    let conn_on_b = get_connection(&b.store, &conn_b).await.unwrap();
    assert_eq!(conn_on_b.state, State::TryOpen);
    assert_eq!(conn_on_b.versions.len(), 1);

    a.engine()
        .conn_open_ack(
            &conn_a,
            compatible_versions().into_iter().next().unwrap(),
            nonempty_proof(),
            nonempty_proof(),
            Height::new(0, 1).unwrap(),
            Height::new(0, 1).unwrap(),
        )
        .await
        .unwrap();

    let conn_on_a = get_connection(&a.store, &conn_a).await.unwrap();
    assert_eq!(conn_on_a.state, State::Open);
    assert_eq!(conn_on_a.versions.len(), 1);

    b.engine()
        .conn_open_confirm(&conn_b, nonempty_proof(), Height::new(0, 1).unwrap())
        .await
        .unwrap();

    let conn_on_b = get_connection(&b.store, &conn_b).await.unwrap();
    assert_eq!(conn_on_b.state, State::Open);
    assert_eq!(conn_on_b.versions, conn_on_a.versions);
}

#[tokio::test]
async fn try_with_incompatible_versions_fails_and_writes_nothing() {
    let b = Chain::new();
    b.clients.register_mock_client("client-a", b"root-a".to_vec());

    let conn_b: ConnectionId = "connection-0".parse().unwrap();
    let incompatible = vec![ibc_types::core::connection::Version { identifier: "3".to_string(), features: vec![] }];

    let result = b
        .engine()
        .conn_open_try(
            &conn_b,
            Counterparty::new(
                "client-b".parse().unwrap(),
                Some("connection-1".parse().unwrap()),
                b"ibc".to_vec().try_into().unwrap(),
            ),
            &"client-a".parse().unwrap(),
            incompatible,
            nonempty_proof(),
            nonempty_proof(),
            Height::new(0, 1).unwrap(),
            Height::new(0, 1).unwrap(),
        )
        .await;

    assert!(matches!(result, Err(ConnectionError::InvalidVersion { .. })));
    assert!(get_connection(&b.store, &conn_b).await.is_none());
}

#[tokio::test]
async fn replay_of_init_fails_connection_exists() {
    let a = Chain::new();
    let conn_a: ConnectionId = "connection-0".parse().unwrap();
    let client_b = "client-b".parse().unwrap();
    let counterparty = Counterparty::new(
        "client-a".parse().unwrap(),
        None,
        b"ibc".to_vec().try_into().unwrap(),
    );

    a.engine()
        .conn_open_init(&conn_a, &client_b, counterparty.clone())
        .await
        .unwrap();

    let first = get_connection(&a.store, &conn_a).await.unwrap();

    let result = a.engine().conn_open_init(&conn_a, &client_b, counterparty).await;
    assert!(matches!(result, Err(ConnectionError::ConnectionExists { .. })));

    let after = get_connection(&a.store, &conn_a).await.unwrap();
    assert_eq!(first.state, after.state);
}

#[tokio::test]
async fn ack_with_unknown_version_fails_invalid_version() {
    let a = Chain::new();
    a.clients.register_mock_client("client-b", b"root-b".to_vec());

    let conn_a: ConnectionId = "connection-0".parse().unwrap();
    let client_b = "client-b".parse().unwrap();
    a.engine()
        .conn_open_init(
            &conn_a,
            &client_b,
            Counterparty::new("client-a".parse().unwrap(), None, b"ibc".to_vec().try_into().unwrap()),
        )
        .await
        .unwrap();

    let unknown_version = ibc_types::core::connection::Version { identifier: "9".to_string(), features: vec![] };
    let result = a
        .engine()
        .conn_open_ack(
            &conn_a,
            unknown_version,
            nonempty_proof(),
            nonempty_proof(),
            Height::new(0, 1).unwrap(),
            Height::new(0, 1).unwrap(),
        )
        .await;

    assert!(matches!(result, Err(ConnectionError::InvalidVersion { .. })));
}
