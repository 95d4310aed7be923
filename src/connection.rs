//! `ConnectionEnd` storage access (§3, §4.4).
//!
//! `ConnectionEnd` is encoded the same way it is proven to counterparties —
//! via its protobuf wire format — so a stored record and a Merkle-proven one
//! are byte-identical. `ClientConnectionPaths` is a local reverse index never
//! observed through a proof, so it's free to use a simpler encoding.

pub use ibc_types::core::connection::{ConnectionEnd, ConnectionId, Counterparty, State as ConnectionState, Version};
use ibc_proto::Protobuf;

use crate::state_key;
use crate::store::{StateRead, StateWrite};

pub async fn get_connection<S: StateRead + ?Sized>(
    store: &S,
    connection_id: &ConnectionId,
) -> Option<ConnectionEnd> {
    let raw = store.get_raw(&state_key::connection(connection_id)).await?;
    ConnectionEnd::decode_vec(&raw).ok()
}

pub async fn put_connection<S: StateWrite + ?Sized>(
    store: &S,
    connection_id: &ConnectionId,
    connection: &ConnectionEnd,
) {
    store
        .put_raw(state_key::connection(connection_id), connection.clone().encode_vec())
        .await;
}

pub async fn client_connection_paths<S: StateRead + ?Sized>(store: &S, client_id: &str) -> Vec<ConnectionId> {
    let Some(raw) = store.get_raw(&state_key::client_connections(client_id)).await else {
        return Vec::new();
    };
    serde_json::from_slice::<Vec<String>>(&raw)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| id.parse().ok())
        .collect()
}

/// Appends `connection_id` to `ClientConnectionPaths[client_id]`. Additive
/// only — entries are never removed, since connection records are never
/// destroyed once created (§3, "Lifecycle").
pub async fn add_connection_to_client<S: StateWrite + ?Sized>(
    store: &S,
    client_id: &str,
    connection_id: &ConnectionId,
) {
    let mut paths = client_connection_paths(store, client_id).await;
    let id_str = connection_id.to_string();
    if !paths.iter().any(|id| id.to_string() == id_str) {
        paths.push(connection_id.clone());
    }
    let encoded = serde_json::to_vec(
        &paths.iter().map(ToString::to_string).collect::<Vec<_>>(),
    )
    .expect("serializing a list of strings never fails");
    store
        .put_raw(state_key::client_connections(client_id), encoded)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn round_trips_through_storage() {
        let store = InMemoryStore::new();
        let id: ConnectionId = "connection-0".parse().unwrap();
        assert!(get_connection(&store, &id).await.is_none());

        let end = ConnectionEnd::new(
            ConnectionState::Init,
            "client-a".parse().unwrap(),
            Counterparty::new("client-b".parse().unwrap(), None, b"ibc".to_vec().try_into().unwrap()),
            vec![Version { identifier: "1".to_string(), features: vec![] }],
            std::time::Duration::from_secs(0),
        );
        put_connection(&store, &id, &end).await;
        assert_eq!(get_connection(&store, &id).await.unwrap().state, end.state);
    }

    #[tokio::test]
    async fn client_connection_paths_are_additive() {
        let store = InMemoryStore::new();
        let a: ConnectionId = "connection-0".parse().unwrap();
        let b: ConnectionId = "connection-1".parse().unwrap();
        add_connection_to_client(&store, "client-a", &a).await;
        add_connection_to_client(&store, "client-a", &b).await;
        let paths = client_connection_paths(&store, "client-a").await;
        assert_eq!(paths, vec![a, b]);
    }
}
