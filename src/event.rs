//! Observable effects of a successful handshake transition (§6).
//!
//! Every successful transition both logs a human-readable record and
//! produces an [`IbcEvent`] for the host's event bus — the structured fields
//! are what a relayer actually parses, the log line is for operators.

use ibc_types::core::connection::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbcEvent {
    pub connection_id: ConnectionId,
    pub client_id: String,
    pub counterparty_connection_id: Option<ConnectionId>,
    pub counterparty_client_id: String,
}

/// Logs the transition and builds the event the caller hands to the host's
/// event bus. `from`/`to` are the state names, not the typed enum, so this
/// stays usable from both the CHE (states) and any future caller without
/// pulling in `connection::State` here.
pub fn connection_state_updated(
    connection_id: &ConnectionId,
    client_id: &str,
    counterparty_connection_id: Option<&ConnectionId>,
    counterparty_client_id: &str,
    from: &str,
    to: &str,
) -> IbcEvent {
    tracing::info!(
        connection_id = %connection_id,
        client_id,
        from,
        to,
        "connection {} state updated: {} -> {}",
        connection_id,
        from,
        to,
    );

    IbcEvent {
        connection_id: connection_id.clone(),
        client_id: client_id.to_string(),
        counterparty_connection_id: counterparty_connection_id.cloned(),
        counterparty_client_id: counterparty_client_id.to_string(),
    }
}
