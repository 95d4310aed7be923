//! Channel records, read-only to this crate (§3, "Channel").
//!
//! The channel handshake itself is out of scope (§1); this crate only ever
//! reads a `ChannelEnd` to learn its ordering, counterparty, and connection
//! hop, and — for ordered channels — writes its `state` back to `CLOSED` on a
//! proven timeout (§4.3.2). Everything else about channel lifecycle belongs
//! to the channel module.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
pub use ibc_types::core::channel::channel::{Order as ChannelOrdering, State as ChannelState};
pub use ibc_types::core::channel::{ChannelEnd, ChannelId, PortId};

/// The "`channel_keeper`" collaborator from §6.
#[async_trait]
pub trait ChannelKeeper: Send + Sync {
    async fn channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<ChannelEnd>;

    /// Only the packet timeout engine writes through this trait, and only to
    /// flip an ordered channel to `CLOSED` on a proven timeout (§4.3.2).
    async fn set_channel(&self, port_id: &PortId, channel_id: &ChannelId, channel: ChannelEnd);
}

/// An in-memory stand-in for the channel module, used by tests to seed
/// channel records without a real channel handshake.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<(PortId, ChannelId), ChannelEnd>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelKeeper for ChannelRegistry {
    async fn channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<ChannelEnd> {
        self.channels
            .read()
            .unwrap()
            .get(&(port_id.clone(), channel_id.clone()))
            .cloned()
    }

    async fn set_channel(&self, port_id: &PortId, channel_id: &ChannelId, channel: ChannelEnd) {
        self.channels
            .write()
            .unwrap()
            .insert((port_id.clone(), channel_id.clone()), channel);
    }
}
