//! Connection handshake and packet-timeout state machines for an IBC core.
//!
//! This crate implements two of an IBC implementation's state machines — the
//! [`handshake`] connection handshake engine and the [`timeout`] packet
//! timeout engine — plus the collaborators they both depend on: a narrow
//! storage contract ([`store`]), a sealed light-client capability layer
//! ([`client`]), and the proof-verification facade ([`proof_verification`])
//! that bridges the two. Everything else an IBC stack needs — the channel
//! handshake, the light-client header-verification pipeline, packet receive
//! and acknowledgement — is out of scope and represented here only by the
//! narrow trait each engine actually calls through.

pub mod channel;
pub mod client;
pub mod commitment;
pub mod connection;
pub mod error;
pub mod event;
pub mod handshake;
pub mod packet;
pub mod proof_verification;
pub mod state_key;
pub mod store;
pub mod timeout;
pub mod version;

pub use error::{ConnectionError, PacketError};
pub use event::IbcEvent;
pub use handshake::{ConnectionHandshake, HandshakeConfig};
pub use timeout::PacketTimeout;
