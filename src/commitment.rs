//! The local chain's commitment prefix (§3, "Counterparty"; §6, `commitment.prefix()`).
//!
//! The commitment module itself — and the cryptography behind Merkle proofs —
//! is out of scope (§1); this crate only needs the one process-wide constant
//! the module exposes.

use ibc_types::core::commitment::MerklePrefix;

/// The prefix under which this chain writes its own IBC records. A real
/// embedder would source this from the commitment module's configuration;
/// it is a constant here because that module is out of this crate's scope.
pub fn local_prefix() -> MerklePrefix {
    MerklePrefix {
        key_prefix: b"ibc".to_vec(),
    }
}
