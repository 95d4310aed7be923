//! Version negotiation (§4.2.5).
//!
//! An ordered list with "newest at tail" policy: `latest_version` is the
//! tail, `pick_version` is the first counterparty entry that also appears in
//! the local list. The policy is encoded here explicitly rather than relied
//! upon implicitly from whatever container happens to preserve insertion
//! order.

use ibc_types::core::connection::Version;

use crate::error::ConnectionError;

/// The versions this chain supports, newest last. A real deployment would
/// source this from chain configuration; it's a process-wide constant here
/// because this crate has no configuration layer of its own beyond it.
pub fn compatible_versions() -> Vec<Version> {
    vec![Version { identifier: "1".to_string(), features: vec![] }]
}

/// The leftmost entry of `counterparty_versions` that also appears in
/// `supported_versions`. Fails `InvalidVersion` on an empty list or an empty
/// intersection.
pub fn pick_version(
    counterparty_versions: &[Version],
    supported_versions: &[Version],
) -> Result<Version, ConnectionError> {
    if counterparty_versions.is_empty() {
        return Err(ConnectionError::InvalidVersion {
            reason: "counterparty offered no versions".to_string(),
        });
    }

    counterparty_versions
        .iter()
        .find(|v| supported_versions.contains(v))
        .cloned()
        .ok_or_else(|| ConnectionError::InvalidVersion {
            reason: format!(
                "no version in {:?} is supported locally ({:?})",
                counterparty_versions, supported_versions
            ),
        })
}

/// The tail of an ordered version list: the most recently negotiated version.
pub fn latest_version(versions: &[Version]) -> Option<&Version> {
    versions.last()
}
