//! Epoch identity.
//!
//! An epoch is a network-wide period during which one sharding and pod
//! assignment is in effect. Order fragments are only comparable when they
//! were produced in the same epoch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hash of the ledger block that opened an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EpochHash(pub [u8; 32]);

impl fmt::Display for EpochHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch:{}", hex::encode(&self.0[..8]))
    }
}

/// How many epochs back a fragment was produced. `0` is the current epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct EpochDepth(pub u32);

impl EpochDepth {
    pub const CURRENT: Self = Self(0);
    pub const PREVIOUS: Self = Self(1);

    #[must_use]
    pub fn is_current(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EpochDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An epoch as seen from this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Epoch {
    pub hash: EpochHash,
    pub depth: EpochDepth,
}

impl Epoch {
    #[must_use]
    pub fn new(hash: EpochHash, depth: EpochDepth) -> Self {
        Self { hash, depth }
    }

    /// The secure-computation network serving this epoch.
    #[must_use]
    pub fn network_id(&self) -> NetworkId {
        NetworkId(self.hash.0)
    }
}

/// Identifies the group of nodes that jointly reconstruct shares.
///
/// Derived from the epoch hash: each epoch forms its own network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NetworkId(pub [u8; 32]);

impl From<EpochHash> for NetworkId {
    fn from(hash: EpochHash) -> Self {
        Self(hash.0)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net:{}", hex::encode(&self.0[..8]))
    }
}
