//! Identifiers used throughout Darkmatch.
//!
//! Order identifiers are opaque 32-byte hashes assigned by the network when
//! an order is opened. Computation identifiers are derived from the pair of
//! orders they evaluate, so every node that ranks the same pair agrees on the
//! same ID without coordinating.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::EpochDepth;

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Network-wide order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub [u8; 32]);

impl OrderId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First four bytes in hex, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// ComputationId
// ---------------------------------------------------------------------------

/// Content-derived identifier of a buy/sell pairing.
///
/// `SHA-256(domain_sep || buy || sell [|| epoch_depth])`. The depth is only
/// mixed in for pairings from a previous epoch, so current-epoch IDs keep the
/// two-argument form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ComputationId(pub [u8; 32]);

impl ComputationId {
    #[must_use]
    pub fn new(buy: &OrderId, sell: &OrderId) -> Self {
        Self::hash(buy, sell, None)
    }

    #[must_use]
    pub fn with_epoch_depth(buy: &OrderId, sell: &OrderId, depth: EpochDepth) -> Self {
        if depth.is_current() {
            Self::new(buy, sell)
        } else {
            Self::hash(buy, sell, Some(depth))
        }
    }

    fn hash(buy: &OrderId, sell: &OrderId, depth: Option<EpochDepth>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"darkmatch:computation_id:v1:");
        hasher.update(buy.0);
        hasher.update(sell.0);
        if let Some(depth) = depth {
            hasher.update(depth.0.to_le_bytes());
        }
        let result = hasher.finalize();
        let mut id = [0u8; 32];
        id.copy_from_slice(&result);
        Self(id)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "com:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// JoinId
// ---------------------------------------------------------------------------

/// Correlation ID of a secure-computation join.
///
/// The computation ID followed by a one-byte stage marker, so a reconstructed
/// value can be routed back to the pipeline stage that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct JoinId {
    pub computation: ComputationId,
    pub marker: u8,
}

impl JoinId {
    #[must_use]
    pub fn new(computation: ComputationId, marker: u8) -> Self {
        Self {
            computation,
            marker,
        }
    }

    /// Wire form: 33 bytes, marker last.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut bytes = [0u8; 33];
        bytes[..32].copy_from_slice(&self.computation.0);
        bytes[32] = self.marker;
        bytes
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 33]) -> Self {
        let mut computation = [0u8; 32];
        computation.copy_from_slice(&bytes[..32]);
        Self {
            computation: ComputationId(computation),
            marker: bytes[32],
        }
    }
}

impl fmt::Display for JoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.computation, self.marker)
    }
}
