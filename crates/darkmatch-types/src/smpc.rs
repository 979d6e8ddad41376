//! Interface to the secure multi-party computation service.
//!
//! The service collects the share held by each node for a [`Join`] and,
//! once a threshold of nodes has contributed, invokes the supplied callback
//! with the reconstructed values. The callback runs on whatever task the
//! service chooses and may arrive after the requester has gone away.

use crate::{DarkmatchError, JoinId, NetworkId, Result, Scalar, Share};

/// One reconstruction request: this node's shares, all at one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub id: JoinId,
    pub index: u64,
    /// Share values, in the order the reconstructed values are returned.
    pub values: Vec<Scalar>,
}

impl Join {
    /// Build a join from shares that must all share one index.
    ///
    /// # Errors
    /// Returns [`DarkmatchError::ShareIndexMismatch`] if two shares disagree
    /// on their index, and [`DarkmatchError::Internal`] if `shares` is empty.
    pub fn from_shares(id: JoinId, shares: &[Share]) -> Result<Self> {
        let first = shares
            .first()
            .ok_or_else(|| DarkmatchError::Internal(format!("empty join {id}")))?;
        if let Some(other) = shares.iter().find(|s| s.index != first.index) {
            return Err(DarkmatchError::ShareIndexMismatch {
                left: first.index,
                right: other.index,
            });
        }
        Ok(Self {
            id,
            index: first.index,
            values: shares.iter().map(|s| s.value).collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Continuation invoked once per join with the reconstructed values.
pub type JoinCallback = Box<dyn FnOnce(JoinId, Vec<Scalar>) + Send + 'static>;

/// Secure-computation capability consumed by the matcher and settler.
pub trait Smpcer: Send + Sync {
    /// Submit `join` to `network`. Must not block on reconstruction; the
    /// result is delivered through `callback` exactly once.
    fn join(&self, network: NetworkId, join: Join, callback: JoinCallback) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComputationId;

    fn join_id() -> JoinId {
        JoinId::new(ComputationId([5; 32]), 1)
    }

    #[test]
    fn from_shares_keeps_order() {
        let shares = [
            Share::new(2, Scalar::new(10)),
            Share::new(2, Scalar::new(20)),
        ];
        let join = Join::from_shares(join_id(), &shares).unwrap();
        assert_eq!(join.index, 2);
        assert_eq!(join.values, vec![Scalar::new(10), Scalar::new(20)]);
        assert_eq!(join.len(), 2);
    }

    #[test]
    fn from_shares_rejects_mixed_indices() {
        let shares = [Share::new(1, Scalar::ZERO), Share::new(2, Scalar::ZERO)];
        let err = Join::from_shares(join_id(), &shares).unwrap_err();
        assert!(matches!(
            err,
            DarkmatchError::ShareIndexMismatch { left: 1, right: 2 }
        ));
    }

    #[test]
    fn from_shares_rejects_empty() {
        assert!(Join::from_shares(join_id(), &[]).is_err());
    }
}
