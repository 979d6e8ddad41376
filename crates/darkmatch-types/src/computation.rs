//! Computations: candidate buy/sell pairings and their lifecycle.
//!
//! ```text
//! Nil ──► Matched ────► Accepted ──► Settled
//!   │        │
//!   │        └────────► Rejected
//!   └───► Mismatched ─► Rejected
//! ```
//!
//! States only move forward. `matched` is true exactly when the computation
//! has reached `Matched`, `Accepted` or `Settled`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ComputationId, DarkmatchError, Epoch, EpochDepth, EpochHash, OrderId, Result};

/// Lifecycle state of a [`Computation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ComputationState {
    Nil,
    Matched,
    Mismatched,
    Accepted,
    Rejected,
    Settled,
}

impl ComputationState {
    /// Whether the forward-only graph has an edge `self -> next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Nil, Self::Matched | Self::Mismatched)
                | (Self::Matched, Self::Accepted | Self::Rejected)
                | (Self::Mismatched, Self::Rejected)
                | (Self::Accepted, Self::Settled)
        )
    }

    /// States that carry `matched == true`.
    #[must_use]
    pub fn is_match(self) -> bool {
        matches!(self, Self::Matched | Self::Accepted | Self::Settled)
    }

    /// Whether matching has produced an outcome for this state.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        self != Self::Nil
    }
}

impl fmt::Display for ComputationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "NIL"),
            Self::Matched => write!(f, "MATCHED"),
            Self::Mismatched => write!(f, "MISMATCHED"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// A candidate pairing of one buy and one sell order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Computation {
    pub id: ComputationId,
    pub buy: OrderId,
    pub sell: OrderId,
    pub epoch: EpochHash,
    pub epoch_depth: EpochDepth,
    pub state: ComputationState,
    pub matched: bool,
    pub timestamp: DateTime<Utc>,
}

impl Computation {
    #[must_use]
    pub fn new(buy: OrderId, sell: OrderId, epoch: Epoch) -> Self {
        Self {
            id: ComputationId::with_epoch_depth(&buy, &sell, epoch.depth),
            buy,
            sell,
            epoch: epoch.hash,
            epoch_depth: epoch.depth,
            state: ComputationState::Nil,
            matched: false,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        Epoch::new(self.epoch, self.epoch_depth)
    }

    /// Whether `order` is either side of this pairing.
    #[must_use]
    pub fn involves(&self, order: &OrderId) -> bool {
        self.buy == *order || self.sell == *order
    }

    /// Move to `next`, keeping `matched` consistent with the new state.
    ///
    /// # Errors
    /// Returns [`DarkmatchError::InvalidStateTransition`] if `next` is not a
    /// forward edge from the current state.
    pub fn transition(&mut self, next: ComputationState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(DarkmatchError::InvalidStateTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.matched = next.is_match();
        Ok(())
    }
}
