//! Order records.
//!
//! A node never holds an [`Order`] in plaintext while it is open. It holds an
//! [`OrderFragment`]: one share of every secret field, plus the public
//! metadata needed to route it. Plaintext orders only appear after a match
//! has been confirmed and the settler reconstructs them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EpochDepth, OrderId, Share};

/// Which side of the market an order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderParity {
    Buy,
    Sell,
}

impl fmt::Display for OrderParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderType {
    Midpoint,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Midpoint => write!(f, "MIDPOINT"),
            Self::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Coefficient/exponent encoding used for prices and volumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoExp {
    pub co: u64,
    pub exp: u64,
}

impl CoExp {
    #[must_use]
    pub fn new(co: u64, exp: u64) -> Self {
        Self { co, exp }
    }
}

/// Shares of a [`CoExp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoExpShare {
    pub co: Share,
    pub exp: Share,
}

/// A reconstructed, plaintext order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub parity: OrderParity,
    pub order_type: OrderType,
    pub expiry: DateTime<Utc>,
    pub tokens: u64,
    pub price: CoExp,
    pub volume: CoExp,
    pub minimum_volume: CoExp,
    pub nonce: u64,
}

/// The locally held secret-shared form of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFragment {
    pub order_id: OrderId,
    pub parity: OrderParity,
    pub order_type: OrderType,
    pub expiry: DateTime<Utc>,
    /// Epoch that produced this fragment, relative to the current one.
    pub epoch_depth: EpochDepth,
    pub tokens: Share,
    pub price: CoExpShare,
    pub volume: CoExpShare,
    pub minimum_volume: CoExpShare,
    pub nonce: Share,
}

impl OrderFragment {
    /// Share index of this fragment.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.tokens.index
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Logical-time rank of an open order. Smaller is higher priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Priority(pub u64);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An order as seen by the ranker: its ID and its priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriorityOrder {
    pub id: OrderId,
    pub priority: Priority,
}

impl PriorityOrder {
    #[must_use]
    pub fn new(id: OrderId, priority: u64) -> Self {
        Self {
            id,
            priority: Priority(priority),
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A one-token order with the given price and volume and a minimum
    /// volume of zero.
    pub fn dummy(parity: OrderParity, price: CoExp, volume: CoExp) -> Self {
        Self {
            id: OrderId::random(),
            parity,
            order_type: OrderType::Limit,
            expiry: Utc::now() + chrono::Duration::hours(24),
            tokens: 1,
            price,
            volume,
            minimum_volume: CoExp::default(),
            nonce: rand::random::<u32>().into(),
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl OrderFragment {
    /// Fragment of a degree-zero sharing: every share value equals the
    /// secret, so joining any one share reconstructs it.
    pub fn unshared(order: &Order, index: u64, epoch_depth: EpochDepth) -> Self {
        use crate::Scalar;

        let share = |value: u64| Share::new(index, Scalar::new(value));
        let co_exp = |value: CoExp| CoExpShare {
            co: share(value.co),
            exp: share(value.exp),
        };
        Self {
            order_id: order.id,
            parity: order.parity,
            order_type: order.order_type,
            expiry: order.expiry,
            epoch_depth,
            tokens: share(order.tokens),
            price: co_exp(order.price),
            volume: co_exp(order.volume),
            minimum_volume: co_exp(order.minimum_volume),
            nonce: share(order.nonce),
        }
    }
}
