//! Interfaces to the shared ledger and the settlement contract.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Order, OrderId, Result};

/// Status of an order as recorded on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerStatus {
    Open,
    Confirmed,
    Canceled,
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// Eventually consistent public record of order matches.
///
/// Implementations must be safe for concurrent use.
pub trait Ledger: Send + Sync {
    /// Register `buy` and `sell` as matched with each other.
    fn confirm_order(&self, buy: OrderId, sell: OrderId) -> Result<()>;

    /// Number of blocks mined on top of the order's latest status change.
    fn depth(&self, order: OrderId) -> Result<u64>;

    fn status(&self, order: OrderId) -> Result<LedgerStatus>;

    /// The counter-order a confirmed order was matched with.
    fn order_match(&self, order: OrderId) -> Result<OrderId>;
}

/// Settlement contract that moves funds for a reconstructed match.
pub trait Settlement: Send + Sync {
    fn settle(&self, buy: &Order, sell: &Order) -> Result<()>;

    /// Whether `buy` and `sell` have already been settled with each other.
    fn is_settled(&self, buy: OrderId, sell: OrderId) -> Result<bool>;
}
