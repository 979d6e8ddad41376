//! Error types for the Darkmatch pipeline.
//!
//! All errors use the `DM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Computation errors
//! - 2xx: Order / fragment errors
//! - 3xx: Secure-computation errors
//! - 4xx: Ledger errors
//! - 5xx: Settlement errors
//! - 6xx: Storage errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{ComputationId, ComputationState, JoinId, LedgerStatus, OrderId};

/// Central error enum for all Darkmatch operations.
#[derive(Debug, Clone, Error)]
pub enum DarkmatchError {
    // =================================================================
    // Computation Errors (1xx)
    // =================================================================
    /// No computation with this ID is stored.
    #[error("DM_ERR_100: Computation not found: {0}")]
    ComputationNotFound(ComputationId),

    /// The requested state change would move a computation backwards or
    /// skip a stage of its lifecycle.
    #[error("DM_ERR_101: Invalid state transition for {id}: {from} -> {to}")]
    InvalidStateTransition {
        id: ComputationId,
        from: ComputationState,
        to: ComputationState,
    },

    /// A resolution for this computation is already in flight.
    #[error("DM_ERR_102: Computation already being resolved: {0}")]
    ResolutionInProgress(ComputationId),

    /// The computation already has an outcome and cannot be resolved again.
    #[error("DM_ERR_103: Computation already resolved: {id} is {state}")]
    AlreadyResolved {
        id: ComputationId,
        state: ComputationState,
    },

    /// No outcome arrived within the caller's resolution deadline.
    #[error("DM_ERR_104: Computation resolution timed out: {0}")]
    ResolutionTimedOut(ComputationId),

    /// The matcher gave up on a resolution without reaching an outcome.
    #[error("DM_ERR_105: Computation resolution aborted: {0}")]
    ResolutionAborted(ComputationId),

    // =================================================================
    // Order Errors (2xx)
    // =================================================================
    /// No fragment of this order is held locally.
    #[error("DM_ERR_200: Order fragment not found: {0}")]
    FragmentNotFound(OrderId),

    /// Two shares that must be combined were taken at different indices.
    #[error("DM_ERR_201: Share index mismatch: {left} != {right}")]
    ShareIndexMismatch { left: u64, right: u64 },

    // =================================================================
    // Secure-computation Errors (3xx)
    // =================================================================
    /// The secure-computation service refused a join request.
    #[error("DM_ERR_300: Join failed: {reason}")]
    JoinFailed { reason: String },

    /// A join completed with the wrong number of values.
    #[error("DM_ERR_301: Malformed join {id}: expected {expected} values, got {actual}")]
    MalformedJoin {
        id: JoinId,
        expected: usize,
        actual: usize,
    },

    /// A join completed for a stage nobody is waiting on.
    #[error("DM_ERR_302: Unexpected join: {0}")]
    UnexpectedJoin(JoinId),

    // =================================================================
    // Ledger Errors (4xx)
    // =================================================================
    /// A ledger call failed.
    #[error("DM_ERR_400: Ledger error: {reason}")]
    Ledger { reason: String },

    /// The ledger finalised an order in a status other than confirmed.
    #[error("DM_ERR_401: Order {order} not confirmed: status is {status}")]
    OrderNotConfirmed { order: OrderId, status: LedgerStatus },

    /// The confirmer was handed a computation that is not matched.
    #[error("DM_ERR_402: Computation {id} is {state}, expected MATCHED")]
    NotMatched {
        id: ComputationId,
        state: ComputationState,
    },

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// The settlement contract rejected the reconstructed orders.
    #[error("DM_ERR_500: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    /// Settlement for this computation is in flight or has completed.
    #[error("DM_ERR_501: Computation already settled: {0}")]
    AlreadySettled(ComputationId),

    // =================================================================
    // Storage Errors (6xx)
    // =================================================================
    /// The storer failed to read or write.
    #[error("DM_ERR_600: Storage error: {0}")]
    Storage(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("DM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("DM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, out-of-range values, etc.).
    #[error("DM_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("DM_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DarkmatchError>;

impl From<std::io::Error> for DarkmatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DarkmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
