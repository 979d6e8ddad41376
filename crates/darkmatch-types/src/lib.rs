//! # darkmatch-types
//!
//! Shared types, errors, configuration and collaborator interfaces for the
//! **Darkmatch** secret-shared order matching pipeline.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`ComputationId`], [`JoinId`], [`NetworkId`]
//! - **Epochs**: [`Epoch`], [`EpochHash`], [`EpochDepth`]
//! - **Computation model**: [`Computation`], [`ComputationState`]
//! - **Order model**: [`Order`], [`OrderFragment`], [`PriorityOrder`], [`CoExp`]
//! - **Field arithmetic**: [`Scalar`], [`Share`]
//! - **Collaborators**: [`Smpcer`], [`Ledger`], [`Settlement`], [`Storer`] (+ [`MemoryStorer`])
//! - **Configuration**: [`NodeConfig`] and its sections
//! - **Errors**: [`DarkmatchError`] with `DM_ERR_` prefix codes
//! - **Constants**: field prime, join sizes and defaults

pub mod computation;
pub mod config;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod order;
pub mod share;
pub mod smpc;
pub mod storer;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

// Re-export all primary types at crate root for ergonomic imports:
//   use darkmatch_types::{Computation, OrderId, Storer, ...};

pub use computation::*;
pub use config::*;
pub use epoch::*;
pub use error::*;
pub use ids::*;
pub use ledger::*;
pub use order::*;
pub use share::*;
pub use smpc::*;
pub use storer::*;

// Constants are accessed via `darkmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
