//! # darkmatch-settlement
//!
//! **Finality**: everything that happens to a computation after the matcher
//! has found it `Matched`.
//!
//! ## Architecture
//!
//! 1. The [`Confirmer`] registers matched pairs with the shared ledger and
//!    polls until the ledger's record of each pair is deep enough to be
//!    final. Final pairs are persisted as `Accepted` and emitted once.
//! 2. The [`Settler`] reconstructs both plaintext orders of an accepted
//!    computation in a single secure-computation join and hands them to
//!    the settlement contract, then persists the computation as `Settled`.
//!
//! Both guard against doing the same work twice with an
//! [`IdempotencyGuard`]; errors that have no caller to return to are
//! reported through an [`ErrorSink`].

pub mod confirmer;
pub mod idempotency;
pub mod settler;
pub mod sink;

pub use confirmer::Confirmer;
pub use idempotency::IdempotencyGuard;
pub use settler::Settler;
pub use sink::ErrorSink;
