//! # darkmatch-ranker
//!
//! **Ranking plane**: turns newly opened orders into a locally owned,
//! priority-ordered backlog of candidate [`Computation`]s.
//!
//! ## Sharding
//!
//! Every node sees every open order but only ranks the pairs it owns: a
//! buy/sell pair belongs to shard `(buy_priority + sell_priority) mod N`.
//! Nodes at different positions therefore never duplicate work, and no
//! coordination is needed to split it.
//!
//! ```text
//! insert_buy / insert_sell → Backlog (ascending combined priority)
//!     → computations(n) → Matcher
//! ```
//!
//! [`Computation`]: darkmatch_types::Computation

pub mod backlog;
pub mod ranker;

pub use backlog::Backlog;
pub use ranker::Ranker;
