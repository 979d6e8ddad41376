//! # darkmatch-matchcore
//!
//! **Compute plane**: decides whether a buy/sell pair is compatible using
//! only secret shares. No node ever sees either order in plaintext; the
//! only values reconstructed are the signs of a handful of differences.
//!
//! - **Staged**: seven comparisons run strictly in order, each issued only
//!   after the previous one reported non-mismatch
//! - **Short-circuit**: the first failing comparison resolves the pair to
//!   `Mismatched` and nothing further is reconstructed
//! - **Callback-driven**: a stage returns as soon as its join is submitted;
//!   the secure-computation service resumes the pipeline later

pub mod matcher;
pub mod stage;

pub use matcher::{MatchCallback, Matcher};
pub use stage::Stage;
