//! # darkmatch-node
//!
//! Wires one node's pipeline together and drives it.
//!
//! ```text
//! open_order ──► Ranker ──tick──► Matcher ──Matched──► Confirmer
//!                  ▲                                      │ Accepted
//!                  └──── remove ◄──── Settler ◄───────────┘
//! ```
//!
//! The [`Engine`] owns the four stages and the collaborators they share.
//! [`telemetry`] sets up the tracing subscriber from [`LoggingConfig`].
//!
//! [`LoggingConfig`]: darkmatch_types::LoggingConfig

pub mod engine;
pub mod telemetry;

pub use engine::Engine;
