//! System-wide constants for the Darkmatch pipeline.

/// Prime modulus of the secret-sharing field: `2^64 - 59`, the largest
/// 64-bit prime.
pub const FIELD_PRIME: u64 = 0xFFFF_FFFF_FFFF_FFC5;

/// Secret values per order reconstructed at settlement: tokens, price
/// (co, exp), volume (co, exp), minimum volume (co, exp), nonce.
pub const VALUES_PER_ORDER: usize = 8;

/// Values in one settlement join: buy order then sell order.
pub const SETTLEMENT_JOIN_VALUES: usize = 2 * VALUES_PER_ORDER;

/// Stage marker of the settlement join (matcher stages use 1..=7).
pub const SETTLEMENT_JOIN_MARKER: u8 = 8;

/// Default number of cooperating rankers.
pub const DEFAULT_NUM_RANKERS: u64 = 1;

/// Default interval between finality polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 14_000;

/// Default ledger depth at which a match is treated as final.
pub const DEFAULT_DEPTH_THRESHOLD: u64 = 16;

/// Default capacity of the confirmed-match output.
pub const DEFAULT_CONFIRMER_BUFFER: usize = 128;

/// Default capacity of error outputs. Errors beyond it are dropped and
/// counted.
pub const DEFAULT_ERROR_BUFFER: usize = 256;

/// Number of emitted order IDs the confirmer remembers for de-duplication.
pub const DEFAULT_EMITTED_CACHE_SIZE: usize = 100_000;

/// Default interval between engine compute ticks, in milliseconds.
pub const DEFAULT_COMPUTE_INTERVAL_MS: u64 = 100;

/// Default number of computations drained from the ranker per tick.
pub const DEFAULT_COMPUTE_BATCH_SIZE: usize = 64;

/// Default time allowed for one computation to resolve, in milliseconds.
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 30_000;

/// Default capacity of the matched-computation queue into the confirmer.
pub const DEFAULT_MATCHED_BUFFER: usize = 128;

/// Settlement idempotency cache size (number of computation IDs to remember).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 500_000;

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Darkmatch";
