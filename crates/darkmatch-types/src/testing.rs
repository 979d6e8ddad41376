//! In-memory doubles of the pipeline's collaborators.
//!
//! Enabled for this crate's own tests and, for other crates, through the
//! `test-helpers` feature.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    DarkmatchError, Join, JoinCallback, JoinId, Ledger, LedgerStatus, NetworkId, Order, OrderId,
    Result, Scalar, Settlement, Smpcer,
};

impl OrderId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

// ---------------------------------------------------------------------------
// MockSmpcer
// ---------------------------------------------------------------------------

type JoinFn = Arc<dyn Fn(&Join) -> Vec<Scalar> + Send + Sync>;

/// How [`MockSmpcer`] answers a join.
#[derive(Clone)]
pub enum SmpcBehavior {
    /// Every reconstructed value is this scalar.
    Constant(Scalar),
    /// Returns the submitted share values, as if the sharing were degree
    /// zero (see `OrderFragment::unshared`).
    Passthrough,
    /// Arbitrary answer computed from the join.
    Custom(JoinFn),
    /// `join` returns an error and never calls back.
    Fail,
}

struct QueuedJoin {
    id: JoinId,
    values: Vec<Scalar>,
    callback: JoinCallback,
}

/// Scriptable secure-computation service that records every join.
pub struct MockSmpcer {
    behavior: Mutex<SmpcBehavior>,
    deferred: bool,
    calls: Mutex<Vec<(NetworkId, Join)>>,
    queued: Mutex<Vec<QueuedJoin>>,
}

impl MockSmpcer {
    #[must_use]
    pub fn new(behavior: SmpcBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            deferred: false,
            calls: Mutex::new(Vec::new()),
            queued: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn constant(value: Scalar) -> Self {
        Self::new(SmpcBehavior::Constant(value))
    }

    #[must_use]
    pub fn passthrough() -> Self {
        Self::new(SmpcBehavior::Passthrough)
    }

    pub fn custom(f: impl Fn(&Join) -> Vec<Scalar> + Send + Sync + 'static) -> Self {
        Self::new(SmpcBehavior::Custom(Arc::new(f)))
    }

    /// Hold callbacks until [`MockSmpcer::flush`] instead of invoking them
    /// inside `join`.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    pub fn set_behavior(&self, behavior: SmpcBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Run every queued callback, returning how many ran. Callbacks issued
    /// while flushing are queued for the next flush.
    pub fn flush(&self) -> usize {
        let queued = std::mem::take(&mut *self.queued.lock());
        let n = queued.len();
        for q in queued {
            (q.callback)(q.id, q.values);
        }
        n
    }

    /// Flush until no callbacks remain.
    pub fn flush_all(&self) -> usize {
        let mut total = 0;
        loop {
            let n = self.flush();
            if n == 0 {
                return total;
            }
            total += n;
        }
    }

    pub fn pending(&self) -> usize {
        self.queued.lock().len()
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of joins issued with this stage marker.
    pub fn calls_with_marker(&self, marker: u8) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, j)| j.id.marker == marker)
            .count()
    }

    pub fn joins(&self) -> Vec<Join> {
        self.calls.lock().iter().map(|(_, j)| j.clone()).collect()
    }
}

impl Smpcer for MockSmpcer {
    fn join(&self, network: NetworkId, join: Join, callback: JoinCallback) -> Result<()> {
        let behavior = self.behavior.lock().clone();
        let values = match behavior {
            SmpcBehavior::Constant(v) => vec![v; join.len()],
            SmpcBehavior::Passthrough => join.values.clone(),
            SmpcBehavior::Custom(f) => f(&join),
            SmpcBehavior::Fail => {
                return Err(DarkmatchError::JoinFailed {
                    reason: "mock smpcer configured to fail".into(),
                });
            }
        };
        let id = join.id;
        self.calls.lock().push((network, join));
        if self.deferred {
            self.queued.lock().push(QueuedJoin {
                id,
                values,
                callback,
            });
        } else {
            callback(id, values);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub status: LedgerStatus,
    pub depth: u64,
    pub matched: Option<OrderId>,
}

/// In-memory ledger. Unknown orders are `Open` at depth zero.
#[derive(Default)]
pub struct MockLedger {
    entries: Mutex<HashMap<OrderId, LedgerEntry>>,
    confirm_calls: AtomicUsize,
    fail_confirm: AtomicBool,
    fail_reads: AtomicBool,
}

impl MockLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed pair directly, as if another node confirmed it.
    pub fn set_match(&self, buy: OrderId, sell: OrderId, depth: u64) {
        let mut entries = self.entries.lock();
        for (id, other) in [(buy, sell), (sell, buy)] {
            entries.insert(
                id,
                LedgerEntry {
                    status: LedgerStatus::Confirmed,
                    depth,
                    matched: Some(other),
                },
            );
        }
    }

    pub fn set_status(&self, order: OrderId, status: LedgerStatus, depth: u64) {
        self.entries.lock().insert(
            order,
            LedgerEntry {
                status,
                depth,
                matched: None,
            },
        );
    }

    /// Mine `blocks` blocks: every recorded order gets deeper.
    pub fn mine(&self, blocks: u64) {
        for entry in self.entries.lock().values_mut() {
            entry.depth += blocks;
        }
    }

    pub fn entry(&self, order: &OrderId) -> Option<LedgerEntry> {
        self.entries.lock().get(order).copied()
    }

    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub fn fail_confirm(&self, fail: bool) {
        self.fail_confirm.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DarkmatchError::Ledger {
                reason: "mock ledger unavailable".into(),
            });
        }
        Ok(())
    }
}

impl Ledger for MockLedger {
    fn confirm_order(&self, buy: OrderId, sell: OrderId) -> Result<()> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_confirm.load(Ordering::SeqCst) {
            return Err(DarkmatchError::Ledger {
                reason: "mock ledger rejected confirmation".into(),
            });
        }
        let already = {
            let entries = self.entries.lock();
            [buy, sell]
                .iter()
                .any(|id| entries.get(id).is_some_and(|e| e.status != LedgerStatus::Open))
        };
        if already {
            return Err(DarkmatchError::Ledger {
                reason: "order is not open".into(),
            });
        }
        self.set_match(buy, sell, 0);
        Ok(())
    }

    fn depth(&self, order: OrderId) -> Result<u64> {
        self.check_reads()?;
        Ok(self.entries.lock().get(&order).map_or(0, |e| e.depth))
    }

    fn status(&self, order: OrderId) -> Result<LedgerStatus> {
        self.check_reads()?;
        Ok(self
            .entries
            .lock()
            .get(&order)
            .map_or(LedgerStatus::Open, |e| e.status))
    }

    fn order_match(&self, order: OrderId) -> Result<OrderId> {
        self.check_reads()?;
        self.entries
            .lock()
            .get(&order)
            .and_then(|e| e.matched)
            .ok_or_else(|| DarkmatchError::Ledger {
                reason: format!("no match recorded for {}", order.short()),
            })
    }
}

// ---------------------------------------------------------------------------
// MockSettlement
// ---------------------------------------------------------------------------

/// Settlement contract that records what it was asked to settle.
#[derive(Default)]
pub struct MockSettlement {
    settled: Mutex<Vec<(Order, Order)>>,
    fail: AtomicBool,
}

impl MockSettlement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn settled(&self) -> Vec<(Order, Order)> {
        self.settled.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.settled.lock().len()
    }
}

impl Settlement for MockSettlement {
    fn settle(&self, buy: &Order, sell: &Order) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DarkmatchError::SettlementFailed {
                reason: "mock settlement configured to fail".into(),
            });
        }
        self.settled.lock().push((buy.clone(), sell.clone()));
        Ok(())
    }

    fn is_settled(&self, buy: OrderId, sell: OrderId) -> Result<bool> {
        Ok(self
            .settled
            .lock()
            .iter()
            .any(|(b, s)| b.id == buy && s.id == sell))
    }
}
