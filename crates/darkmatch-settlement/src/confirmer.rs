//! Ledger confirmation of matched computations.
//!
//! ```text
//!  matched_in ──► submission task ──confirm_order──► ledger
//!                      │ insert
//!                      ▼
//!               pending buys / sells ◄── finality task (every poll_interval)
//!                                            │ depth ≥ threshold?
//!                                            │ status == Confirmed?
//!                                            ▼
//!                                      confirmed_out (Accepted)
//! ```
//!
//! Both tasks share one lock over the pending sets and the emitted cache.
//! The lock is never held across a ledger call: a scan snapshots the pending
//! orders, queries the ledger without the lock, and re-takes it only to
//! check the order is still pending, remove it and mark it emitted. An
//! order is therefore emitted in at most one confirmed match no matter how
//! submissions and poll ticks interleave. Ledger calls are blocking and run
//! on tokio's blocking pool.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use darkmatch_types::{
    Computation, ComputationState, ConfirmerConfig, DarkmatchError, Ledger, LedgerStatus,
    OrderId, OrderParity, Result, Storer,
};
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, watch},
    task,
    time::{self, MissedTickBehavior},
};

use crate::{ErrorSink, IdempotencyGuard};

#[derive(Debug)]
struct Pending {
    buys: HashMap<OrderId, Computation>,
    sells: HashMap<OrderId, Computation>,
    /// Orders already emitted in a confirmed match.
    emitted: IdempotencyGuard<OrderId>,
}

impl Pending {
    fn side(&self, parity: OrderParity) -> &HashMap<OrderId, Computation> {
        match parity {
            OrderParity::Buy => &self.buys,
            OrderParity::Sell => &self.sells,
        }
    }

    fn side_mut(&mut self, parity: OrderParity) -> &mut HashMap<OrderId, Computation> {
        match parity {
            OrderParity::Buy => &mut self.buys,
            OrderParity::Sell => &mut self.sells,
        }
    }

    fn knows(&self, com: &Computation) -> bool {
        self.buys.contains_key(&com.buy)
            || self.sells.contains_key(&com.sell)
            || self.emitted.contains(&com.buy)
            || self.emitted.contains(&com.sell)
    }

    /// Remove `id` from its side if it is still waiting on `com`.
    fn take(&mut self, parity: OrderParity, id: OrderId, com: &Computation) -> bool {
        let side = self.side_mut(parity);
        if side.get(&id).is_some_and(|c| c.id == com.id) {
            side.remove(&id);
            true
        } else {
            false
        }
    }

    /// Drop both sides of `com` if they still refer to it.
    fn forget(&mut self, com: &Computation) {
        if self.buys.get(&com.buy).is_some_and(|c| c.id == com.id) {
            self.buys.remove(&com.buy);
        }
        if self.sells.get(&com.sell).is_some_and(|c| c.id == com.id) {
            self.sells.remove(&com.sell);
        }
    }
}

/// Turns matched computations into ledger-final, accepted ones.
pub struct Confirmer {
    ledger: Arc<dyn Ledger>,
    storer: Arc<dyn Storer>,
    config: ConfirmerConfig,
    pending: Mutex<Pending>,
    dropped_errors: Arc<AtomicU64>,
}

impl Confirmer {
    /// # Errors
    /// Returns [`DarkmatchError::Configuration`] if `config` is invalid.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        storer: Arc<dyn Storer>,
        config: ConfirmerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger,
            storer,
            pending: Mutex::new(Pending {
                buys: HashMap::new(),
                sells: HashMap::new(),
                emitted: IdempotencyGuard::new(config.emitted_cache_size),
            }),
            config,
            dropped_errors: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start the submission and finality tasks.
    ///
    /// Returns the confirmed-match output and the error output. Both close
    /// once `cancel` is set (or its sender dropped) and both tasks have
    /// exited; the confirmed output also closes the finality task when its
    /// receiver is dropped. `matched_in` closing stops submissions only.
    pub fn confirm_order_matches(
        self: &Arc<Self>,
        cancel: watch::Receiver<bool>,
        matched_in: mpsc::Receiver<Computation>,
    ) -> (mpsc::Receiver<Computation>, mpsc::Receiver<DarkmatchError>) {
        let (confirmed_tx, confirmed_rx) = mpsc::channel(self.config.buffer);
        let (errs, errs_rx) =
            ErrorSink::with_counter(self.config.error_buffer, self.dropped_errors.clone());

        tokio::spawn(self.clone().submit_loop(cancel.clone(), matched_in, errs.clone()));
        tokio::spawn(self.clone().finality_loop(cancel, confirmed_tx, errs));

        (confirmed_rx, errs_rx)
    }

    /// Errors dropped because the error output was full.
    #[must_use]
    pub fn dropped_errors(&self) -> u64 {
        self.dropped_errors.load(Ordering::Relaxed)
    }

    /// Number of orders waiting for finality, `(buys, sells)`.
    #[must_use]
    pub fn pending(&self) -> (usize, usize) {
        let pending = self.pending.lock();
        (pending.buys.len(), pending.sells.len())
    }

    async fn submit_loop(
        self: Arc<Self>,
        mut cancel: watch::Receiver<bool>,
        mut matched_in: mpsc::Receiver<Computation>,
        errs: ErrorSink,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancelled(&mut cancel) => break,
                com = matched_in.recv() => match com {
                    Some(com) => self.submit_blocking(com, &errs).await,
                    None => break,
                },
            }
        }
        tracing::debug!("Confirmer submission task stopped");
    }

    async fn finality_loop(
        self: Arc<Self>,
        mut cancel: watch::Receiver<bool>,
        confirmed_tx: mpsc::Sender<Computation>,
        errs: ErrorSink,
    ) {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        'poll: loop {
            tokio::select! {
                biased;
                () = cancelled(&mut cancel) => break,
                _ = ticker.tick() => {}
            }

            let scan = {
                let this = Arc::clone(&self);
                let errs = errs.clone();
                task::spawn_blocking(move || this.check_finality(&errs))
            };
            let accepted = match scan.await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::error!(error = %err, "Finality scan panicked");
                    continue;
                }
            };

            for com in accepted {
                tokio::select! {
                    biased;
                    () = cancelled(&mut cancel) => break 'poll,
                    sent = confirmed_tx.send(com) => {
                        if sent.is_err() {
                            tracing::debug!("Confirmed output dropped");
                            break 'poll;
                        }
                    }
                }
            }
        }
        tracing::debug!("Confirmer finality task stopped");
    }

    async fn submit_blocking(self: &Arc<Self>, com: Computation, errs: &ErrorSink) {
        let this = Arc::clone(self);
        let errs = errs.clone();
        if let Err(err) = task::spawn_blocking(move || this.submit(com, &errs)).await {
            tracing::error!(error = %err, "Submission panicked");
        }
    }

    /// Register a matched computation with the ledger and start waiting
    /// for finality. Duplicate submissions are ignored.
    fn submit(&self, com: Computation, errs: &ErrorSink) {
        if com.state != ComputationState::Matched {
            tracing::warn!(computation = %com.id, state = %com.state, "Ignoring unmatched computation");
            errs.report(DarkmatchError::NotMatched {
                id: com.id,
                state: com.state,
            });
            return;
        }

        let (buy, sell) = (com.buy, com.sell);
        {
            let mut pending = self.pending.lock();
            if pending.knows(&com) {
                tracing::debug!(computation = %com.id, "Match already pending or confirmed");
                return;
            }
            pending.buys.insert(buy, com.clone());
            pending.sells.insert(sell, com.clone());
        }

        // The pair stays pending even if this fails: another node may have
        // confirmed it already, and polling resolves either way.
        match self.ledger.confirm_order(buy, sell) {
            Ok(()) => tracing::info!(
                computation = %com.id,
                buy = %buy.short(),
                sell = %sell.short(),
                "Match submitted to ledger"
            ),
            Err(err) => {
                tracing::warn!(computation = %com.id, error = %err, "Ledger confirmation failed");
                errs.report(err);
            }
        }
    }

    /// One finality scan over every pending order. Returns the newly
    /// accepted computations, already persisted.
    fn check_finality(&self, errs: &ErrorSink) -> Vec<Computation> {
        let snapshot: Vec<(OrderParity, OrderId)> = {
            let pending = self.pending.lock();
            [OrderParity::Buy, OrderParity::Sell]
                .into_iter()
                .flat_map(|parity| pending.side(parity).keys().map(move |id| (parity, *id)))
                .collect()
        };
        snapshot
            .into_iter()
            .filter_map(|(parity, id)| self.check_order(parity, id, errs))
            .collect()
    }

    fn check_order(
        &self,
        parity: OrderParity,
        id: OrderId,
        errs: &ErrorSink,
    ) -> Option<Computation> {
        // Removed earlier in this scan along with its counter order.
        let local = self.pending.lock().side(parity).get(&id)?.clone();

        let depth = self.ledger.depth(id).map_err(|err| errs.report(err)).ok()?;
        if depth < self.config.depth_threshold {
            return None;
        }

        let status = self.ledger.status(id).map_err(|err| errs.report(err)).ok()?;
        if status != LedgerStatus::Confirmed {
            if !self.pending.lock().take(parity, id, &local) {
                return None;
            }
            tracing::warn!(order = %id.short(), %parity, %status, depth, "Order final but not confirmed");
            self.reject(local);
            errs.report(DarkmatchError::OrderNotConfirmed { order: id, status });
            return None;
        }

        let counter = self
            .ledger
            .order_match(id)
            .map_err(|err| errs.report(err))
            .ok()?;
        let (buy, sell) = match parity {
            OrderParity::Buy => (id, counter),
            OrderParity::Sell => (counter, id),
        };

        {
            let mut pending = self.pending.lock();
            // Resolved elsewhere while the ledger was queried.
            if !pending.take(parity, id, &local) {
                return None;
            }
            pending.buys.remove(&buy);
            pending.sells.remove(&sell);
            pending.forget(&local);

            if pending.emitted.contains(&buy) || pending.emitted.contains(&sell) {
                tracing::debug!(buy = %buy.short(), sell = %sell.short(), "Match already emitted");
                return None;
            }
            pending.emitted.mark(buy);
            pending.emitted.mark(sell);
        }

        let confirmed = if local.buy == buy && local.sell == sell {
            local
        } else {
            tracing::info!(
                computation = %local.id,
                buy = %buy.short(),
                sell = %sell.short(),
                "Ledger confirmed a different pair"
            );
            self.reject(local.clone());
            let mut superseding = Computation::new(buy, sell, local.epoch());
            if let Err(err) = superseding.transition(ComputationState::Matched) {
                errs.report(err);
                return None;
            }
            superseding
        };
        self.accept(confirmed, errs)
    }

    fn accept(&self, mut com: Computation, errs: &ErrorSink) -> Option<Computation> {
        if let Err(err) = com.transition(ComputationState::Accepted) {
            errs.report(err);
            return None;
        }
        if let Err(err) = self.storer.put_computation(&com) {
            tracing::error!(computation = %com.id, error = %err, "Failed to persist accepted computation");
            errs.report(err);
        }
        tracing::info!(
            computation = %com.id,
            buy = %com.buy.short(),
            sell = %com.sell.short(),
            "Match confirmed"
        );
        Some(com)
    }

    fn reject(&self, mut com: Computation) {
        if let Err(err) = com.transition(ComputationState::Rejected) {
            tracing::debug!(computation = %com.id, error = %err, "Computation not rejectable");
            return;
        }
        if let Err(err) = self.storer.put_computation(&com) {
            tracing::error!(computation = %com.id, error = %err, "Failed to persist rejected computation");
        }
    }
}

/// Resolves once `cancel` is set or its sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use darkmatch_types::{testing::MockLedger, *};

    use super::*;

    const THRESHOLD: u64 = 4;

    fn config() -> ConfirmerConfig {
        ConfirmerConfig {
            poll_interval: Duration::from_millis(10),
            depth_threshold: THRESHOLD,
            ..ConfirmerConfig::default()
        }
    }

    fn setup() -> (Arc<MockLedger>, Arc<MemoryStorer>, Arc<Confirmer>) {
        let ledger = Arc::new(MockLedger::new());
        let storer = Arc::new(MemoryStorer::new());
        let confirmer = Arc::new(Confirmer::new(ledger.clone(), storer.clone(), config()).unwrap());
        (ledger, storer, confirmer)
    }

    fn matched() -> Computation {
        let mut com = Computation::new(
            OrderId::random(),
            OrderId::random(),
            Epoch::new(EpochHash([3; 32]), EpochDepth::CURRENT),
        );
        com.transition(ComputationState::Matched).unwrap();
        com
    }

    fn drain(rx: &mut mpsc::Receiver<DarkmatchError>) -> Vec<DarkmatchError> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let ledger = Arc::new(MockLedger::new());
        let storer = Arc::new(MemoryStorer::new());
        let config = ConfirmerConfig {
            buffer: 0,
            ..config()
        };
        assert!(matches!(
            Confirmer::new(ledger, storer, config),
            Err(DarkmatchError::Configuration(_))
        ));
    }

    #[test]
    fn emits_only_past_depth_threshold() {
        let (ledger, storer, confirmer) = setup();
        let (errs, mut errs_rx) = ErrorSink::channel(16);
        let com = matched();
        confirmer.submit(com.clone(), &errs);
        assert_eq!(ledger.confirm_calls(), 1);
        assert_eq!(confirmer.pending(), (1, 1));

        // Confirmed on the ledger but not yet deep enough.
        assert!(confirmer.check_finality(&errs).is_empty());
        ledger.mine(THRESHOLD - 1);
        assert!(confirmer.check_finality(&errs).is_empty());

        ledger.mine(1);
        let out = confirmer.check_finality(&errs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, com.id);
        assert_eq!(out[0].state, ComputationState::Accepted);
        assert_eq!(storer.computation(&com.id).unwrap().state, ComputationState::Accepted);
        assert_eq!(confirmer.pending(), (0, 0));
        assert!(drain(&mut errs_rx).is_empty());
    }

    #[test]
    fn duplicate_submission_emits_once() {
        let (ledger, _storer, confirmer) = setup();
        let (errs, _errs_rx) = ErrorSink::channel(16);
        let com = matched();
        confirmer.submit(com.clone(), &errs);
        confirmer.submit(com.clone(), &errs);
        assert_eq!(ledger.confirm_calls(), 1);

        ledger.mine(THRESHOLD);
        assert_eq!(confirmer.check_finality(&errs).len(), 1);
        assert!(confirmer.check_finality(&errs).is_empty());

        // Submitting again after emission is still ignored.
        confirmer.submit(com, &errs);
        assert_eq!(ledger.confirm_calls(), 1);
        assert!(confirmer.check_finality(&errs).is_empty());
    }

    #[test]
    fn unconfirmed_order_is_purged_and_reported() {
        let (ledger, storer, confirmer) = setup();
        let (errs, mut errs_rx) = ErrorSink::channel(16);
        let com = matched();
        ledger.set_status(com.buy, LedgerStatus::Canceled, THRESHOLD);

        confirmer.submit(com.clone(), &errs);
        assert!(matches!(
            drain(&mut errs_rx).as_slice(),
            [DarkmatchError::Ledger { .. }]
        ));

        assert!(confirmer.check_finality(&errs).is_empty());
        assert_eq!(confirmer.pending(), (0, 1));
        let errors = drain(&mut errs_rx);
        assert!(matches!(
            errors.as_slice(),
            [DarkmatchError::OrderNotConfirmed { order, status: LedgerStatus::Canceled }] if *order == com.buy
        ));
        assert_eq!(storer.computation(&com.id).unwrap().state, ComputationState::Rejected);
    }

    #[test]
    fn ledger_pair_supersedes_local_pair() {
        let (ledger, storer, confirmer) = setup();
        let (errs, _errs_rx) = ErrorSink::channel(16);
        let com = matched();
        let other_sell = OrderId::random();
        ledger.set_match(com.buy, other_sell, THRESHOLD);

        confirmer.submit(com.clone(), &errs);
        let out = confirmer.check_finality(&errs);
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].buy, out[0].sell), (com.buy, other_sell));
        assert_eq!(out[0].state, ComputationState::Accepted);
        assert!(out[0].matched);
        assert_ne!(out[0].id, com.id);

        assert_eq!(storer.computation(&com.id).unwrap().state, ComputationState::Rejected);
        assert_eq!(storer.computation(&out[0].id).unwrap().state, ComputationState::Accepted);
        assert_eq!(confirmer.pending(), (0, 0));
    }

    #[test]
    fn unmatched_input_is_reported() {
        let (ledger, _storer, confirmer) = setup();
        let (errs, mut errs_rx) = ErrorSink::channel(16);
        let com = Computation::new(
            OrderId::random(),
            OrderId::random(),
            Epoch::new(EpochHash([3; 32]), EpochDepth::CURRENT),
        );
        confirmer.submit(com, &errs);
        assert_eq!(ledger.confirm_calls(), 0);
        assert!(matches!(
            drain(&mut errs_rx).as_slice(),
            [DarkmatchError::NotMatched { state: ComputationState::Nil, .. }]
        ));
    }

    #[test]
    fn ledger_read_failure_keeps_order_pending() {
        let (ledger, _storer, confirmer) = setup();
        let (errs, mut errs_rx) = ErrorSink::channel(16);
        confirmer.submit(matched(), &errs);
        ledger.mine(THRESHOLD);

        ledger.fail_reads(true);
        assert!(confirmer.check_finality(&errs).is_empty());
        assert_eq!(confirmer.pending(), (1, 1));
        assert_eq!(drain(&mut errs_rx).len(), 2);

        ledger.fail_reads(false);
        assert_eq!(confirmer.check_finality(&errs).len(), 1);
    }

    #[test]
    fn failed_confirmation_still_polls() {
        let (ledger, _storer, confirmer) = setup();
        let (errs, mut errs_rx) = ErrorSink::channel(16);
        let com = matched();
        ledger.fail_confirm(true);
        confirmer.submit(com.clone(), &errs);
        assert_eq!(drain(&mut errs_rx).len(), 1);
        assert_eq!(confirmer.pending(), (1, 1));

        // Another node gets the same pair onto the ledger.
        ledger.set_match(com.buy, com.sell, THRESHOLD);
        let out = confirmer.check_finality(&errs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, com.id);
    }

    #[tokio::test]
    async fn tasks_emit_and_close_on_cancel() {
        let (ledger, _storer, confirmer) = setup();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (matched_tx, matched_rx) = mpsc::channel(8);
        let (mut confirmed, mut errs) = confirmer.confirm_order_matches(cancel_rx, matched_rx);

        let com = matched();
        matched_tx.send(com.clone()).await.unwrap();
        while ledger.confirm_calls() == 0 {
            tokio::task::yield_now().await;
        }
        ledger.mine(THRESHOLD);

        let out = time::timeout(Duration::from_secs(5), confirmed.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.id, com.id);
        assert_eq!(out.state, ComputationState::Accepted);

        cancel_tx.send(true).unwrap();
        let closed = time::timeout(Duration::from_secs(5), confirmed.recv()).await.unwrap();
        assert!(closed.is_none());
        let closed = time::timeout(Duration::from_secs(5), errs.recv()).await.unwrap();
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn dropped_cancel_sender_stops_tasks() {
        let (_ledger, _storer, confirmer) = setup();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (_matched_tx, matched_rx) = mpsc::channel(8);
        let (mut confirmed, _errs) = confirmer.confirm_order_matches(cancel_rx, matched_rx);
        drop(cancel_tx);
        let closed = time::timeout(Duration::from_secs(5), confirmed.recv()).await.unwrap();
        assert!(closed.is_none());
    }

    /// Ledger whose depth queries block until [`GatedLedger::release`].
    struct GatedLedger {
        inner: MockLedger,
        open: Mutex<bool>,
        opened: parking_lot::Condvar,
        waiting: std::sync::atomic::AtomicUsize,
    }

    impl GatedLedger {
        fn new() -> Self {
            Self {
                inner: MockLedger::new(),
                open: Mutex::new(false),
                opened: parking_lot::Condvar::new(),
                waiting: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn release(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }
    }

    impl Ledger for GatedLedger {
        fn confirm_order(&self, buy: OrderId, sell: OrderId) -> Result<()> {
            self.inner.confirm_order(buy, sell)
        }
        fn depth(&self, order: OrderId) -> Result<u64> {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            let mut open = self.open.lock();
            while !*open {
                self.opened.wait(&mut open);
            }
            drop(open);
            self.inner.depth(order)
        }
        fn status(&self, order: OrderId) -> Result<LedgerStatus> {
            self.inner.status(order)
        }
        fn order_match(&self, order: OrderId) -> Result<OrderId> {
            self.inner.order_match(order)
        }
    }

    async fn eventually(check: impl Fn() -> bool) -> bool {
        time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn slow_ledger_does_not_stall_submissions() {
        let ledger = Arc::new(GatedLedger::new());
        let storer = Arc::new(MemoryStorer::new());
        let confirmer = Arc::new(Confirmer::new(ledger.clone(), storer, config()).unwrap());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (matched_tx, matched_rx) = mpsc::channel(8);
        let (mut confirmed, _errs) = confirmer.confirm_order_matches(cancel_rx, matched_rx);

        let first = matched();
        matched_tx.send(first.clone()).await.unwrap();
        let scan_blocked = eventually(|| ledger.waiting.load(Ordering::SeqCst) > 0).await;

        // The scan is parked inside a ledger query.
        let second = matched();
        matched_tx.send(second.clone()).await.unwrap();
        let submitted = eventually(|| ledger.inner.confirm_calls() == 2).await;
        let pending = confirmer.pending();

        ledger.inner.mine(THRESHOLD);
        ledger.release();
        assert!(scan_blocked);
        assert!(submitted);
        assert_eq!(pending, (2, 2));

        let mut out = Vec::new();
        for _ in 0..2 {
            let com = time::timeout(Duration::from_secs(5), confirmed.recv())
                .await
                .unwrap()
                .unwrap();
            out.push(com.id);
        }
        out.sort();
        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(out, expected);
        cancel_tx.send(true).unwrap();
    }

    #[tokio::test]
    async fn saturated_error_output_never_blocks() {
        let ledger = Arc::new(MockLedger::new());
        let storer = Arc::new(MemoryStorer::new());
        let config = ConfirmerConfig {
            error_buffer: 1,
            ..config()
        };
        let confirmer = Arc::new(Confirmer::new(ledger.clone(), storer, config).unwrap());
        ledger.fail_confirm(true);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (matched_tx, matched_rx) = mpsc::channel(8);
        let (_confirmed, _errs) = confirmer.confirm_order_matches(cancel_rx, matched_rx);
        for _ in 0..4 {
            matched_tx.send(matched()).await.unwrap();
        }
        time::timeout(Duration::from_secs(5), async {
            while confirmer.dropped_errors() < 3 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(ledger.confirm_calls(), 4);
        cancel_tx.send(true).unwrap();
    }
}
