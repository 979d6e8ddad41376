//! The per-node engine.
//!
//! On every compute tick the engine drains a batch from the ranker and
//! resolves each computation. A resolution that does not finish within
//! `engine.resolve_timeout` is abandoned and reported. Matches go to the
//! confirmer; confirmed matches take their orders out of the ranker and are
//! settled.
//!
//! Errors from any stage that has no caller to return to end up on the
//! engine's error output ([`Engine::take_errors`]).

use std::sync::Arc;

use darkmatch_matchcore::Matcher;
use darkmatch_ranker::Ranker;
use darkmatch_settlement::{Confirmer, ErrorSink, Settler};
use darkmatch_types::{
    Computation, ComputationId, ComputationState, DarkmatchError, Epoch, Ledger, NetworkId,
    NodeConfig, OrderFragment, OrderId, PriorityOrder, Result, Settlement, Smpcer, Storer,
    constants,
};
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{self, MissedTickBehavior},
};

pub struct Engine {
    config: NodeConfig,
    epoch: Epoch,
    storer: Arc<dyn Storer>,
    ranker: Ranker,
    matcher: Matcher,
    confirmer: Arc<Confirmer>,
    settler: Settler,
    errors: ErrorSink,
    errors_rx: Mutex<Option<mpsc::Receiver<DarkmatchError>>>,
    matched_tx: mpsc::Sender<Computation>,
    /// Taken by [`Engine::run`]; `None` once running.
    matched_rx: Mutex<Option<mpsc::Receiver<Computation>>>,
}

impl Engine {
    /// Build the pipeline for `epoch` around the given collaborators.
    ///
    /// # Errors
    /// [`DarkmatchError::Configuration`] if `config` is invalid.
    pub fn new(
        config: NodeConfig,
        epoch: Epoch,
        storer: Arc<dyn Storer>,
        smpcer: Arc<dyn Smpcer>,
        ledger: Arc<dyn Ledger>,
        contract: Arc<dyn Settlement>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let ranker = Ranker::new(config.ranker, epoch)?;
        let matcher = Matcher::new(storer.clone(), smpcer.clone());
        let confirmer = Arc::new(Confirmer::new(ledger, storer.clone(), config.confirmer)?);
        let (errors, errors_rx) = ErrorSink::channel(config.engine.error_buffer);
        let settler = Settler::new(storer.clone(), smpcer, contract, errors.clone());
        let (matched_tx, matched_rx) = mpsc::channel(config.engine.matched_buffer);

        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            epoch = %epoch.hash,
            num_rankers = config.ranker.num_rankers,
            pos = config.ranker.pos,
            "Engine created"
        );

        Ok(Arc::new(Self {
            config,
            epoch,
            storer,
            ranker,
            matcher,
            confirmer,
            settler,
            errors,
            errors_rx: Mutex::new(Some(errors_rx)),
            matched_tx,
            matched_rx: Mutex::new(Some(matched_rx)),
        }))
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    #[must_use]
    pub fn confirmer(&self) -> &Arc<Confirmer> {
        &self.confirmer
    }

    /// The error output. Only the first call returns it.
    pub fn take_errors(&self) -> Option<mpsc::Receiver<DarkmatchError>> {
        self.errors_rx.lock().take()
    }

    /// Errors dropped because the error output was full.
    #[must_use]
    pub fn dropped_errors(&self) -> u64 {
        self.errors.dropped()
    }

    /// Keep this node's fragment of an order and rank it.
    pub fn open_order(&self, fragment: OrderFragment, priority: u64) -> Result<()> {
        self.storer.put_order_fragment(&fragment)?;
        self.ranker
            .insert(fragment.parity, PriorityOrder::new(fragment.order_id, priority));
        tracing::debug!(order = %fragment.order_id.short(), parity = %fragment.parity, priority, "Order opened");
        Ok(())
    }

    /// Stop matching `orders` and drop their fragments.
    pub fn close_orders(&self, orders: &[OrderId]) -> Result<()> {
        self.ranker.remove(orders);
        for id in orders {
            self.storer.delete_order_fragment(id)?;
        }
        tracing::debug!(orders = orders.len(), "Orders closed");
        Ok(())
    }

    /// Pick up work left in storage by a previous run: `Matched`
    /// computations go back to the confirmer and `Accepted` ones are
    /// settled again, unless the contract already settled them. Returns how
    /// many were picked up.
    pub fn recover(self: &Arc<Self>) -> Result<usize> {
        let mut matched = Vec::new();
        let mut settling = 0usize;
        for com in self.storer.computations()? {
            match com.state {
                ComputationState::Matched => matched.push(com),
                ComputationState::Accepted => {
                    if self.settle(&com) {
                        settling += 1;
                    }
                }
                _ => {}
            }
        }

        let recovered = settling + matched.len();
        if !matched.is_empty() {
            let tx = self.matched_tx.clone();
            tokio::spawn(async move {
                for com in matched {
                    if tx.send(com).await.is_err() {
                        break;
                    }
                }
            });
        }
        tracing::info!(recovered, settling, "Recovered stored computations");
        Ok(recovered)
    }

    /// Drive the pipeline until `cancel` is set.
    ///
    /// # Errors
    /// [`DarkmatchError::Internal`] if the engine is already running.
    pub async fn run(self: Arc<Self>, mut cancel: watch::Receiver<bool>) -> Result<()> {
        let matched_rx = self
            .matched_rx
            .lock()
            .take()
            .ok_or_else(|| DarkmatchError::Internal("engine is already running".into()))?;
        let (mut confirmed, mut confirm_errors) =
            self.confirmer.confirm_order_matches(cancel.clone(), matched_rx);

        let mut ticker = time::interval(self.config.engine.compute_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(epoch = %self.epoch.hash, "Engine running");
        loop {
            tokio::select! {
                biased;
                () = cancelled(&mut cancel) => break,
                Some(com) = confirmed.recv() => self.on_confirmed(&com),
                Some(err) = confirm_errors.recv() => self.errors.report(err),
                _ = ticker.tick() => self.compute(),
            }
        }
        tracing::info!("Engine stopped");
        Ok(())
    }

    fn compute(self: &Arc<Self>) {
        let batch = self.ranker.computations(self.config.engine.compute_batch_size);
        if batch.is_empty() {
            return;
        }
        tracing::debug!(count = batch.len(), backlog = self.ranker.len(), "Resolving batch");
        for com in batch {
            self.resolve(com);
        }
    }

    fn resolve(self: &Arc<Self>, com: Computation) {
        match self.storer.computation(&com.id) {
            Ok(stored) if stored.state.is_resolved() => {
                tracing::debug!(computation = %com.id, state = %stored.state, "Already resolved");
                return;
            }
            Ok(_) | Err(DarkmatchError::ComputationNotFound(_)) => {}
            Err(err) => {
                self.errors.report(err);
                return;
            }
        }

        let id = com.id;
        let (tx, rx) = oneshot::channel();
        let network = NetworkId::from(com.epoch);
        if let Err(err) = self.matcher.resolve(network, com, move |resolved| {
            let _ = tx.send(resolved);
        }) {
            if matches!(err, DarkmatchError::ResolutionInProgress(_)) {
                tracing::debug!(computation = %id, "Resolution already in flight");
            } else {
                tracing::warn!(computation = %id, error = %err, "Cannot resolve computation");
                self.errors.report(err);
            }
            return;
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.await_resolution(id, rx).await });
    }

    async fn await_resolution(
        &self,
        id: ComputationId,
        rx: oneshot::Receiver<Computation>,
    ) {
        match time::timeout(self.config.engine.resolve_timeout, rx).await {
            Ok(Ok(com)) if com.state == ComputationState::Matched => {
                if self.matched_tx.send(com).await.is_err() {
                    tracing::debug!(computation = %id, "Confirmer stopped, match not forwarded");
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) => {
                tracing::warn!(computation = %id, "Resolution aborted");
                self.errors.report(DarkmatchError::ResolutionAborted(id));
            }
            Err(_) => {
                self.matcher.abandon(&id);
                tracing::warn!(computation = %id, "Resolution timed out");
                self.errors.report(DarkmatchError::ResolutionTimedOut(id));
            }
        }
    }

    fn on_confirmed(&self, com: &Computation) {
        self.ranker.remove(&[com.buy, com.sell]);
        self.settle(com);
    }

    /// Whether a settlement join was issued for `com`.
    fn settle(&self, com: &Computation) -> bool {
        match self.settler.settle(com) {
            Ok(()) => true,
            Err(DarkmatchError::AlreadySettled(id)) => {
                tracing::debug!(computation = %id, "Already settled");
                false
            }
            Err(err) => {
                tracing::warn!(computation = %com.id, error = %err, "Cannot settle computation");
                self.errors.report(err);
                false
            }
        }
    }
}

/// Resolves once `cancel` is set or its sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use darkmatch_types::{
        testing::{MockLedger, MockSettlement, MockSmpcer},
        *,
    };

    use super::*;

    fn epoch() -> Epoch {
        Epoch::new(EpochHash([6; 32]), EpochDepth::CURRENT)
    }

    fn engine_with(config: NodeConfig, storer: Arc<MemoryStorer>) -> Result<Arc<Engine>> {
        Engine::new(
            config,
            epoch(),
            storer,
            Arc::new(MockSmpcer::passthrough()),
            Arc::new(MockLedger::new()),
            Arc::new(MockSettlement::new()),
        )
    }

    fn fragment(parity: OrderParity) -> OrderFragment {
        let order = Order::dummy(parity, CoExp::new(1, 1), CoExp::new(1, 1));
        OrderFragment::unshared(&order, 1, EpochDepth::CURRENT)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = NodeConfig::default();
        config.ranker.pos = 3;
        assert!(matches!(
            engine_with(config, Arc::new(MemoryStorer::new())),
            Err(DarkmatchError::Configuration(_))
        ));
    }

    #[test]
    fn open_and_close_orders() {
        let storer = Arc::new(MemoryStorer::new());
        let engine = engine_with(NodeConfig::default(), storer.clone()).unwrap();
        let buy = fragment(OrderParity::Buy);
        let sell = fragment(OrderParity::Sell);
        engine.open_order(buy.clone(), 1).unwrap();
        engine.open_order(sell.clone(), 2).unwrap();
        assert_eq!(engine.ranker().open_orders(), (1, 1));
        assert_eq!(engine.ranker().len(), 1);
        assert_eq!(storer.order_fragment(&buy.order_id).unwrap(), buy);

        engine.close_orders(&[buy.order_id]).unwrap();
        assert_eq!(engine.ranker().open_orders(), (0, 1));
        assert!(engine.ranker().is_empty());
        assert!(storer.order_fragment(&buy.order_id).is_err());
    }

    #[test]
    fn errors_are_taken_once() {
        let engine = engine_with(NodeConfig::default(), Arc::new(MemoryStorer::new())).unwrap();
        assert!(engine.take_errors().is_some());
        assert!(engine.take_errors().is_none());
    }

    #[tokio::test]
    async fn second_run_is_rejected() {
        let engine = engine_with(NodeConfig::default(), Arc::new(MemoryStorer::new())).unwrap();
        // Already cancelled: the first run returns as soon as it starts.
        let (_cancel_tx, cancel_rx) = watch::channel(true);
        engine.clone().run(cancel_rx.clone()).await.unwrap();
        assert!(matches!(
            engine.clone().run(cancel_rx).await,
            Err(DarkmatchError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn recover_resettles_accepted_computations() {
        let storer = Arc::new(MemoryStorer::new());
        let contract = Arc::new(MockSettlement::new());
        let engine = Engine::new(
            NodeConfig::default(),
            epoch(),
            storer.clone(),
            Arc::new(MockSmpcer::passthrough()),
            Arc::new(MockLedger::new()),
            contract.clone(),
        )
        .unwrap();

        let buy = fragment(OrderParity::Buy);
        let sell = fragment(OrderParity::Sell);
        storer.put_order_fragment(&buy).unwrap();
        storer.put_order_fragment(&sell).unwrap();
        let mut accepted = Computation::new(buy.order_id, sell.order_id, epoch());
        accepted.transition(ComputationState::Matched).unwrap();
        accepted.transition(ComputationState::Accepted).unwrap();
        storer.put_computation(&accepted).unwrap();

        let mut matched = Computation::new(OrderId::random(), OrderId::random(), epoch());
        matched.transition(ComputationState::Matched).unwrap();
        storer.put_computation(&matched).unwrap();

        let mut mismatched = Computation::new(OrderId::random(), OrderId::random(), epoch());
        mismatched.transition(ComputationState::Mismatched).unwrap();
        storer.put_computation(&mismatched).unwrap();

        assert_eq!(engine.recover().unwrap(), 2);
        assert_eq!(contract.calls(), 1);
        assert_eq!(
            storer.computation(&accepted.id).unwrap().state,
            ComputationState::Settled
        );

        // The matched one was queued for the confirmer.
        tokio::task::yield_now().await;
        let mut queued = engine.matched_rx.lock().take().unwrap();
        assert_eq!(queued.try_recv().unwrap().id, matched.id);
    }

    #[tokio::test]
    async fn recover_records_pairs_the_contract_already_settled() {
        let storer = Arc::new(MemoryStorer::new());
        let smpc = Arc::new(MockSmpcer::passthrough());
        let contract = Arc::new(MockSettlement::new());
        let engine = Engine::new(
            NodeConfig::default(),
            epoch(),
            storer.clone(),
            smpc.clone(),
            Arc::new(MockLedger::new()),
            contract.clone(),
        )
        .unwrap();
        let mut errors = engine.take_errors().unwrap();

        let buy = Order::dummy(OrderParity::Buy, CoExp::new(1, 1), CoExp::new(1, 1));
        let sell = Order::dummy(OrderParity::Sell, CoExp::new(1, 1), CoExp::new(1, 1));
        contract.settle(&buy, &sell).unwrap();

        // Settled on the contract, but the `Settled` write never landed.
        let mut stale = Computation::new(buy.id, sell.id, epoch());
        stale.transition(ComputationState::Matched).unwrap();
        stale.transition(ComputationState::Accepted).unwrap();
        storer.put_computation(&stale).unwrap();

        assert_eq!(engine.recover().unwrap(), 0);
        assert_eq!(contract.calls(), 1);
        assert_eq!(smpc.calls(), 0);
        assert_eq!(
            storer.computation(&stale.id).unwrap().state,
            ComputationState::Settled
        );
        assert!(errors.try_recv().is_err());
    }
}
