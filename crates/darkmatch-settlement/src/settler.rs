//! Settlement of accepted computations.
//!
//! One join reconstructs both orders. Values are submitted and returned in
//! this fixed order, buy side first:
//!
//! | Position | Field                      |
//! |----------|----------------------------|
//! | 0        | tokens                     |
//! | 1, 2     | price (co, exp)            |
//! | 3, 4     | volume (co, exp)           |
//! | 5, 6     | minimum volume (co, exp)   |
//! | 7        | nonce                      |
//!
//! and positions 8..16 repeat the layout for the sell side.
//!
//! `settle` returns as soon as the join is submitted. The outcome is visible
//! through the storer (`Settled`), and failures after that point go to the
//! error output. Before issuing anything the contract is asked whether the
//! pair is already settled, so a stored `Accepted` computation whose
//! `Settled` write was lost is repaired instead of settled twice.

use std::sync::Arc;

use darkmatch_types::{
    CoExp, Computation, ComputationId, ComputationState, DarkmatchError, Join, JoinCallback,
    JoinId, NetworkId, Order, OrderFragment, Result, Scalar, Settlement, Share, Smpcer, Storer,
    constants,
};
use parking_lot::Mutex;

use crate::{ErrorSink, IdempotencyGuard};

struct Inner {
    storer: Arc<dyn Storer>,
    smpcer: Arc<dyn Smpcer>,
    contract: Arc<dyn Settlement>,
    errors: ErrorSink,
    /// Computations with a settlement in flight or completed.
    guard: Mutex<IdempotencyGuard<ComputationId>>,
}

/// Reconstructs and settles accepted computations exactly once.
#[derive(Clone)]
pub struct Settler {
    inner: Arc<Inner>,
}

impl Settler {
    pub fn new(
        storer: Arc<dyn Storer>,
        smpcer: Arc<dyn Smpcer>,
        contract: Arc<dyn Settlement>,
        errors: ErrorSink,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storer,
                smpcer,
                contract,
                errors,
                guard: Mutex::new(IdempotencyGuard::new(
                    constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE,
                )),
            }),
        }
    }

    /// Submit the reconstruction join for `com`.
    ///
    /// # Errors
    /// - `AlreadySettled` if `com` is settled, a settlement is in flight, or
    ///   the contract already settled the pair (`com` is then stored as
    ///   `Settled`)
    /// - `InvalidStateTransition` if `com` is not `Accepted`
    /// - `FragmentNotFound` if either fragment is missing
    /// - any error from building or submitting the join
    pub fn settle(&self, com: &Computation) -> Result<()> {
        match com.state {
            ComputationState::Accepted => {}
            ComputationState::Settled => return Err(DarkmatchError::AlreadySettled(com.id)),
            from => {
                return Err(DarkmatchError::InvalidStateTransition {
                    id: com.id,
                    from,
                    to: ComputationState::Settled,
                });
            }
        }
        if !self.inner.guard.lock().mark(com.id) {
            return Err(DarkmatchError::AlreadySettled(com.id));
        }

        let issued = match self.inner.contract.is_settled(com.buy, com.sell) {
            Ok(false) => self.inner.issue(com),
            Ok(true) => {
                tracing::info!(computation = %com.id, "Pair already settled, recording it");
                self.inner
                    .persist_settled(com.clone())
                    .and(Err(DarkmatchError::AlreadySettled(com.id)))
            }
            Err(err) => Err(err),
        };
        if matches!(&issued, Err(err) if !matches!(err, DarkmatchError::AlreadySettled(_))) {
            self.inner.guard.lock().release(&com.id);
        }
        issued
    }

    /// Whether a settlement of `id` is in flight or done.
    #[must_use]
    pub fn is_settling(&self, id: &ComputationId) -> bool {
        self.inner.guard.lock().contains(id)
    }
}

impl Inner {
    fn issue(self: &Arc<Self>, com: &Computation) -> Result<()> {
        let buy = self.storer.order_fragment(&com.buy)?;
        let sell = self.storer.order_fragment(&com.sell)?;

        let shares: Vec<Share> = secret_shares(&buy)
            .into_iter()
            .chain(secret_shares(&sell))
            .collect();
        let join = Join::from_shares(
            JoinId::new(com.id, constants::SETTLEMENT_JOIN_MARKER),
            &shares,
        )?;

        let weak = Arc::downgrade(self);
        let com_for_callback = com.clone();
        let callback: JoinCallback = Box::new(move |join_id, values| {
            if let Some(inner) = weak.upgrade() {
                inner.on_join(com_for_callback, &buy, &sell, join_id, &values);
            } else {
                tracing::debug!(join = %join_id, "Settler dropped, discarding join result");
            }
        });

        tracing::debug!(computation = %com.id, "Settlement join submitted");
        self.smpcer.join(NetworkId::from(com.epoch), join, callback)
    }

    fn on_join(
        &self,
        com: Computation,
        buy: &OrderFragment,
        sell: &OrderFragment,
        join_id: JoinId,
        values: &[Scalar],
    ) {
        let orders = match values.split_at_checked(constants::VALUES_PER_ORDER) {
            Some((b, s)) if values.len() == constants::SETTLEMENT_JOIN_VALUES => {
                reconstruct(buy, b).zip(reconstruct(sell, s))
            }
            _ => None,
        };
        let Some((buy_order, sell_order)) = orders else {
            let err = DarkmatchError::MalformedJoin {
                id: join_id,
                expected: constants::SETTLEMENT_JOIN_VALUES,
                actual: values.len(),
            };
            tracing::error!(error = %err, computation = %com.id, "Malformed settlement join, settlement abandoned");
            self.guard.lock().release(&com.id);
            self.errors.report(err);
            return;
        };

        if let Err(err) = self.contract.settle(&buy_order, &sell_order) {
            tracing::error!(computation = %com.id, error = %err, "Settlement contract failed");
            self.guard.lock().release(&com.id);
            self.errors.report(err);
            return;
        }

        // A retried `settle` finds the pair settled on the contract and only
        // rewrites the record.
        let id = com.id;
        let (buy, sell) = (com.buy, com.sell);
        if let Err(err) = self.persist_settled(com) {
            tracing::error!(computation = %id, error = %err, "Failed to persist settled computation");
            self.guard.lock().release(&id);
            self.errors.report(err);
            return;
        }
        tracing::info!(
            computation = %id,
            buy = %buy.short(),
            sell = %sell.short(),
            "Computation settled"
        );
    }

    fn persist_settled(&self, mut com: Computation) -> Result<()> {
        com.transition(ComputationState::Settled)?;
        self.storer.put_computation(&com)
    }
}

/// A fragment's secret shares in settlement order.
fn secret_shares(fragment: &OrderFragment) -> [Share; constants::VALUES_PER_ORDER] {
    [
        fragment.tokens,
        fragment.price.co,
        fragment.price.exp,
        fragment.volume.co,
        fragment.volume.exp,
        fragment.minimum_volume.co,
        fragment.minimum_volume.exp,
        fragment.nonce,
    ]
}

/// Rebuild the plaintext order from its public metadata and eight
/// reconstructed values.
fn reconstruct(fragment: &OrderFragment, values: &[Scalar]) -> Option<Order> {
    let [tokens, price_co, price_exp, volume_co, volume_exp, min_co, min_exp, nonce] = values
    else {
        return None;
    };
    Some(Order {
        id: fragment.order_id,
        parity: fragment.parity,
        order_type: fragment.order_type,
        expiry: fragment.expiry,
        tokens: tokens.value(),
        price: CoExp::new(price_co.value(), price_exp.value()),
        volume: CoExp::new(volume_co.value(), volume_exp.value()),
        minimum_volume: CoExp::new(min_co.value(), min_exp.value()),
        nonce: nonce.value(),
    })
}
