//! Callback-driven resolution of computations.
//!
//! ```text
//! resolve(network, computation, callback)
//!     → issue(PriceExp) ──join──► smpc
//!                                  │ callback(join_id, [value])
//!     on_join ◄────────────────────┘
//!       pass + next stage  → issue(next)
//!       pass after Tokens  → record(Matched)
//!       fail               → record(Mismatched)
//! ```
//!
//! The state of every in-flight resolution lives in an explicit registry
//! keyed by computation ID; the join ID carries the stage marker, so each
//! reconstructed value is checked against the stage that is actually
//! waiting. Results that arrive for an unknown computation, or after the
//! matcher has been dropped, are discarded.

use std::{collections::HashMap, sync::Arc};

use darkmatch_types::{
    Computation, ComputationId, ComputationState, DarkmatchError, Join, JoinCallback, JoinId,
    NetworkId, OrderFragment, Result, Scalar, Smpcer, Storer,
};
use parking_lot::Mutex;

use crate::Stage;

/// Receives a computation once it has resolved to `Matched` or `Mismatched`.
pub type MatchCallback = Box<dyn FnOnce(Computation) + Send + 'static>;

struct Resolution {
    network: NetworkId,
    computation: Computation,
    buy: OrderFragment,
    sell: OrderFragment,
    stage: Stage,
    callback: MatchCallback,
}

enum Step {
    Issue(Stage),
    Finish(Resolution, bool),
}

struct Inner {
    storer: Arc<dyn Storer>,
    smpcer: Arc<dyn Smpcer>,
    pending: Mutex<HashMap<ComputationId, Resolution>>,
}

/// Resolves computations to `Matched` / `Mismatched` over secret shares.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<Inner>,
}

impl Matcher {
    pub fn new(storer: Arc<dyn Storer>, smpcer: Arc<dyn Smpcer>) -> Self {
        Self {
            inner: Arc::new(Inner {
                storer,
                smpcer,
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start resolving `computation` on `network`.
    ///
    /// Returns once the first stage has been submitted. `callback` runs
    /// exactly once if the computation reaches an outcome, after the outcome
    /// has been persisted (or failed to persist).
    ///
    /// # Errors
    /// - `AlreadyResolved` if the computation is not `Nil`
    /// - `ResolutionInProgress` if the same computation is already in flight
    /// - `FragmentNotFound` if either order's fragment is not held locally
    /// - any error from building or submitting the first join
    pub fn resolve(
        &self,
        network: NetworkId,
        computation: Computation,
        callback: impl FnOnce(Computation) + Send + 'static,
    ) -> Result<()> {
        let id = computation.id;
        if computation.state.is_resolved() {
            return Err(DarkmatchError::AlreadyResolved {
                id,
                state: computation.state,
            });
        }
        if self.inner.pending.lock().contains_key(&id) {
            return Err(DarkmatchError::ResolutionInProgress(id));
        }

        let buy = self.inner.storer.order_fragment(&computation.buy)?;
        let sell = self.inner.storer.order_fragment(&computation.sell)?;

        let cross_epoch = buy.epoch_depth != sell.epoch_depth;
        if cross_epoch {
            tracing::debug!(
                computation = %id,
                buy_depth = %buy.epoch_depth,
                sell_depth = %sell.epoch_depth,
                "Fragments from different epochs"
            );
        }

        {
            let mut pending = self.inner.pending.lock();
            if pending.contains_key(&id) {
                return Err(DarkmatchError::ResolutionInProgress(id));
            }
            pending.insert(
                id,
                Resolution {
                    network,
                    computation: computation.clone(),
                    buy,
                    sell,
                    stage: Stage::FIRST,
                    callback: Box::new(callback),
                },
            );
        }

        if cross_epoch {
            // Stays registered until the outcome is persisted.
            let outcome = self.inner.record(computation, false);
            let callback = self.inner.pending.lock().remove(&id).map(|res| res.callback);
            if let (Some(outcome), Some(callback)) = (outcome, callback) {
                callback(outcome);
            }
            return Ok(());
        }

        if let Err(err) = self.inner.issue(id) {
            self.inner.pending.lock().remove(&id);
            return Err(err);
        }
        Ok(())
    }

    /// Drop an in-flight resolution, e.g. after the caller's timeout fired.
    /// Its callback will never run. Returns whether anything was dropped.
    pub fn abandon(&self, id: &ComputationId) -> bool {
        let dropped = self.inner.pending.lock().remove(id).is_some();
        if dropped {
            tracing::warn!(computation = %id, "Resolution abandoned");
        }
        dropped
    }

    /// Number of resolutions waiting on a join.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Stage a computation is currently waiting on, if any.
    pub fn stage_of(&self, id: &ComputationId) -> Option<Stage> {
        self.inner.pending.lock().get(id).map(|r| r.stage)
    }
}

impl Inner {
    /// Submit the join for the stage the resolution is currently at.
    fn issue(self: &Arc<Self>, id: ComputationId) -> Result<()> {
        let (network, join) = {
            let pending = self.pending.lock();
            let Some(res) = pending.get(&id) else {
                return Ok(());
            };
            let share = res.stage.difference(&res.buy, &res.sell)?;
            let join = Join {
                id: JoinId::new(id, res.stage.marker()),
                index: share.index,
                values: vec![share.value],
            };
            (res.network, join)
        };

        let weak = Arc::downgrade(self);
        let callback: JoinCallback = Box::new(move |join_id, values| {
            if let Some(inner) = weak.upgrade() {
                inner.on_join(join_id, &values);
            } else {
                tracing::debug!(join = %join_id, "Matcher dropped, discarding join result");
            }
        });
        self.smpcer.join(network, join, callback)
    }

    fn on_join(self: &Arc<Self>, join_id: JoinId, values: &[Scalar]) {
        let Some(stage) = Stage::from_marker(join_id.marker) else {
            tracing::error!(error = %DarkmatchError::UnexpectedJoin(join_id), "Unknown stage marker");
            return;
        };
        let id = join_id.computation;

        let step = {
            let mut pending = self.pending.lock();
            let Some(res) = pending.get_mut(&id) else {
                tracing::debug!(computation = %id, %stage, "No resolution waiting, discarding");
                return;
            };
            if res.stage != stage {
                tracing::error!(
                    error = %DarkmatchError::UnexpectedJoin(join_id),
                    expected = %res.stage,
                    "Join for a stage that is not waiting"
                );
                return;
            }
            let [value] = values else {
                tracing::error!(
                    error = %DarkmatchError::MalformedJoin {
                        id: join_id,
                        expected: 1,
                        actual: values.len(),
                    },
                    "Malformed join result, resolution stalled"
                );
                return;
            };

            match (stage.passes(*value), stage.next()) {
                (true, Some(next)) => {
                    res.stage = next;
                    Step::Issue(next)
                }
                (passed, _) => match pending.remove(&id) {
                    Some(res) => Step::Finish(res, passed),
                    None => return,
                },
            }
        };

        match step {
            Step::Issue(next) => {
                tracing::debug!(computation = %id, from = %stage, to = %next, "Stage passed");
                if let Err(err) = self.issue(id) {
                    self.pending.lock().remove(&id);
                    tracing::error!(computation = %id, stage = %next, error = %err, "Failed to issue stage");
                }
            }
            Step::Finish(res, matched) => {
                if !matched {
                    tracing::debug!(computation = %id, %stage, "Stage failed");
                }
                if let Some(outcome) = self.record(res.computation, matched) {
                    (res.callback)(outcome);
                }
            }
        }
    }

    /// Move `computation` to its outcome and persist it. `None` if the
    /// outcome cannot be recorded at all.
    fn record(&self, mut computation: Computation, matched: bool) -> Option<Computation> {
        let state = if matched {
            ComputationState::Matched
        } else {
            ComputationState::Mismatched
        };
        if let Err(err) = computation.transition(state) {
            tracing::error!(computation = %computation.id, error = %err, "Cannot record outcome");
            return None;
        }
        if let Err(err) = self.storer.put_computation(&computation) {
            tracing::error!(
                computation = %computation.id,
                error = %err,
                "Failed to persist resolved computation"
            );
        }
        if matched {
            tracing::info!(
                computation = %computation.id,
                buy = %computation.buy.short(),
                sell = %computation.sell.short(),
                "Computation matched"
            );
        } else {
            tracing::debug!(computation = %computation.id, "Computation mismatched");
        }
        Some(computation)
    }
}
