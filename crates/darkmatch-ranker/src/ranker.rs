//! The ranker: sharded pairing of buy and sell orders.
//!
//! Each insert pairs the new order with every open order on the opposite
//! side. A pair is kept only when its combined priority falls in this
//! node's shard, and is then placed in the backlog by combined priority.
//! Opposite orders are visited in ascending id order, so pairs of equal
//! priority created by one insert are backlogged in that order.
//!
//! All state sits behind one mutex; every public operation is atomic with
//! respect to the others. None of them fail: inserting an order twice or
//! removing an unknown order is a no-op.

use std::collections::{BTreeMap, HashSet};

use darkmatch_types::{
    Computation, Epoch, OrderId, OrderParity, Priority, PriorityOrder, RankerConfig, Result,
};
use parking_lot::Mutex;

use crate::Backlog;

#[derive(Debug, Default)]
struct RankerState {
    buys: BTreeMap<OrderId, Priority>,
    sells: BTreeMap<OrderId, Priority>,
    backlog: Backlog,
}

/// Produces prioritised [`Computation`]s for one shard of one epoch.
#[derive(Debug)]
pub struct Ranker {
    num_rankers: u64,
    pos: u64,
    epoch: Epoch,
    state: Mutex<RankerState>,
}

impl Ranker {
    /// Create a ranker at shard `config.pos` of `config.num_rankers`.
    ///
    /// # Errors
    /// [`darkmatch_types::DarkmatchError::Configuration`] if there are no
    /// rankers or `pos` is out of range.
    pub fn new(config: RankerConfig, epoch: Epoch) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            num_rankers: config.num_rankers,
            pos: config.pos,
            epoch,
            state: Mutex::new(RankerState::default()),
        })
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether the pair with these priorities belongs to this shard.
    #[must_use]
    pub fn owns(&self, buy: Priority, sell: Priority) -> bool {
        combined(buy, sell) % u128::from(self.num_rankers) == u128::from(self.pos)
    }

    pub fn insert_buy(&self, order: PriorityOrder) {
        self.insert(OrderParity::Buy, order);
    }

    pub fn insert_sell(&self, order: PriorityOrder) {
        self.insert(OrderParity::Sell, order);
    }

    /// Insert by parity.
    pub fn insert(&self, parity: OrderParity, order: PriorityOrder) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let (own, opposite) = match parity {
            OrderParity::Buy => (&mut state.buys, &state.sells),
            OrderParity::Sell => (&mut state.sells, &state.buys),
        };
        if own.contains_key(&order.id) {
            tracing::debug!(order = %order.id.short(), %parity, "Order already ranked");
            return;
        }
        own.insert(order.id, order.priority);

        let mut added = 0usize;
        for (other, other_priority) in opposite {
            let (buy, buy_priority, sell, sell_priority) = match parity {
                OrderParity::Buy => (order.id, order.priority, *other, *other_priority),
                OrderParity::Sell => (*other, *other_priority, order.id, order.priority),
            };
            if !self.owns(buy_priority, sell_priority) {
                continue;
            }
            state.backlog.insert(
                combined(buy_priority, sell_priority),
                Computation::new(buy, sell, self.epoch),
            );
            added += 1;
        }

        tracing::debug!(
            order = %order.id.short(),
            %parity,
            priority = %order.priority,
            added,
            backlog = state.backlog.len(),
            "Order ranked"
        );
    }

    /// Forget `orders` on both sides and purge every backlog entry that
    /// references any of them.
    pub fn remove(&self, orders: &[OrderId]) {
        if orders.is_empty() {
            return;
        }
        let ids: HashSet<OrderId> = orders.iter().copied().collect();
        let mut state = self.state.lock();
        for id in &ids {
            state.buys.remove(id);
            state.sells.remove(id);
        }
        let purged = state.backlog.purge(&ids);
        tracing::debug!(orders = ids.len(), purged, "Orders removed from ranker");
    }

    /// Drain up to `max` computations, highest priority first. Drained
    /// computations are gone from the backlog.
    pub fn computations(&self, max: usize) -> Vec<Computation> {
        self.state.lock().backlog.drain_front(max)
    }

    /// Number of computations waiting in the backlog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of open orders known on each side, `(buys, sells)`.
    #[must_use]
    pub fn open_orders(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.buys.len(), state.sells.len())
    }
}

fn combined(buy: Priority, sell: Priority) -> u128 {
    u128::from(buy.0) + u128::from(sell.0)
}

#[cfg(test)]
mod tests {
    use darkmatch_types::*;
    use rand::Rng;

    use super::*;

    fn epoch() -> Epoch {
        Epoch::new(EpochHash([7; 32]), EpochDepth::CURRENT)
    }

    fn ranker(num_rankers: u64, pos: u64) -> Ranker {
        Ranker::new(RankerConfig { num_rankers, pos }, epoch()).unwrap()
    }

    #[test]
    fn rejects_bad_shard() {
        assert!(Ranker::new(RankerConfig { num_rankers: 0, pos: 0 }, epoch()).is_err());
        assert!(Ranker::new(RankerConfig { num_rankers: 3, pos: 3 }, epoch()).is_err());
    }

    #[test]
    fn pair_outside_shard_yields_nothing() {
        // 5 + 5 = 10, 10 mod 5 = 0 != 4
        let ranker = ranker(5, 4);
        ranker.insert_sell(PriorityOrder::new(OrderId::random(), 5));
        ranker.insert_buy(PriorityOrder::new(OrderId::random(), 5));
        assert!(ranker.computations(10).is_empty());
    }

    #[test]
    fn pair_inside_shard_yields_one() {
        // 5 + 4 = 9, 9 mod 5 = 4
        let ranker = ranker(5, 4);
        let sell = OrderId::random();
        let buy = OrderId::random();
        ranker.insert_sell(PriorityOrder::new(sell, 5));
        ranker.insert_buy(PriorityOrder::new(buy, 4));

        let coms = ranker.computations(10);
        assert_eq!(coms.len(), 1);
        assert_eq!(coms[0].buy, buy);
        assert_eq!(coms[0].sell, sell);
        assert_eq!(coms[0].epoch, epoch().hash);
        assert_eq!(coms[0].state, ComputationState::Nil);
    }

    #[test]
    fn sharding_law_holds_for_random_priorities() {
        let mut rng = rand::thread_rng();
        let (n, pos) = (7u64, 3u64);
        let ranker = ranker(n, pos);
        let buys: Vec<(OrderId, u64)> = (0..20)
            .map(|_| (OrderId::random(), rng.gen_range(0..1_000)))
            .collect();
        let sells: Vec<(OrderId, u64)> = (0..20)
            .map(|_| (OrderId::random(), rng.gen_range(0..1_000)))
            .collect();
        for (id, p) in &buys {
            ranker.insert_buy(PriorityOrder::new(*id, *p));
        }
        for (id, p) in &sells {
            ranker.insert_sell(PriorityOrder::new(*id, *p));
        }

        let expected: HashSet<(OrderId, OrderId)> = buys
            .iter()
            .flat_map(|(b, bp)| sells.iter().map(move |(s, sp)| ((*b, *bp), (*s, *sp))))
            .filter(|((_, bp), (_, sp))| (bp + sp) % n == pos)
            .map(|((b, _), (s, _))| (b, s))
            .collect();

        let got: HashSet<(OrderId, OrderId)> = ranker
            .computations(usize::MAX)
            .into_iter()
            .map(|c| (c.buy, c.sell))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn computations_come_out_by_ascending_priority() {
        let ranker = ranker(1, 0);
        let buy = OrderId::random();
        ranker.insert_buy(PriorityOrder::new(buy, 10));
        let s30 = OrderId::random();
        let s1 = OrderId::random();
        let s5 = OrderId::random();
        ranker.insert_sell(PriorityOrder::new(s30, 30));
        ranker.insert_sell(PriorityOrder::new(s1, 1));
        ranker.insert_sell(PriorityOrder::new(s5, 5));

        let sells: Vec<OrderId> = ranker.computations(10).into_iter().map(|c| c.sell).collect();
        assert_eq!(sells, vec![s1, s5, s30]);
    }

    #[test]
    fn equal_priority_pairs_drain_in_id_order() {
        let ranker = ranker(1, 0);
        let mut sells: Vec<OrderId> = (0..16).map(|_| OrderId::random()).collect();
        for sell in &sells {
            ranker.insert_sell(PriorityOrder::new(*sell, 7));
        }
        ranker.insert_buy(PriorityOrder::new(OrderId::random(), 7));

        sells.sort();
        let drained: Vec<OrderId> = ranker.computations(usize::MAX).into_iter().map(|c| c.sell).collect();
        assert_eq!(drained, sells);
    }

    #[test]
    fn drain_does_not_duplicate() {
        let ranker = ranker(1, 0);
        ranker.insert_buy(PriorityOrder::new(OrderId::random(), 1));
        for p in 0..5 {
            ranker.insert_sell(PriorityOrder::new(OrderId::random(), p));
        }
        let first = ranker.computations(3);
        let second = ranker.computations(3);
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
        assert!(first.iter().all(|a| second.iter().all(|b| a.id != b.id)));
        assert!(ranker.is_empty());
    }

    #[test]
    fn remove_purges_both_sides() {
        let ranker = ranker(1, 0);
        let b1 = OrderId::random();
        let b2 = OrderId::random();
        let s1 = OrderId::random();
        let s2 = OrderId::random();
        ranker.insert_buy(PriorityOrder::new(b1, 1));
        ranker.insert_buy(PriorityOrder::new(b2, 2));
        ranker.insert_sell(PriorityOrder::new(s1, 1));
        ranker.insert_sell(PriorityOrder::new(s2, 2));
        assert_eq!(ranker.len(), 4);

        ranker.remove(&[b1, s2]);
        let coms = ranker.computations(10);
        assert_eq!(coms.len(), 1);
        assert_eq!((coms[0].buy, coms[0].sell), (b2, s1));
        assert_eq!(ranker.open_orders(), (1, 1));

        // Removed orders no longer pair with new arrivals.
        ranker.insert_sell(PriorityOrder::new(OrderId::random(), 3));
        assert!(ranker.computations(10).iter().all(|c| c.buy != b1));
    }

    #[test]
    fn remove_unknown_is_noop() {
        let ranker = ranker(1, 0);
        ranker.insert_buy(PriorityOrder::new(OrderId::random(), 1));
        ranker.insert_sell(PriorityOrder::new(OrderId::random(), 1));
        ranker.remove(&[OrderId::random()]);
        ranker.remove(&[]);
        assert_eq!(ranker.len(), 1);
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let ranker = ranker(1, 0);
        let buy = PriorityOrder::new(OrderId::random(), 1);
        ranker.insert_sell(PriorityOrder::new(OrderId::random(), 1));
        ranker.insert_buy(buy);
        ranker.insert_buy(buy);
        assert_eq!(ranker.len(), 1);
    }

    #[test]
    fn huge_priorities_do_not_overflow() {
        let ranker = ranker(2, 0);
        ranker.insert_buy(PriorityOrder::new(OrderId::random(), u64::MAX));
        ranker.insert_sell(PriorityOrder::new(OrderId::random(), u64::MAX));
        // 2 * (2^64 - 1) is even
        assert_eq!(ranker.len(), 1);
    }

    #[test]
    fn concurrent_inserts_are_atomic() {
        use std::sync::Arc;

        let ranker = Arc::new(ranker(1, 0));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ranker = ranker.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let order = PriorityOrder::new(OrderId::random(), t * 100 + i);
                        if t % 2 == 0 {
                            ranker.insert_buy(order);
                        } else {
                            ranker.insert_sell(order);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 50 buys x 50 sells, single shard owns everything.
        assert_eq!(ranker.open_orders(), (50, 50));
        assert_eq!(ranker.len(), 2_500);
    }
}
