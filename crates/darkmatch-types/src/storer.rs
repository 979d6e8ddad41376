//! Persistence interface for computations and order fragments.
//!
//! Provides an abstraction that can be backed by memory, a local database,
//! or anything else that is safe for concurrent use. [`MemoryStorer`] is the
//! in-memory implementation used by tests and single-process deployments.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{Computation, ComputationId, DarkmatchError, OrderFragment, OrderId, Result};

pub trait Storer: Send + Sync {
    /// Insert or overwrite a computation.
    fn put_computation(&self, computation: &Computation) -> Result<()>;

    /// Remove a computation. Removing an unknown ID is not an error.
    fn delete_computation(&self, id: &ComputationId) -> Result<()>;

    /// # Errors
    /// [`DarkmatchError::ComputationNotFound`] if no computation is stored
    /// under `id`.
    fn computation(&self, id: &ComputationId) -> Result<Computation>;

    /// Snapshot of every stored computation, in no particular order.
    fn computations(&self) -> Result<Vec<Computation>>;

    fn put_order_fragment(&self, fragment: &OrderFragment) -> Result<()>;

    /// Remove a fragment. Removing an unknown ID is not an error.
    fn delete_order_fragment(&self, order: &OrderId) -> Result<()>;

    /// # Errors
    /// [`DarkmatchError::FragmentNotFound`] if no fragment of `order` is
    /// held.
    fn order_fragment(&self, order: &OrderId) -> Result<OrderFragment>;
}

/// In-memory [`Storer`].
#[derive(Debug, Default)]
pub struct MemoryStorer {
    computations: RwLock<HashMap<ComputationId, Computation>>,
    fragments: RwLock<HashMap<OrderId, OrderFragment>>,
}

impl MemoryStorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storer for MemoryStorer {
    fn put_computation(&self, computation: &Computation) -> Result<()> {
        self.computations
            .write()
            .insert(computation.id, computation.clone());
        Ok(())
    }

    fn delete_computation(&self, id: &ComputationId) -> Result<()> {
        self.computations.write().remove(id);
        Ok(())
    }

    fn computation(&self, id: &ComputationId) -> Result<Computation> {
        self.computations
            .read()
            .get(id)
            .cloned()
            .ok_or(DarkmatchError::ComputationNotFound(*id))
    }

    fn computations(&self) -> Result<Vec<Computation>> {
        Ok(self.computations.read().values().cloned().collect())
    }

    fn put_order_fragment(&self, fragment: &OrderFragment) -> Result<()> {
        self.fragments
            .write()
            .insert(fragment.order_id, fragment.clone());
        Ok(())
    }

    fn delete_order_fragment(&self, order: &OrderId) -> Result<()> {
        self.fragments.write().remove(order);
        Ok(())
    }

    fn order_fragment(&self, order: &OrderId) -> Result<OrderFragment> {
        self.fragments
            .read()
            .get(order)
            .cloned()
            .ok_or(DarkmatchError::FragmentNotFound(*order))
    }
}
