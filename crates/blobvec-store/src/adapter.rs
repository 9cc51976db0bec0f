//! Access adapters over the store.
//!
//! `BlobAdapter` maps payload bytes to blob state handles; `VectorAdapter`
//! is an ordered-key view of one relation whose record payload is an
//! encoded handle. Relations are identified by marker type, so the main
//! and centroid tables of one store cannot be confused at the call site.

use crate::blob::{float_slice, BlobState};
use crate::keys::{fold_key, unfold_key};
use crate::store::{PageStore, Tree};
use blobvec_core::{Error, Result};
use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::Arc;

/// Marker for the main vector relation.
pub struct MainVectors;

/// Marker for the centroid relation.
pub struct Centroids;

#[derive(Clone)]
pub struct BlobAdapter {
    store: Arc<PageStore>,
}

impl BlobAdapter {
    pub fn new(store: Arc<PageStore>) -> Self {
        Self { store }
    }

    /// Allocate a new blob with the given payload.
    pub fn register(&self, payload: &[u8]) -> Result<BlobState> {
        self.store.create_blob(payload, None)
    }

    /// Replace `prev`'s backing content; the returned handle supersedes it.
    pub fn update(&self, payload: &[u8], prev: &BlobState) -> Result<BlobState> {
        self.store.create_blob(payload, Some(prev))
    }

    /// Release the blob. The handle must not be reused afterwards.
    pub fn remove(&self, state: &BlobState) -> Result<()> {
        self.store.remove_blob(state)
    }

    /// Materialize the payload for the duration of `cb`.
    pub fn load<T>(&self, state: &BlobState, cb: impl FnOnce(&[u8]) -> Result<T>) -> Result<T> {
        self.store.load_blob(state, cb)
    }

    /// Copy the payload out as an owned float vector.
    pub fn materialize_floats(&self, state: &BlobState) -> Result<Vec<f32>> {
        self.load(state, |bytes| float_slice(bytes).map(<[f32]>::to_vec))
    }
}

/// Ordered-key table over one relation: scan, point lookup, insert,
/// in-place update, and entry count.
#[derive(Clone)]
pub struct VectorAdapter {
    store: Arc<PageStore>,
    tree: Arc<RwLock<Tree>>,
    blob: BlobAdapter,
}

impl VectorAdapter {
    /// Open the relation identified by marker type `R`, registering it on
    /// first use.
    pub fn create<R: 'static>(store: &Arc<PageStore>) -> Self {
        let tree = store.register_relation(TypeId::of::<R>());
        Self {
            store: Arc::clone(store),
            tree,
            blob: BlobAdapter::new(Arc::clone(store)),
        }
    }

    pub fn blob_adapter(&self) -> &BlobAdapter {
        &self.blob
    }

    /// Visit records in ascending key order starting at `start_key`. The
    /// visitor returns `false` to stop early.
    pub fn scan(
        &self,
        start_key: i32,
        mut visit: impl FnMut(i32, &BlobState) -> Result<bool>,
    ) -> Result<()> {
        self.store.ensure_txn()?;
        let tree = self.tree.read();
        for (folded, payload) in tree.range(fold_key(start_key)..) {
            let state = BlobState::decode(payload)?;
            if !visit(unfold_key(*folded), &state)? {
                break;
            }
        }
        Ok(())
    }

    /// Descending variant of [`scan`](Self::scan).
    pub fn scan_desc(
        &self,
        start_key: i32,
        mut visit: impl FnMut(i32, &BlobState) -> Result<bool>,
    ) -> Result<()> {
        self.store.ensure_txn()?;
        let tree = self.tree.read();
        for (folded, payload) in tree.range(..=fold_key(start_key)).rev() {
            let state = BlobState::decode(payload)?;
            if !visit(unfold_key(*folded), &state)? {
                break;
            }
        }
        Ok(())
    }

    pub fn insert(&self, key: i32, state: &BlobState) -> Result<()> {
        self.store.ensure_txn()?;
        state.check_bounds()?;
        self.tree.write().insert(fold_key(key), state.encode());
        Ok(())
    }

    /// Invoke `f` with the record at `key` if present; reports presence.
    pub fn lookup<T>(
        &self,
        key: i32,
        f: impl FnOnce(&BlobState) -> Result<T>,
    ) -> Result<Option<T>> {
        self.store.ensure_txn()?;
        let payload = self.tree.read().get(&fold_key(key)).cloned();
        match payload {
            Some(payload) => Ok(Some(f(&BlobState::decode(&payload)?)?)),
            None => Ok(None),
        }
    }

    /// Replace the record at `key`: the old blob is removed, a new blob is
    /// registered for `payload`, and the record re-pointed.
    pub fn update(&self, key: i32, payload: &[u8]) -> Result<()> {
        self.store.ensure_txn()?;
        let old = self
            .lookup(key, |state| Ok(state.clone()))?
            .ok_or_else(|| Error::Precondition(format!("update of absent key {key}")))?;
        self.blob.remove(&old)?;
        let new_state = self.blob.register(payload)?;
        self.tree.write().insert(fold_key(key), new_state.encode());
        Ok(())
    }

    pub fn materialize_floats(&self, key: i32) -> Result<Vec<f32>> {
        self.lookup(key, |state| self.blob.materialize_floats(state))?
            .ok_or_else(|| Error::Precondition(format!("materialize of absent key {key}")))
    }

    pub fn count(&self) -> Result<u64> {
        self.store.ensure_txn()?;
        Ok(self.tree.read().len() as u64)
    }
}
