//! In-memory realization of the page-oriented blob store.
//!
//! One `PageStore` owns the blob table, the page allocator, and one ordered
//! tree per registered relation. Every operation must run inside a
//! transaction bracket; the engines are single-threaded per build/query, so
//! the bracket is a contract check rather than a lock. Payload buffers are
//! ref-counted: a load hands its callback a span of the buffer without
//! holding any store lock across user code, which is what makes nested
//! loads (and blob registration inside a load callback) legal.

use crate::blob::{BlobBuf, BlobState};
use crate::keys::FOLDED_KEY_LEN;
use crate::page::{pages_for, PageAllocator};
use blobvec_core::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) type Tree = BTreeMap<[u8; FOLDED_KEY_LEN], Vec<u8>>;

#[derive(Default)]
pub struct PageStore {
    blobs: RwLock<HashMap<u64, Arc<BlobBuf>>>,
    allocator: Mutex<PageAllocator>,
    trees: RwLock<HashMap<TypeId, Arc<RwLock<Tree>>>>,
    next_blob_id: AtomicU64,
    txn_depth: AtomicU32,
}

impl PageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ---- transaction bracket -------------------------------------------

    pub fn start_transaction(&self) {
        self.txn_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commit_transaction(&self) -> Result<()> {
        if self.txn_depth.load(Ordering::Relaxed) == 0 {
            return Err(Error::Precondition("commit without a transaction".into()));
        }
        self.txn_depth.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    /// Run `f` inside a transaction bracket.
    pub fn transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.start_transaction();
        let out = f();
        let commit = self.commit_transaction();
        out.and_then(|v| commit.map(|()| v))
    }

    pub(crate) fn ensure_txn(&self) -> Result<()> {
        if self.txn_depth.load(Ordering::Relaxed) == 0 {
            return Err(Error::Precondition(
                "store operation outside a transaction".into(),
            ));
        }
        Ok(())
    }

    // ---- blobs ----------------------------------------------------------

    /// Allocate a new blob for `payload`. When `prev` is given its pages are
    /// released first and the returned handle supersedes it.
    pub fn create_blob(&self, payload: &[u8], prev: Option<&BlobState>) -> Result<BlobState> {
        self.ensure_txn()?;
        if let Some(prev) = prev {
            self.remove_blob(prev)?;
        }
        let extents = self.allocator.lock().allocate(pages_for(payload.len()));
        let blob_id = self.next_blob_id.fetch_add(1, Ordering::Relaxed);
        self.blobs
            .write()
            .insert(blob_id, Arc::new(BlobBuf::from_bytes(payload)));
        let state = BlobState::new(blob_id, payload.len() as u32, extents);
        state.check_bounds()?;
        Ok(state)
    }

    /// Invoke `cb` exactly once with the materialized payload. The span is
    /// valid only inside `cb`; `cb` may issue further store calls.
    pub fn load_blob<T>(
        &self,
        state: &BlobState,
        cb: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<T> {
        self.ensure_txn()?;
        state.check_bounds()?;
        let buf = self
            .blobs
            .read()
            .get(&state.blob_id())
            .cloned()
            .ok_or_else(|| {
                Error::Precondition(format!("load of unknown blob {}", state.blob_id()))
            })?;
        debug_assert_eq!(buf.byte_len(), state.byte_len());
        cb(buf.as_bytes())
    }

    pub fn remove_blob(&self, state: &BlobState) -> Result<()> {
        self.ensure_txn()?;
        state.check_bounds()?;
        if self.blobs.write().remove(&state.blob_id()).is_none() {
            return Err(Error::Precondition(format!(
                "remove of unknown blob {}",
                state.blob_id()
            )));
        }
        self.allocator.lock().release(state.extents());
        Ok(())
    }

    // ---- relations ------------------------------------------------------

    pub(crate) fn register_relation(&self, relation: TypeId) -> Arc<RwLock<Tree>> {
        self.trees
            .write()
            .entry(relation)
            .or_default()
            .clone()
    }

    // ---- stats ----------------------------------------------------------

    pub fn blob_count(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn pages_in_use(&self) -> u64 {
        self.allocator.lock().pages_in_use()
    }
}
