//! Page accounting for blob payloads.
//!
//! Blobs occupy whole pages described by extents (contiguous page runs).
//! Freed extents are reused exact-fit first, so long-lived stores fragment
//! and handles grow extra extents — which is exactly what the handle-size
//! bounds check exists to police.

use crate::blob::MAX_STATE_EXTENTS;
use smallvec::SmallVec;

pub const PAGE_SIZE: usize = 4096;

/// A contiguous run of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub first_page: u32,
    pub num_pages: u32,
}

pub type ExtentList = SmallVec<[Extent; 2]>;

#[derive(Debug, Default)]
pub struct PageAllocator {
    next_page: u32,
    free: Vec<Extent>,
}

impl PageAllocator {
    /// Allocate `num_pages`, preferring freed extents over fresh ones.
    pub fn allocate(&mut self, num_pages: u32) -> ExtentList {
        debug_assert!(num_pages > 0);
        let mut out = ExtentList::new();
        let mut need = num_pages;
        while need > 0 {
            if let Some(mut ext) = self.free.pop() {
                if ext.num_pages > need {
                    self.free.push(Extent {
                        first_page: ext.first_page + need,
                        num_pages: ext.num_pages - need,
                    });
                    ext.num_pages = need;
                }
                need -= ext.num_pages;
                out.push(ext);
            } else {
                out.push(Extent {
                    first_page: self.next_page,
                    num_pages: need,
                });
                self.next_page += need;
                need = 0;
            }
        }
        if out.len() > MAX_STATE_EXTENTS {
            // Too fragmented to describe in a single handle; give the free
            // runs back and carve one fresh run instead.
            self.free.extend(out.drain(..));
            out.push(Extent {
                first_page: self.next_page,
                num_pages,
            });
            self.next_page += num_pages;
        }
        out
    }

    pub fn release(&mut self, extents: &[Extent]) {
        self.free.extend_from_slice(extents);
    }

    /// Pages handed out and not yet released.
    pub fn pages_in_use(&self) -> u64 {
        let freed: u64 = self.free.iter().map(|e| u64::from(e.num_pages)).sum();
        u64::from(self.next_page) - freed
    }
}

/// Pages needed for a payload of `byte_len` bytes. Every blob owns at
/// least one page so its handle always carries an extent.
pub fn pages_for(byte_len: usize) -> u32 {
    std::cmp::max(1, byte_len.div_ceil(PAGE_SIZE)) as u32
}
