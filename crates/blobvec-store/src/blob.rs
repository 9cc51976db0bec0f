//! Blob state handles and payload buffers.

use crate::page::{Extent, ExtentList};
use blobvec_core::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

const STATE_HEADER: usize = 16;
const EXTENT_ENCODED: usize = 8;

/// Bounds on the encoded size of a handle. A handle outside these is
/// rejected with `Error::InvalidHandle` before the store dereferences it.
pub const MIN_MALLOC: usize = STATE_HEADER + EXTENT_ENCODED;
pub const MAX_MALLOC: usize = 512;

pub(crate) const MAX_STATE_EXTENTS: usize = (MAX_MALLOC - STATE_HEADER) / EXTENT_ENCODED;

/// Handle to an externally stored payload: identity, byte length, and the
/// page extents backing it. This is also the record payload of the vector
/// relations — two handles with equal identity alias byte-identical bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobState {
    blob_id: u64,
    byte_len: u32,
    extents: ExtentList,
}

impl BlobState {
    pub(crate) fn new(blob_id: u64, byte_len: u32, extents: ExtentList) -> Self {
        Self {
            blob_id,
            byte_len,
            extents,
        }
    }

    pub fn blob_id(&self) -> u64 {
        self.blob_id
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len as usize
    }

    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    pub fn page_count(&self) -> u32 {
        self.extents.iter().map(|e| e.num_pages).sum()
    }

    /// Encoded size of this handle, the record payload size in the tree.
    pub fn state_size(&self) -> usize {
        STATE_HEADER + EXTENT_ENCODED * self.extents.len()
    }

    pub fn check_bounds(&self) -> Result<()> {
        let size = self.state_size();
        if !(MIN_MALLOC..=MAX_MALLOC).contains(&size) {
            return Err(Error::InvalidHandle {
                size,
                min: MIN_MALLOC,
                max: MAX_MALLOC,
            });
        }
        Ok(())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.state_size()];
        LittleEndian::write_u64(&mut buf[0..8], self.blob_id);
        LittleEndian::write_u32(&mut buf[8..12], self.byte_len);
        LittleEndian::write_u32(&mut buf[12..16], self.extents.len() as u32);
        for (i, ext) in self.extents.iter().enumerate() {
            let off = STATE_HEADER + i * EXTENT_ENCODED;
            LittleEndian::write_u32(&mut buf[off..off + 4], ext.first_page);
            LittleEndian::write_u32(&mut buf[off + 4..off + 8], ext.num_pages);
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < STATE_HEADER {
            return Err(Error::Store(format!(
                "blob state record truncated: {} bytes",
                bytes.len()
            )));
        }
        let blob_id = LittleEndian::read_u64(&bytes[0..8]);
        let byte_len = LittleEndian::read_u32(&bytes[8..12]);
        let extent_count = LittleEndian::read_u32(&bytes[12..16]) as usize;
        if bytes.len() != STATE_HEADER + extent_count * EXTENT_ENCODED {
            return Err(Error::Store(format!(
                "blob state record length {} does not match {} extents",
                bytes.len(),
                extent_count
            )));
        }
        let mut extents = ExtentList::new();
        for i in 0..extent_count {
            let off = STATE_HEADER + i * EXTENT_ENCODED;
            extents.push(Extent {
                first_page: LittleEndian::read_u32(&bytes[off..off + 4]),
                num_pages: LittleEndian::read_u32(&bytes[off + 4..off + 8]),
            });
        }
        Ok(Self {
            blob_id,
            byte_len,
            extents,
        })
    }
}

/// Payload storage. Backed by an f32 allocation so spans handed to load
/// callbacks can be reinterpreted as float slices without copying.
#[derive(Debug)]
pub struct BlobBuf {
    words: Box<[f32]>,
    byte_len: usize,
}

impl BlobBuf {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = vec![0f32; bytes.len().div_ceil(4)].into_boxed_slice();
        bytemuck::cast_slice_mut(&mut words)[..bytes.len()].copy_from_slice(bytes);
        Self {
            words,
            byte_len: bytes.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.byte_len]
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

/// Reinterpret a blob payload as little-endian float32s. Fails if the span
/// is misaligned or not a whole number of floats.
pub fn float_slice(bytes: &[u8]) -> Result<&[f32]> {
    bytemuck::try_cast_slice(bytes)
        .map_err(|e| Error::Precondition(format!("blob payload is not a float array: {e}")))
}
