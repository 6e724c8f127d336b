//! Reusable byte buffers.
//!
//! Serialization output goes through pooled `Vec<u8>` buffers so steady
//! request traffic does not re-grow allocations on every call. A buffer is
//! lent out as a [`PooledBuf`] guard; dropping the guard clears the buffer
//! (length zero, capacity kept) and returns it to the pool, so the release
//! contract holds on every exit path.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A grow-on-demand pool of byte buffers.
///
/// The pool never shrinks; its steady-state size is the peak number of
/// concurrently lent buffers.
#[derive(Clone, Default)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow an empty buffer from the pool, allocating if none are free.
    #[must_use]
    pub fn acquire(&self) -> PooledBuf {
        let buf = self.free.lock().pop().unwrap_or_default();
        debug_assert!(buf.is_empty());
        PooledBuf {
            buf,
            pool: Arc::clone(&self.free),
        }
    }

    /// Number of buffers currently parked in the pool.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// An exclusively owned buffer on loan from a [`BufferPool`].
pub struct PooledBuf {
    buf: Vec<u8>,
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Deref for PooledBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        self.pool.lock().push(buf);
    }
}

impl std::io::Write for PooledBuf {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
