use wrmi_cdr::CdrBuffer;

/// Default capacity for pooled buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Pool of reusable CDR buffers.
///
/// Buffers move out on `acquire` and back in on `release`; the pool grows on
/// demand and never shrinks. Contents are not reset on release, so callers
/// `clear` at the start of each use. The `outstanding` counter is the
/// canonical leak detector: after any complete operation it must be zero.
pub struct BufferPool {
    idle: Vec<CdrBuffer>,
    outstanding: usize,
    default_capacity: usize,
}

impl BufferPool {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            idle: Vec::new(),
            outstanding: 0,
            default_capacity,
        }
    }

    /// Take an idle buffer, or allocate a fresh one at the default capacity.
    pub fn acquire(&mut self) -> CdrBuffer {
        self.outstanding += 1;
        self.idle
            .pop()
            .unwrap_or_else(|| CdrBuffer::with_capacity(self.default_capacity))
    }

    /// Return a buffer to the pool.
    pub fn release(&mut self, buf: CdrBuffer) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.idle.push(buf);
    }

    /// Buffers currently checked out.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Buffers currently idle.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}
