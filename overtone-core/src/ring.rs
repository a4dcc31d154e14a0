//! # Rolling Sample Buffer Module
//!
//! A fixed-capacity circular store that always holds the most recent
//! samples seen on the audio stream. The render thread writes one sample
//! at a time; the analysis stage periodically takes a chronologically
//! ordered snapshot of the whole buffer.
//!
//! ## Features
//! - O(1), allocation-free `push` suitable for the render thread
//! - Oldest-first snapshots independent of the internal write cursor
//! - Single allocation at construction, never resized afterwards

/// Circular buffer over the last `capacity` audio samples.
///
/// The store is zero-filled at construction, so early snapshots read as
/// silence until the stream has delivered a full buffer of samples.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    store: Vec<f32>,
    write_index: usize,
}

impl RingBuffer {
    /// Creates a buffer holding the last `capacity` samples, initialised to silence.
    ///
    /// # Panics
    /// * If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            store: vec![0.0; capacity],
            write_index: 0,
        }
    }

    /// Number of samples the buffer holds.
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Appends one sample, overwriting the oldest once the buffer is full.
    ///
    /// Constant time, never allocates, never blocks.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.store[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % self.store.len();
    }

    /// Copies the buffer contents into `out`, oldest sample first.
    ///
    /// The copy is independent of the live store, so writes that land
    /// after this call cannot corrupt an in-flight read of `out`.
    ///
    /// # Arguments
    /// * `out` - Destination slice; must be exactly `capacity()` long
    pub fn snapshot_into(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.store.len());
        let n = self.store.len();
        let tail = n - self.write_index;
        out[..tail].copy_from_slice(&self.store[self.write_index..]);
        out[tail..].copy_from_slice(&self.store[..self.write_index]);
    }

    /// Allocating convenience wrapper around [`snapshot_into`](Self::snapshot_into).
    ///
    /// Intended for tests and offline analysis; the real-time path uses
    /// `snapshot_into` with a preallocated scratch buffer.
    pub fn snapshot(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.store.len()];
        self.snapshot_into(&mut out);
        out
    }
}
