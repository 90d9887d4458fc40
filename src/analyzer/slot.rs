//! Single-slot frame handoff
//!
//! One writer and one reader share a fixed-size frame. The state word moves
//! EMPTY -> WRITING -> READY -> READING -> EMPTY; each side only advances the
//! transitions it owns, so the reader never sees a half-written frame and the
//! writer never overwrites an unread one.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicU8, Ordering};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const READING: u8 = 3;

/// Fixed-size frame guarded by an atomic state word
#[derive(Debug)]
pub struct FrameSlot {
    state: AtomicU8,
    bins: Box<[AtomicF32]>,
}

impl FrameSlot {
    pub fn new(len: usize) -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            bins: (0..len).map(|_| AtomicF32::new(0.0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// True when the writer may publish
    pub fn is_free(&self) -> bool {
        self.state.load(Ordering::Acquire) == EMPTY
    }

    /// True when a published frame is waiting for the reader
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Copy `frame` into the slot and mark it ready.
    ///
    /// Returns false, leaving the slot untouched, if a frame is still pending
    /// or being read.
    pub fn try_publish(&self, frame: &[f32]) -> bool {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        for (bin, &value) in self.bins.iter().zip(frame) {
            bin.store(value, Ordering::Relaxed);
        }

        self.state.store(READY, Ordering::Release);
        true
    }

    /// Copy a ready frame into `out` and free the slot.
    ///
    /// Returns false if nothing was published since the last take.
    pub fn try_take(&self, out: &mut [f32]) -> bool {
        if self
            .state
            .compare_exchange(READY, READING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        for (value, bin) in out.iter_mut().zip(self.bins.iter()) {
            *value = bin.load(Ordering::Relaxed);
        }

        self.state.store(EMPTY, Ordering::Release);
        true
    }
}
