//! Strategies for choosing among the tonal variants of a response.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

pub trait VariantPicker: Send + Sync {
    /// Returns an index in `0..len`. Callers never pass `len == 0`.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random choice backed by the thread-local generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRngPicker;

impl VariantPicker for ThreadRngPicker {
    fn pick(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always returns the same index, wrapped into range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedPicker(pub usize);

impl VariantPicker for FixedPicker {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.0 % len
    }
}

/// Walks through indices 0, 1, 2, ... on successive calls.
#[derive(Debug, Default)]
pub struct SequencePicker {
    next: AtomicUsize,
}

impl VariantPicker for SequencePicker {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.next.fetch_add(1, Ordering::Relaxed) % len
    }
}
