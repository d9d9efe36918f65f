//! Suppress repeated log lines about the same object.

use rsyncit_core::ContentHash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

const DEFAULT_BITS: usize = 1 << 20;
const DEFAULT_CAPACITY: usize = 50_000;
const HASHES: usize = 4;

/// Bloom filter over content hashes answering "have we logged this already?".
///
/// The filter is reset after `capacity` insertions to keep the false positive
/// rate bounded, so an object that keeps failing is logged again now and then.
#[derive(Debug)]
pub struct LogFilter {
    bits: Vec<AtomicU64>,
    capacity: usize,
    inserted: AtomicUsize,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BITS, DEFAULT_CAPACITY)
    }
}

impl LogFilter {
    /// `bits` is rounded up to a multiple of 64.
    pub fn new(bits: usize, capacity: usize) -> Self {
        let words = bits.div_ceil(64).max(1);
        Self {
            bits: (0..words).map(|_| AtomicU64::new(0)).collect(),
            capacity: capacity.max(1),
            inserted: AtomicUsize::new(0),
        }
    }

    /// Record `hash` and return whether it was (probably) not seen before.
    pub fn first_time(&self, hash: &ContentHash) -> bool {
        let total_bits = self.bits.len() * 64;
        let mut fresh = false;
        // SHA-256 output is uniform, so its words serve directly as the k hashes.
        for chunk in hash.as_bytes().chunks_exact(8).take(HASHES) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            let bit = (u64::from_be_bytes(word) % total_bits as u64) as usize;
            let mask = 1u64 << (bit % 64);
            let previous = self.bits[bit / 64].fetch_or(mask, Ordering::Relaxed);
            fresh |= previous & mask == 0;
        }

        if fresh && self.inserted.fetch_add(1, Ordering::Relaxed) + 1 >= self.capacity {
            self.clear();
        }
        fresh
    }

    fn clear(&self) {
        for word in &self.bits {
            word.store(0, Ordering::Relaxed);
        }
        self.inserted.store(0, Ordering::Relaxed);
    }
}
