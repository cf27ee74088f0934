//! Clock page replacement for the buffer pool.

use crate::frame::FrameId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clock (second-chance) replacement algorithm.
///
/// Reference bits are recorded lock-free on every page access; eviction
/// sweeps the clock hand, clearing bits and selecting the first candidate
/// whose bit is unset and that the caller's predicate accepts (the pool
/// passes "pin count is zero").
pub struct ClockReplacer {
    /// Number of frames.
    num_frames: usize,
    /// Reference bits for each frame.
    reference_bits: Vec<AtomicBool>,
    /// Current clock hand position.
    clock_hand: Mutex<usize>,
}

impl ClockReplacer {
    /// Creates a new clock replacer covering `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        let reference_bits = (0..num_frames).map(|_| AtomicBool::new(false)).collect();

        Self {
            num_frames,
            reference_bits,
            clock_hand: Mutex::new(0),
        }
    }

    /// Returns the total capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.num_frames
    }

    /// Records that the given frame was accessed (sets its reference bit).
    #[inline]
    pub fn record_access(&self, frame_id: FrameId) {
        let idx = frame_id.0 as usize;
        if idx < self.num_frames {
            self.reference_bits[idx].store(true, Ordering::Relaxed);
        }
    }

    /// Clears replacement state for a frame leaving the pool.
    #[inline]
    pub fn remove(&self, frame_id: FrameId) {
        let idx = frame_id.0 as usize;
        if idx < self.num_frames {
            self.reference_bits[idx].store(false, Ordering::Relaxed);
        }
    }

    /// Selects a victim frame for eviction.
    ///
    /// `is_candidate` filters frames that may be evicted at all (occupied
    /// and unpinned). Sweeps at most two full rotations: the first pass
    /// clears reference bits, the second finds any candidate whose bit
    /// stayed clear. Returns None if no candidate exists.
    pub fn evict<F>(&self, is_candidate: F) -> Option<FrameId>
    where
        F: Fn(FrameId) -> bool,
    {
        let mut hand = self.clock_hand.lock();

        for _ in 0..(2 * self.num_frames) {
            let frame_id = FrameId(*hand as u32);
            let idx = *hand;
            *hand = (*hand + 1) % self.num_frames;

            if !is_candidate(frame_id) {
                continue;
            }

            if self.reference_bits[idx].load(Ordering::Relaxed) {
                // Second chance: clear the bit and move on
                self.reference_bits[idx].store(false, Ordering::Relaxed);
            } else {
                return Some(frame_id);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_replacer_new() {
        let replacer = ClockReplacer::new(10);
        assert_eq!(replacer.capacity(), 10);
    }

    #[test]
    fn test_evict_no_candidates() {
        let replacer = ClockReplacer::new(5);
        assert_eq!(replacer.evict(|_| false), None);
    }

    #[test]
    fn test_evict_single_candidate() {
        let replacer = ClockReplacer::new(5);
        let victim = replacer.evict(|f| f == FrameId(3));
        assert_eq!(victim, Some(FrameId(3)));
    }

    #[test]
    fn test_evict_prefers_unreferenced() {
        let replacer = ClockReplacer::new(3);

        // Frames 0 and 1 recently accessed; 2 not.
        replacer.record_access(FrameId(0));
        replacer.record_access(FrameId(1));

        let victim = replacer.evict(|_| true);
        assert_eq!(victim, Some(FrameId(2)));
    }

    #[test]
    fn test_evict_all_referenced() {
        let replacer = ClockReplacer::new(3);

        replacer.record_access(FrameId(0));
        replacer.record_access(FrameId(1));
        replacer.record_access(FrameId(2));

        // First rotation clears bits, second finds a victim.
        assert!(replacer.evict(|_| true).is_some());
    }

    #[test]
    fn test_second_chance_cycle() {
        let replacer = ClockReplacer::new(2);

        replacer.record_access(FrameId(0));
        let first = replacer.evict(|_| true);
        // Frame 1 has no reference bit, frame 0 does.
        assert_eq!(first, Some(FrameId(1)));

        // Re-accessing frame 0 sets its bit again; eviction clears it on
        // the first rotation and selects it on the second.
        replacer.record_access(FrameId(0));
        assert!(replacer.evict(|f| f == FrameId(0)).is_some());
    }

    #[test]
    fn test_remove_clears_reference_bit() {
        let replacer = ClockReplacer::new(2);

        replacer.record_access(FrameId(0));
        replacer.remove(FrameId(0));

        // With its bit cleared, frame 0 is immediately evictable.
        let victim = replacer.evict(|f| f == FrameId(0));
        assert_eq!(victim, Some(FrameId(0)));
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let replacer = ClockReplacer::new(5);

        // These should not panic
        replacer.record_access(FrameId(100));
        replacer.remove(FrameId(100));
    }
}
