// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An ordered (stream_id, threshold) tracker, sorted by threshold ascending.
//!
//! Used for two purposes: the encoder's set of unacknowledged streams (keyed
//! by the highest dynamic index each stream references) and the decoder's
//! set of blocked streams (keyed by the insertion count each stream needs).
//! Both need: insert, delete-by-key, and "pop everything at or below a
//! threshold, in ascending order."

use std::collections::{BTreeSet, HashMap};

pub struct StreamTracker {
    by_threshold: BTreeSet<(u64, u64)>,
    by_stream: HashMap<u64, u64>,
}

impl StreamTracker {
    pub fn new() -> StreamTracker {
        StreamTracker { by_threshold: BTreeSet::new(), by_stream: HashMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.by_stream.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_stream.len()
    }

    /// Tracks `stream_id` against `threshold`, replacing any prior entry for
    /// the same stream.
    pub fn insert(&mut self, stream_id: u64, threshold: u64) {
        self.remove(stream_id);
        self.by_threshold.insert((threshold, stream_id));
        self.by_stream.insert(stream_id, threshold);
    }

    /// Removes the entry for `stream_id`, if any, returning its threshold.
    pub fn remove(&mut self, stream_id: u64) -> Option<u64> {
        if let Some(threshold) = self.by_stream.remove(&stream_id) {
            self.by_threshold.remove(&(threshold, stream_id));
            Some(threshold)
        } else {
            None
        }
    }

    pub fn threshold_of(&self, stream_id: u64) -> Option<u64> {
        self.by_stream.get(&stream_id).copied()
    }

    /// Returns the lowest threshold currently tracked, if any.
    pub fn min_threshold(&self) -> Option<u64> {
        self.by_threshold.iter().next().map(|&(t, _)| t)
    }

    /// Returns the highest threshold currently tracked, if any. Used by the
    /// encoder to compute the upper bound of dynamic indices that might
    /// still be referenced by some unacknowledged stream.
    pub fn by_threshold_max(&self) -> Option<u64> {
        self.by_threshold.iter().next_back().map(|&(t, _)| t)
    }

    /// Removes and returns, in ascending threshold order, every entry whose
    /// threshold is `<= limit`.
    pub fn pop_le(&mut self, limit: u64) -> Vec<(u64, u64)> {
        let mut popped = Vec::new();
        while let Some(&(threshold, stream_id)) = self.by_threshold.iter().next() {
            if threshold > limit {
                break;
            }
            self.by_threshold.remove(&(threshold, stream_id));
            self.by_stream.remove(&stream_id);
            popped.push((stream_id, threshold));
        }
        popped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_le_is_ascending_and_exclusive_of_higher_thresholds() {
        let mut t = StreamTracker::new();
        t.insert(3, 10);
        t.insert(1, 5);
        t.insert(2, 7);
        let popped = t.pop_le(7);
        assert_eq!(popped, vec![(1, 5), (2, 7)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.threshold_of(3), Some(10));
    }

    #[test]
    fn insert_replaces_prior_entry_for_same_stream() {
        let mut t = StreamTracker::new();
        t.insert(1, 5);
        t.insert(1, 9);
        assert_eq!(t.threshold_of(1), Some(9));
        assert_eq!(t.len(), 1);
        assert_eq!(t.pop_le(5), Vec::new());
        assert_eq!(t.pop_le(9), vec![(1, 9)]);
    }

    #[test]
    fn max_threshold_tracks_the_highest_entry() {
        let mut t = StreamTracker::new();
        assert_eq!(t.by_threshold_max(), None);
        t.insert(1, 5);
        t.insert(2, 9);
        assert_eq!(t.by_threshold_max(), Some(9));
    }

    #[test]
    fn remove_by_key() {
        let mut t = StreamTracker::new();
        t.insert(1, 5);
        assert_eq!(t.remove(1), Some(5));
        assert_eq!(t.remove(1), None);
        assert!(t.is_empty());
    }
}
