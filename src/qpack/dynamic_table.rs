// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The dynamic table: a bounded FIFO of (name, value) entries addressed by a
//! monotonically increasing absolute index that is never reused after
//! eviction.

use std::collections::{HashMap, VecDeque};

use log::{debug, trace};

#[derive(PartialEq, Copy, Clone, Debug)]
pub enum DynamicTableError {
    /// A capacity change would exceed the connection's negotiated maximum.
    InvalidTableSize,
    /// The entry does not fit even in an empty table at current capacity;
    /// encoder-internal, the caller falls back to a literal instead of
    /// surfacing this to the peer.
    TableFull,
    /// `index` does not refer to a live entry.
    InvalidIndex,
}

impl DynamicTableError {
    pub fn description_str(&self) -> &'static str {
        match self {
            DynamicTableError::InvalidTableSize => "dynamic table capacity exceeds maximum",
            DynamicTableError::TableFull => "entry does not fit in dynamic table capacity",
            DynamicTableError::InvalidIndex => "dynamic table index out of range",
        }
    }
}

#[derive(Clone)]
struct Entry {
    absolute_index: u64,
    name: Vec<u8>,
    value: Vec<u8>,
}

impl Entry {
    fn size(&self) -> usize {
        32 + self.name.len() + self.value.len()
    }
}

#[derive(PartialEq, Copy, Clone, Debug)]
pub enum MatchKind {
    NameValue,
    NameOnly,
}

/// The dynamic table. Oldest entries sit at the front of `entries` and are
/// the first to be evicted.
pub struct DynamicTable {
    entries: VecDeque<Entry>,
    capacity: usize,
    max_capacity: usize,
    current_size: usize,
    insert_count: u64,
    // newest absolute index carrying this name
    name_index: HashMap<Vec<u8>, u64>,
    // newest absolute index carrying this exact (name, value) pair
    name_value_index: HashMap<(Vec<u8>, Vec<u8>), u64>,
}

impl DynamicTable {
    pub fn new(max_capacity: usize) -> DynamicTable {
        DynamicTable {
            entries: VecDeque::new(),
            capacity: 0,
            max_capacity,
            current_size: 0,
            insert_count: 0,
            name_index: HashMap::new(),
            name_value_index: HashMap::new(),
        }
    }

    pub fn insert_count(&self) -> u64 {
        self.insert_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    /// The absolute index one below the oldest live entry; used to tell
    /// whether a referenced index has already been evicted.
    fn oldest_live_index(&self) -> u64 {
        self.entries.front().map(|e| e.absolute_index).unwrap_or(self.insert_count + 1)
    }

    pub fn is_live(&self, absolute_index: u64) -> bool {
        absolute_index != 0
            && absolute_index <= self.insert_count
            && absolute_index >= self.oldest_live_index()
    }

    pub fn get(&self, absolute_index: u64) -> Result<(&[u8], &[u8]), DynamicTableError> {
        if !self.is_live(absolute_index) {
            return Err(DynamicTableError::InvalidIndex);
        }
        let offset = absolute_index - self.oldest_live_index();
        let entry = &self.entries[offset as usize];
        Ok((&entry.name, &entry.value))
    }

    /// Looks up the newest live entry matching `name`/`value`, preferring an
    /// exact match over a name-only one.
    pub fn lookup(&self, name: &[u8], value: &[u8]) -> Option<(u64, MatchKind)> {
        if let Some(&idx) = self.name_value_index.get(&(name.to_vec(), value.to_vec())) {
            if self.is_live(idx) {
                return Some((idx, MatchKind::NameValue));
            }
        }
        if let Some(&idx) = self.name_index.get(name) {
            if self.is_live(idx) {
                return Some((idx, MatchKind::NameOnly));
            }
        }
        None
    }

    /// Reports the highest absolute index that would need to be evicted to
    /// make room for an entry of `new_entry_size` bytes, without mutating
    /// the table. Returns `None` if no eviction would be required.
    pub fn simulate_eviction(&self, new_entry_size: usize) -> Option<u64> {
        let mut freed = 0usize;
        let mut last_evicted = None;
        if self.current_size + new_entry_size <= self.capacity {
            return None;
        }
        for entry in self.entries.iter() {
            if self.current_size + new_entry_size - freed <= self.capacity {
                break;
            }
            freed += entry.size();
            last_evicted = Some(entry.absolute_index);
        }
        last_evicted
    }

    /// Reports whether inserting an entry of `new_entry_size` bytes would
    /// evict an entry at or below `protect_up_to` -- i.e. one that might
    /// still be referenced by an unacknowledged stream. Eviction always
    /// removes the oldest entry first, so it is unsafe exactly when that
    /// oldest entry falls inside the protected range.
    pub fn would_evict_protected(&self, new_entry_size: usize, protect_up_to: Option<u64>) -> bool {
        let ceiling = match protect_up_to {
            Some(c) => c,
            None => return false,
        };
        if self.current_size + new_entry_size <= self.capacity {
            return false;
        }
        match self.entries.front() {
            Some(entry) => entry.absolute_index <= ceiling,
            None => false,
        }
    }

    /// Inserts a new entry, evicting the oldest entries as needed.
    ///
    /// Returns `Err` when the entry cannot fit even in an empty table (the
    /// caller must fall back to a literal-without-reference representation).
    pub fn insert(&mut self, name: Vec<u8>, value: Vec<u8>) -> Result<u64, DynamicTableError> {
        let entry_size = 32 + name.len() + value.len();
        if entry_size > self.capacity {
            return Err(DynamicTableError::TableFull);
        }
        self.evict_to_fit(entry_size);

        self.insert_count += 1;
        let absolute_index = self.insert_count;
        self.current_size += entry_size;
        self.name_index.insert(name.clone(), absolute_index);
        self.name_value_index.insert((name.clone(), value.clone()), absolute_index);
        trace!("qpack dynamic table insert #{absolute_index}, size now {}", self.current_size);
        self.entries.push_back(Entry { absolute_index, name, value });
        Ok(absolute_index)
    }

    /// Duplicates an existing live entry as a new insertion.
    pub fn duplicate(&mut self, absolute_index: u64) -> Result<u64, DynamicTableError> {
        let (name, value) = self.get(absolute_index)?;
        let (name, value) = (name.to_vec(), value.to_vec());
        self.insert(name, value)
    }

    fn evict_to_fit(&mut self, incoming_size: usize) {
        while self.current_size + incoming_size > self.capacity {
            match self.entries.pop_front() {
                Some(entry) => {
                    self.current_size -= entry.size();
                    debug!("qpack dynamic table evicted #{}", entry.absolute_index);
                }
                None => break,
            }
        }
    }

    /// Changes capacity, evicting down to fit if it shrinks. Fails if `new`
    /// exceeds the connection-negotiated maximum.
    pub fn set_capacity(&mut self, new: usize) -> Result<(), DynamicTableError> {
        if new > self.max_capacity {
            return Err(DynamicTableError::InvalidTableSize);
        }
        self.capacity = new;
        self.evict_to_fit(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(capacity: usize) -> DynamicTable {
        let mut t = DynamicTable::new(capacity);
        t.set_capacity(capacity).unwrap();
        t
    }

    #[test]
    fn insert_and_lookup() {
        let mut t = table(256);
        let idx = t.insert(b"x-foo".to_vec(), b"bar".to_vec()).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(t.lookup(b"x-foo", b"bar"), Some((1, MatchKind::NameValue)));
        assert_eq!(t.lookup(b"x-foo", b"other"), Some((1, MatchKind::NameOnly)));
        assert_eq!(t.get(1).unwrap(), (&b"x-foo"[..], &b"bar"[..]));
    }

    #[test]
    fn eviction_is_fifo_and_indices_never_reused() {
        let mut t = table(32 + 5 + 1); // room for exactly one small entry
        let first = t.insert(b"aname".to_vec(), b"1".to_vec()).unwrap();
        let second = t.insert(b"bname".to_vec(), b"1".to_vec()).unwrap();
        assert!(second > first);
        assert!(!t.is_live(first));
        assert!(t.is_live(second));
        assert_eq!(t.get(first), Err(DynamicTableError::InvalidIndex));
    }

    #[test]
    fn simulate_eviction_does_not_mutate() {
        let mut t = table(32 + 5 + 1);
        t.insert(b"aname".to_vec(), b"1".to_vec()).unwrap();
        let would_evict = t.simulate_eviction(32 + 5 + 1);
        assert_eq!(would_evict, Some(1));
        assert!(t.is_live(1));
    }

    #[test]
    fn set_capacity_rejects_above_max() {
        let mut t = DynamicTable::new(100);
        assert_eq!(t.set_capacity(200), Err(DynamicTableError::InvalidTableSize));
    }

    #[test]
    fn entry_too_big_for_capacity_is_rejected() {
        let mut t = table(10);
        assert_eq!(
            t.insert(b"name".to_vec(), b"value".to_vec()),
            Err(DynamicTableError::TableFull)
        );
    }
}
