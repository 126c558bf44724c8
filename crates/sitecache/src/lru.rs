//! Fixed-capacity LRU core: a keyed index over an intrusive recency list.
//!
//! Entries live in an arena of stable slots. Both the index and the recency
//! list refer to an entry by slot number, so no entry is ever owned twice.
//! The list head is the most-recently-used entry, the tail the least.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

use ahash::RandomState;

/// What a call to [`LruCache::put`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult<K, V> {
    /// The key was new and fit without displacing anything.
    Inserted,
    /// The key was already cached; the previous value is handed back.
    Replaced(V),
    /// The key was new and inserting it evicted the least-recently-used pair.
    InsertedEvicting(K, V),
}

struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed-capacity cache with least-recently-used eviction.
///
/// `get` and `put` are O(1) amortized: lookup through the hash index,
/// recency maintenance through constant-time list splices.
pub struct LruCache<K, V> {
    index: HashMap<K, usize, RandomState>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// Panics if `capacity` is zero; a zero-capacity LRU is a programming
    /// error, not a runtime condition.
    pub fn new(capacity: usize) -> Self {
        Self::with_index_capacity(capacity, 0)
    }

    /// Like [`new`](Self::new), but pre-sizes the hash index to
    /// `index_hint` buckets. A hint of zero selects the default (`capacity`).
    pub fn with_index_capacity(capacity: usize, index_hint: usize) -> Self {
        assert!(capacity > 0, "LRU capacity must be at least 1");

        let hint = if index_hint == 0 { capacity } else { index_hint };
        Self {
            index: HashMap::with_capacity_and_hasher(hint, RandomState::new()),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up `key` and promote it to most-recently-used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Look up `key` without touching recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Insert or replace `key`, evicting the least-recently-used pair if the
    /// cache would otherwise exceed capacity.
    ///
    /// The entry for `key` always ends up most-recently-used. Replacing an
    /// existing key never evicts.
    pub fn put(&mut self, key: K, value: V) -> PutResult<K, V> {
        if let Some(&idx) = self.index.get(&key) {
            let slot = self.slots[idx]
                .as_mut()
                .expect("index references a vacant slot");
            let old = mem::replace(&mut slot.value, value);
            self.promote(idx);
            return PutResult::Replaced(old);
        }

        let idx = self.alloc(Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.attach_head(idx);
        self.index.insert(key, idx);

        if self.index.len() > self.capacity {
            let (old_key, old_value) = self.evict_tail();
            return PutResult::InsertedEvicting(old_key, old_value);
        }
        PutResult::Inserted
    }

    /// Drop `key` from the cache, returning its value if present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.detach(idx);
        let slot = self.slots[idx].take().expect("removed slot is occupied");
        self.free.push(idx);
        Some(slot.value)
    }

    /// Drop every entry, keeping the configured capacity.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Entries in recency order, most-recently-used first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            next: self.head,
        }
    }

    /// Move an already-linked slot to the head. No-op when it is the head.
    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.attach_head(idx);
    }

    /// Link a detached slot in as the new head.
    fn attach_head(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = None;
            slot.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(head) = self.slots[h].as_mut() {
                    head.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    /// Splice a slot out of the list, fixing head/tail as needed.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(slot) => (slot.prev, slot.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(slot) = self.slots[p].as_mut() {
                    slot.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(slot) = self.slots[n].as_mut() {
                    slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    /// Unlink and free the least-recently-used slot.
    ///
    /// Panics when the list is empty: `put` only calls this after inserting,
    /// so an empty list here means the list and index have diverged.
    fn evict_tail(&mut self) -> (K, V) {
        let idx = self.tail.expect("evict_tail on an empty list");
        self.detach(idx);
        let slot = self.slots[idx].take().expect("tail slot is occupied");
        self.index.remove(&slot.key);
        self.free.push(idx);
        (slot.key, slot.value)
    }

    fn alloc(&mut self, slot: Slot<K, V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }
}

/// Iterator over cache entries, most-recently-used first.
pub struct Iter<'a, K, V> {
    slots: &'a [Option<Slot<K, V>>],
    next: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let slot = self.slots[idx].as_ref()?;
        self.next = slot.next;
        Some((&slot.key, &slot.value))
    }
}

#[cfg(test)]
impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Walk the list both directions and cross-check it against the index.
    fn assert_consistent(&self) {
        let mut visited = 0;
        let mut prev = None;
        let mut cur = self.head;
        while let Some(idx) = cur {
            let slot = self.slots[idx].as_ref().expect("linked slot is occupied");
            assert_eq!(slot.prev, prev, "back link mirrors forward link");
            assert_eq!(
                self.index.get(&slot.key),
                Some(&idx),
                "every listed key is indexed at its own slot"
            );
            visited += 1;
            prev = cur;
            cur = slot.next;
        }
        assert_eq!(self.tail, prev, "forward walk terminates at the tail");
        assert_eq!(visited, self.index.len(), "list and index sizes agree");
    }
}
