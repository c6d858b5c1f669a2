//! LRU Store Module
//!
//! Byte-bounded least-recently-used store with an eviction callback.
//!
//! Entries live in an arena (`slots`) and are linked by index into a
//! recency list. A key index maps each key to its slot, so lookup,
//! promotion and eviction are all O(1) without reference cycles.

use std::collections::HashMap;
use std::fmt;

// == Byte Size ==
/// Values stored in an `LruStore` report how many bytes they occupy.
pub trait ByteSize {
    fn byte_size(&self) -> usize;
}

impl ByteSize for String {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for Vec<u8> {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

/// Called with each evicted entry, after it has left the store.
pub type EvictionCallback<V> = Box<dyn FnMut(String, V) + Send>;

#[derive(Debug)]
struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<V: ByteSize> Node<V> {
    fn size(&self) -> usize {
        self.key.len() + self.value.byte_size()
    }
}

// == LRU Store ==
/// Recency-ordered store bounded by total key + value bytes.
///
/// - `head` = most recently used
/// - `tail` = least recently used
///
/// A `max_bytes` of 0 means unbounded.
pub struct LruStore<V> {
    max_bytes: usize,
    used_bytes: usize,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V: ByteSize> LruStore<V> {
    // == Constructors ==
    /// Creates an empty store holding at most `max_bytes` bytes.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            on_evicted: None,
        }
    }

    /// Creates an empty store that reports evictions to `on_evicted`.
    pub fn with_eviction_callback(max_bytes: usize, on_evicted: EvictionCallback<V>) -> Self {
        let mut store = Self::new(max_bytes);
        store.on_evicted = Some(on_evicted);
        store
    }

    // == Add ==
    /// Inserts or replaces `key`, marking it most recently used.
    ///
    /// Evicts from the tail until the store is back within `max_bytes`.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Some(&idx) = self.index.get(&key) {
            self.move_to_front(idx);
            let node = self.node_mut(idx);
            let old_size = node.value.byte_size();
            node.value = value;
            let new_size = node.value.byte_size();
            self.used_bytes = self.used_bytes - old_size + new_size;
        } else {
            let node = Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            };
            self.used_bytes += node.size();
            let idx = self.alloc(node);
            self.index.insert(key, idx);
            self.push_front(idx);
        }

        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            if !self.remove_oldest() {
                break;
            }
        }
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        Some(&self.node(idx).value)
    }

    /// Returns the value for `key` without changing its recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        Some(&self.node(idx).value)
    }

    // == Remove Oldest ==
    /// Evicts the least recently used entry.
    ///
    /// Returns false when the store was already empty.
    pub fn remove_oldest(&mut self) -> bool {
        let Some(idx) = self.tail else {
            return false;
        };

        self.unlink(idx);
        let Some(node) = self.slots[idx].take() else {
            return false;
        };
        self.free.push(idx);
        self.index.remove(&node.key);
        self.used_bytes -= node.size();

        // State is consistent before the callback sees the entry
        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(node.key, node.value);
        }
        true
    }

    // == Accessors ==
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sum of key and value bytes over all live entries.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            store: self,
            cursor: self.head,
        }
    }

    // == Internal List Handling ==
    fn node(&self, idx: usize) -> &Node<V> {
        self.slots[idx]
            .as_ref()
            .expect("lru index points at a vacant slot")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<V> {
        self.slots[idx]
            .as_mut()
            .expect("lru index points at a vacant slot")
    }

    fn alloc(&mut self, node: Node<V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }

        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }
}

impl<V> fmt::Debug for LruStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("max_bytes", &self.max_bytes)
            .field("used_bytes", &self.used_bytes)
            .field("len", &self.index.len())
            .field("has_eviction_callback", &self.on_evicted.is_some())
            .finish()
    }
}

// == Iterator ==
/// Iterator over `(key, value)` pairs in recency order.
pub struct Iter<'a, V> {
    store: &'a LruStore<V>,
    cursor: Option<usize>,
}

impl<'a, V: ByteSize> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.store.node(idx);
        self.cursor = node.next;
        Some((node.key.as_str(), &node.value))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn keys(store: &LruStore<String>) -> Vec<String> {
        store.iter().map(|(k, _)| k.to_string()).collect()
    }

    #[test]
    fn test_lru_new() {
        let lru: LruStore<String> = LruStore::new(100);
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert_eq!(lru.used_bytes(), 0);
    }

    #[test]
    fn test_lru_get_hit_and_miss() {
        let mut lru = LruStore::new(100);
        lru.add("key1", "1234".to_string());

        assert_eq!(lru.get("key1"), Some(&"1234".to_string()));
        assert_eq!(lru.get("key2"), None);
    }

    #[test]
    fn test_lru_peek_keeps_recency() {
        let mut lru = LruStore::new(0);
        lru.add("a", "1".to_string());
        lru.add("b", "2".to_string());

        assert_eq!(lru.peek("a"), Some(&"1".to_string()));
        assert_eq!(lru.peek("zzz"), None);
        assert_eq!(keys(&lru), vec!["b", "a"]);

        lru.remove_oldest();
        assert!(lru.peek("a").is_none());
    }

    #[test]
    fn test_lru_readd_does_not_double_count() {
        let mut lru = LruStore::new(100);

        lru.add("key", "1".to_string());
        lru.add("key", "111".to_string());

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.used_bytes(), "key".len() + "111".len());
        assert_eq!(lru.get("key"), Some(&"111".to_string()));
    }

    #[test]
    fn test_lru_remove_oldest_on_overflow() {
        let (k1, k2, k3) = ("key1", "key2", "k3");
        let (v1, v2, v3) = ("value1", "value2", "v3");
        let cap = k1.len() + k2.len() + v1.len() + v2.len();

        let mut lru = LruStore::new(cap);
        lru.add(k1, v1.to_string());
        lru.add(k2, v2.to_string());
        lru.add(k3, v3.to_string());

        assert!(lru.get("key1").is_none());
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_lru_eviction_callback_order() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();

        let mut lru = LruStore::with_eviction_callback(
            10,
            Box::new(move |key: String, _value: String| sink.lock().unwrap().push(key)),
        );
        lru.add("key1", "123456".to_string());
        assert_eq!(lru.used_bytes(), 10);
        lru.add("k2", "k2".to_string());
        assert_eq!(lru.used_bytes(), 4);
        lru.add("k3", "k3".to_string());
        assert_eq!(lru.used_bytes(), 8);
        lru.add("k4", "k4".to_string());
        assert_eq!(lru.used_bytes(), 8);

        assert_eq!(*evicted.lock().unwrap(), vec!["key1", "k2"]);
    }

    #[test]
    fn test_lru_get_refreshes_recency() {
        // Room for exactly two entries of four bytes each
        let mut lru = LruStore::new(8);
        lru.add("a", "aaa".to_string());
        lru.add("b", "bbb".to_string());

        // Touch 'a' so 'b' becomes the eviction candidate
        assert!(lru.get("a").is_some());
        lru.add("c", "ccc".to_string());

        assert!(lru.get("a").is_some());
        assert!(lru.get("b").is_none());
        assert!(lru.get("c").is_some());
    }

    #[test]
    fn test_lru_zero_capacity_is_unbounded() {
        let mut lru = LruStore::new(0);
        for i in 0..1000 {
            lru.add(format!("key{i}"), "x".repeat(64));
        }
        assert_eq!(lru.len(), 1000);
    }

    #[test]
    fn test_lru_remove_oldest_empty_is_noop() {
        let mut lru: LruStore<String> = LruStore::new(10);
        assert!(!lru.remove_oldest());
        assert_eq!(lru.used_bytes(), 0);
    }

    #[test]
    fn test_lru_iter_order() {
        let mut lru = LruStore::new(0);
        lru.add("a", String::new());
        lru.add("b", String::new());
        lru.add("c", String::new());
        lru.get("a");

        assert_eq!(keys(&lru), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_lru_slot_reuse_after_eviction() {
        let mut lru = LruStore::new(6);
        lru.add("a", "bc".to_string());
        lru.add("d", "ef".to_string());
        lru.add("g", "hi".to_string());
        lru.add("j", "kl".to_string());

        assert_eq!(keys(&lru), vec!["j", "g"]);
        // Evicted slot is recycled rather than growing the arena
        assert_eq!(lru.slots.len(), 3);
    }

    #[test]
    fn test_lru_oversized_entry_empties_store() {
        let mut lru = LruStore::new(5);
        lru.add("k", "v".to_string());
        lru.add("big", "value".to_string());

        assert!(lru.is_empty());
        assert_eq!(lru.used_bytes(), 0);
    }
}
