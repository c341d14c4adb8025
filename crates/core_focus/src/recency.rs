//! Most-recently-used ordering over arena keys.

use slotmap::{Key, SecondaryMap};

#[derive(Debug, Clone, Copy)]
struct Link<K> {
    prev: K,
    next: K,
}

/// A circular, index-linked recency list.
///
/// The head is the most recently used entry. Links live in a `SecondaryMap`
/// keyed by the same handles as the owning registry, so unlinking and
/// move-to-front are O(1) and there is no sentinel node to step over.
#[derive(Debug, Clone)]
pub struct RecencyList<K: Key> {
    head: Option<K>,
    links: SecondaryMap<K, Link<K>>,
}

impl<K: Key> Default for RecencyList<K> {
    fn default() -> Self {
        Self {
            head: None,
            links: SecondaryMap::new(),
        }
    }
}

impl<K: Key> RecencyList<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn contains(&self, key: K) -> bool {
        self.links.contains_key(key)
    }

    /// Most recently used entry.
    pub fn front(&self) -> Option<K> {
        self.head
    }

    /// Least recently used entry.
    pub fn back(&self) -> Option<K> {
        self.head
            .and_then(|head| self.links.get(head))
            .map(|link| link.prev)
    }

    /// Insert `key` as the most recently used entry.
    ///
    /// If the key is already linked it is moved instead.
    pub fn push_front(&mut self, key: K) {
        self.push_back(key);
        self.head = Some(key);
    }

    /// Insert `key` as the least recently used entry.
    pub fn push_back(&mut self, key: K) {
        if self.contains(key) {
            self.remove(key);
        }

        let Some(head) = self.head else {
            self.links.insert(key, Link { prev: key, next: key });
            self.head = Some(key);
            return;
        };

        let Some(tail) = self.back() else {
            return;
        };

        self.links.insert(key, Link { prev: tail, next: head });
        if let Some(link) = self.links.get_mut(tail) {
            link.next = key;
        }
        if let Some(link) = self.links.get_mut(head) {
            link.prev = key;
        }
    }

    /// Unlink `key`. Returns false if it was not in the list.
    pub fn remove(&mut self, key: K) -> bool {
        let Some(link) = self.links.remove(key) else {
            return false;
        };

        if link.next == key {
            // Last entry
            self.head = None;
            return true;
        }

        if let Some(prev) = self.links.get_mut(link.prev) {
            prev.next = link.next;
        }
        if let Some(next) = self.links.get_mut(link.next) {
            next.prev = link.prev;
        }
        if self.head == Some(key) {
            self.head = Some(link.next);
        }
        true
    }

    /// Move `key` to the head. No-op if it is not linked.
    pub fn move_to_front(&mut self, key: K) {
        if self.head == Some(key) || !self.contains(key) {
            return;
        }
        self.push_front(key);
    }

    /// The entry after `key`, wrapping from the tail back to the head.
    pub fn next(&self, key: K) -> Option<K> {
        self.links.get(key).map(|link| link.next)
    }

    /// The entry before `key`, wrapping from the head back to the tail.
    pub fn prev(&self, key: K) -> Option<K> {
        self.links.get(key).map(|link| link.prev)
    }

    /// Iterate from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        let mut cursor = self.head;
        (0..self.len()).map_while(move |_| {
            let key = cursor?;
            cursor = self.next(key);
            Some(key)
        })
    }
}
