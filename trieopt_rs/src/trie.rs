//! Prefix index over long-option names.
//!
//! [`TrieMap`] stores one node per character. A node is *present* (holds a
//! value) only when a key ending there was explicitly inserted, so `"ver"` is
//! never a hit just because `"verbose"` exists. On top of exact lookups the
//! map answers the question the scanner actually cares about: "is this prefix
//! an abbreviation of exactly one key?".
//!
//! Structural changes (new key, removal, clear) bump a generation counter.
//! [`Traversal`] is a cursor that does not borrow the map; it remembers the
//! generation it started from and refuses to continue once somebody else has
//! changed the structure underneath it.
//!
//! ```text
//! keys: "a", "abc", "abcde"
//!
//! (root)--a--(A)--b--()--c--(ABC)--d--()--e--(ABCDE)
//! ```

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Errors raised by detached traversals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrieError {
    #[error("trie was structurally modified during traversal (expected generation {expected}, found {found})")]
    ConcurrentModification { expected: u64, found: u64 },

    #[error("traversal has no current entry to remove")]
    NoCurrentEntry,
}

#[derive(Clone)]
struct TrieNode<V> {
    children: BTreeMap<char, TrieNode<V>>,
    value: Option<V>,
}

impl<V> TrieNode<V> {
    fn new() -> Self {
        Self {
            children: BTreeMap::new(),
            value: None,
        }
    }

    fn is_dangling(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Remove the value at `key` below this node, pruning every node on the
    /// way back up that is left without data or children.
    fn remove_path(&mut self, key: &[char]) -> Option<V> {
        match key.split_first() {
            None => self.value.take(),
            Some((c, rest)) => {
                let child = self.children.get_mut(c)?;
                let removed = child.remove_path(rest)?;
                if child.is_dangling() {
                    self.children.remove(c);
                }
                Some(removed)
            }
        }
    }

    #[cfg(test)]
    fn count_nodes(&self) -> usize {
        1 + self
            .children
            .values()
            .map(TrieNode::count_nodes)
            .sum::<usize>()
    }
}

/// Character trie keyed by `&str`.
#[derive(Clone)]
pub struct TrieMap<V> {
    root: TrieNode<V>,
    len: usize,
    generation: u64,
}

impl<V> Default for TrieMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TrieMap<V> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            len: 0,
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counter bumped on every structural modification.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Insert `value` under `key`, returning the value it replaced.
    ///
    /// Replacing the value of an existing key does not count as a structural
    /// modification and leaves live traversals valid.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_insert_with(TrieNode::new);
        }
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
            self.generation += 1;
        }
        previous
    }

    fn find_node(&self, key: &str) -> Option<&TrieNode<V>> {
        let mut node = &self.root;
        for c in key.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    fn find_node_mut(&mut self, key: &str) -> Option<&mut TrieNode<V>> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.get_mut(&c)?;
        }
        Some(node)
    }

    /// Exact lookup.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.find_node(key).and_then(|node| node.value.as_ref())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.find_node_mut(key).and_then(|node| node.value.as_mut())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// True when at least one present key starts with `prefix`.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.find_node(prefix)
            .is_some_and(|node| !node.is_dangling())
    }

    /// Resolve `prefix` to a single present key.
    ///
    /// An exact key wins even when longer keys extend it. Otherwise the
    /// prefix must start exactly one key; the walk stops at the second hit.
    pub fn get_unambiguous(&self, prefix: &str) -> Option<(String, &V)> {
        if let Some(value) = self.get(prefix) {
            return Some((prefix.to_string(), value));
        }
        let mut traversal = self.traversal_from(prefix);
        let first = traversal.next(self).ok().flatten()?;
        match traversal.next(self) {
            Ok(None) => Some(first),
            _ => None,
        }
    }

    /// Every present key starting with `prefix`, in lexicographic order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys = Vec::new();
        let mut traversal = self.traversal_from(prefix);
        while let Ok(Some((key, _))) = traversal.next(self) {
            keys.push(key);
        }
        keys
    }

    /// Remove `key`, pruning branches that no longer lead anywhere.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let path: Vec<char> = key.chars().collect();
        let removed = self.root.remove_path(&path)?;
        self.len -= 1;
        self.generation += 1;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.root = TrieNode::new();
        self.len = 0;
        self.generation += 1;
    }

    /// Borrowing iterator over `(key, value)` in lexicographic key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: vec![(String::new(), &self.root)],
        }
    }

    /// Detached cursor over every entry.
    pub fn traversal(&self) -> Traversal {
        self.traversal_from("")
    }

    /// Detached cursor over the entries whose key starts with `prefix`.
    pub fn traversal_from(&self, prefix: &str) -> Traversal {
        let stack = if self.find_node(prefix).is_some() {
            vec![prefix.to_string()]
        } else {
            Vec::new()
        };
        Traversal {
            expected_generation: self.generation,
            stack,
            current: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn node_count(&self) -> usize {
        self.root.count_nodes()
    }
}

impl<V: fmt::Debug> fmt::Debug for TrieMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: AsRef<str>, V> FromIterator<(K, V)> for TrieMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TrieMap::new();
        map.extend(iter);
        map
    }
}

impl<K: AsRef<str>, V> Extend<(K, V)> for TrieMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key.as_ref(), value);
        }
    }
}

/// Borrowing depth-first iterator returned by [`TrieMap::iter`].
pub struct Iter<'a, V> {
    stack: Vec<(String, &'a TrieNode<V>)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (String, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((key, node)) = self.stack.pop() {
            for (c, child) in node.children.iter().rev() {
                let mut child_key = key.clone();
                child_key.push(*c);
                self.stack.push((child_key, child));
            }
            if let Some(value) = node.value.as_ref() {
                return Some((key, value));
            }
        }
        None
    }
}

/// Fail-fast cursor that walks a [`TrieMap`] without borrowing it.
///
/// The cursor only stores keys, so the map can be handed out mutably between
/// steps. Any structural change not made through
/// [`Traversal::remove_current`] makes the next step fail with
/// [`TrieError::ConcurrentModification`].
#[derive(Debug, Clone)]
pub struct Traversal {
    expected_generation: u64,
    stack: Vec<String>,
    current: Option<String>,
}

impl Traversal {
    fn check<V>(&self, map: &TrieMap<V>) -> Result<(), TrieError> {
        if map.generation != self.expected_generation {
            return Err(TrieError::ConcurrentModification {
                expected: self.expected_generation,
                found: map.generation,
            });
        }
        Ok(())
    }

    /// Advance to the next present entry.
    pub fn next<'m, V>(
        &mut self,
        map: &'m TrieMap<V>,
    ) -> Result<Option<(String, &'m V)>, TrieError> {
        self.check(map)?;
        while let Some(key) = self.stack.pop() {
            let Some(node) = map.find_node(&key) else {
                continue;
            };
            for c in node.children.keys().rev() {
                let mut child_key = key.clone();
                child_key.push(*c);
                self.stack.push(child_key);
            }
            if let Some(value) = node.value.as_ref() {
                self.current = Some(key.clone());
                return Ok(Some((key, value)));
            }
        }
        self.current = None;
        Ok(None)
    }

    /// Remove the entry returned by the last call to [`Traversal::next`].
    pub fn remove_current<V>(&mut self, map: &mut TrieMap<V>) -> Result<V, TrieError> {
        self.check(map)?;
        let key = self.current.take().ok_or(TrieError::NoCurrentEntry)?;
        let removed = map.remove(&key).ok_or(TrieError::NoCurrentEntry)?;
        self.expected_generation = map.generation;
        Ok(removed)
    }
}

// ============================================================================
// Tests
// ============================================================================
