//! Radix tree keyed by byte strings.
//!
//! # Responsibilities
//! - Store one value per distinct key
//! - Exact and longest-prefix lookup in O(key length)
//! - Ordered, depth-first traversal (full, prefix-rooted, path-rooted)
//!
//! # Design Decisions
//! - Edge labels live on the child node (`prefix`); the root label is empty
//! - Children are kept sorted by their first label byte, so siblings never
//!   share a leading byte and traversal order is lexicographic
//! - Deletion prunes empty leaves and coalesces single-child chains
//! - Length is a maintained counter, never computed by walking

use std::ops::ControlFlow;

/// A compressed prefix tree mapping byte-string keys to values of type `V`.
#[derive(Debug, Clone)]
pub struct RadixTree<V> {
    root: Node<V>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    prefix: Vec<u8>,
    value: Option<V>,
    children: Vec<Node<V>>,
}

impl<V> Node<V> {
    fn empty() -> Self {
        Self {
            prefix: Vec::new(),
            value: None,
            children: Vec::new(),
        }
    }

    fn leaf(prefix: &[u8], value: V) -> Self {
        Self {
            prefix: prefix.to_vec(),
            value: Some(value),
            children: Vec::new(),
        }
    }

    /// Position of the child whose label starts with `byte`, or the slot where
    /// such a child would be inserted.
    fn child_index(&self, byte: u8) -> Result<usize, usize> {
        self.children.binary_search_by_key(&byte, |child| child.prefix[0])
    }

    fn child(&self, byte: u8) -> Option<&Node<V>> {
        self.child_index(byte).ok().map(|idx| &self.children[idx])
    }

    /// Split this node's label at `at`. The node keeps `prefix[..at]` and the
    /// old contents move into a single child labelled `prefix[at..]`.
    fn split(&mut self, at: usize) {
        let suffix = self.prefix.split_off(at);
        let lower = Node {
            prefix: suffix,
            value: self.value.take(),
            children: std::mem::take(&mut self.children),
        };
        self.children.push(lower);
    }

    /// Absorb the only child into this (value-less) node.
    fn merge_child(&mut self) {
        if let Some(child) = self.children.pop() {
            self.prefix.extend_from_slice(&child.prefix);
            self.value = child.value;
            self.children = child.children;
        }
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RadixTree<V> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            root: Node::empty(),
            len: 0,
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` at `key`, returning the value it replaced, if any.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: V) -> Option<V> {
        let mut search = key.as_ref();
        let mut node = &mut self.root;

        loop {
            if search.is_empty() {
                let old = node.value.replace(value);
                if old.is_none() {
                    self.len += 1;
                }
                return old;
            }

            match node.child_index(search[0]) {
                Err(slot) => {
                    node.children.insert(slot, Node::leaf(search, value));
                    self.len += 1;
                    return None;
                }
                Ok(idx) => {
                    let child = &mut node.children[idx];
                    let common = common_prefix_len(search, &child.prefix);
                    if common < child.prefix.len() {
                        child.split(common);
                    }
                    search = &search[common..];
                    node = child;
                }
            }
        }
    }

    /// Exact lookup.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        let mut search = key.as_ref();
        let mut node = &self.root;

        loop {
            if search.is_empty() {
                return node.value.as_ref();
            }
            let child = node.child(search[0])?;
            search = search.strip_prefix(child.prefix.as_slice())?;
            node = child;
        }
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.get(key).is_some()
    }

    /// Find the longest inserted key that is a prefix of `key`.
    ///
    /// The matched key is returned as a sub-slice of the input.
    pub fn longest_prefix<'k>(&self, key: &'k [u8]) -> Option<(&'k [u8], &V)> {
        let mut search = key;
        let mut node = &self.root;
        let mut best = node.value.as_ref().map(|v| (0, v));

        while !search.is_empty() {
            let Some(child) = node.child(search[0]) else {
                break;
            };
            let Some(rest) = search.strip_prefix(child.prefix.as_slice()) else {
                break;
            };
            search = rest;
            node = child;
            if let Some(value) = &node.value {
                best = Some((key.len() - search.len(), value));
            }
        }

        best.map(|(n, value)| (&key[..n], value))
    }

    /// Remove the value stored at `key`.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<V> {
        let removed = Self::remove_from(&mut self.root, key.as_ref());
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn remove_from(node: &mut Node<V>, search: &[u8]) -> Option<V> {
        if search.is_empty() {
            return node.value.take();
        }

        let idx = node.child_index(search[0]).ok()?;
        let child = &mut node.children[idx];
        let rest = search.strip_prefix(child.prefix.as_slice())?;
        let removed = Self::remove_from(child, rest)?;

        if child.value.is_none() {
            match child.children.len() {
                0 => {
                    node.children.remove(idx);
                }
                1 => child.merge_child(),
                _ => {}
            }
        }
        Some(removed)
    }

    /// Visit every key/value pair, depth-first in lexicographic order.
    ///
    /// Returning `ControlFlow::Break` from the visitor stops the walk.
    pub fn walk<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&[u8], &'a V) -> ControlFlow<()>,
    {
        let mut key = Vec::new();
        let _ = walk_node(&self.root, &mut key, &mut visit);
    }

    /// Visit every key that starts with `prefix`.
    pub fn walk_prefix<'a, F>(&'a self, prefix: impl AsRef<[u8]>, mut visit: F)
    where
        F: FnMut(&[u8], &'a V) -> ControlFlow<()>,
    {
        let mut search = prefix.as_ref();
        let mut node = &self.root;
        let mut consumed = Vec::new();

        loop {
            if search.is_empty() {
                consumed.truncate(consumed.len() - node.prefix.len());
                let _ = walk_node(node, &mut consumed, &mut visit);
                return;
            }
            let Some(child) = node.child(search[0]) else {
                return;
            };
            if child.prefix.starts_with(search) {
                let _ = walk_node(child, &mut consumed, &mut visit);
                return;
            }
            let Some(rest) = search.strip_prefix(child.prefix.as_slice()) else {
                return;
            };
            consumed.extend_from_slice(&child.prefix);
            search = rest;
            node = child;
        }
    }

    /// Visit every stored key that is a prefix of `path`, from the root down.
    pub fn walk_path<'a, F>(&'a self, path: impl AsRef<[u8]>, mut visit: F)
    where
        F: FnMut(&[u8], &'a V) -> ControlFlow<()>,
    {
        let path = path.as_ref();
        let mut search = path;
        let mut node = &self.root;

        loop {
            if let Some(value) = &node.value {
                let depth = path.len() - search.len();
                if visit(&path[..depth], value).is_break() {
                    return;
                }
            }
            if search.is_empty() {
                return;
            }
            let Some(child) = node.child(search[0]) else {
                return;
            };
            let Some(rest) = search.strip_prefix(child.prefix.as_slice()) else {
                return;
            };
            search = rest;
            node = child;
        }
    }

    /// Lexicographically smallest key and its value.
    pub fn min(&self) -> Option<(Vec<u8>, &V)> {
        let mut key = Vec::new();
        let mut node = &self.root;
        loop {
            key.extend_from_slice(&node.prefix);
            if let Some(value) = &node.value {
                return Some((key, value));
            }
            node = node.children.first()?;
        }
    }

    /// Lexicographically largest key and its value.
    pub fn max(&self) -> Option<(Vec<u8>, &V)> {
        let mut key = Vec::new();
        let mut node = &self.root;
        loop {
            key.extend_from_slice(&node.prefix);
            match node.children.last() {
                Some(child) => node = child,
                None => return node.value.as_ref().map(|value| (key, value)),
            }
        }
    }
}

fn walk_node<'a, V, F>(node: &'a Node<V>, key: &mut Vec<u8>, visit: &mut F) -> ControlFlow<()>
where
    F: FnMut(&[u8], &'a V) -> ControlFlow<()>,
{
    key.extend_from_slice(&node.prefix);
    if let Some(value) = &node.value {
        visit(key.as_slice(), value)?;
    }
    for child in &node.children {
        walk_node(child, key, visit)?;
    }
    key.truncate(key.len() - node.prefix.len());
    ControlFlow::Continue(())
}
