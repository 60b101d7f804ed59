use super::constants::INLINE_CAPACITY;
use crate::utils::slice_search_linear;
use smallvec::SmallVec;
use std::fmt::{self, Debug, Error};

/// The index of a node within the arena of its tree.
pub(crate) type NodeId = usize;

pub(crate) struct Leaf<V> {
    key: SmallVec<[i64; INLINE_CAPACITY]>,
    values: SmallVec<[V; INLINE_CAPACITY]>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

/// A branch holds no records, only children. `key[idx]` caches the max key of
/// the subtree at `nodes[idx]` and is what we route on during descent.
pub(crate) struct Branch {
    key: SmallVec<[i64; INLINE_CAPACITY]>,
    nodes: SmallVec<[NodeId; INLINE_CAPACITY]>,
}

pub(crate) enum Node<V> {
    Leaf(Leaf<V>),
    Branch(Branch),
}

/// Where to cut an overflowing node of `count` entries. Both halves end up
/// holding at least `ceil(order / 2)` entries, as `count` is `order + 1`.
#[inline(always)]
pub(crate) fn split_point(count: usize) -> usize {
    count / 2
}

impl<V> Node<V> {
    #[inline(always)]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    #[allow(unused)]
    #[inline(always)]
    pub(crate) fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }

    /// Records in a leaf, or children in a branch.
    #[inline(always)]
    pub(crate) fn count(&self) -> usize {
        match self {
            Node::Leaf(lref) => lref.count(),
            Node::Branch(bref) => bref.count(),
        }
    }

    #[inline(always)]
    pub(crate) fn max(&self) -> Option<i64> {
        match self {
            Node::Leaf(lref) => lref.max(),
            Node::Branch(bref) => bref.max(),
        }
    }

    #[inline(always)]
    pub(crate) fn verify(&self) -> bool {
        match self {
            Node::Leaf(lref) => lref.verify(),
            Node::Branch(bref) => bref.verify(),
        }
    }
}

impl<V> Debug for Node<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), Error> {
        match self {
            Node::Leaf(lref) => lref.fmt(f),
            Node::Branch(bref) => bref.fmt(f),
        }
    }
}

impl<V> Leaf<V> {
    pub(crate) fn new() -> Self {
        Leaf {
            key: SmallVec::new(),
            values: SmallVec::new(),
            prev: None,
            next: None,
        }
    }

    #[inline(always)]
    pub(crate) fn count(&self) -> usize {
        self.key.len()
    }

    #[inline(always)]
    pub(crate) fn min(&self) -> Option<i64> {
        self.key.first().copied()
    }

    /// The max key of a leaf is its last record. `None` means the leaf has no content.
    #[inline(always)]
    pub(crate) fn max(&self) -> Option<i64> {
        self.key.last().copied()
    }

    #[inline(always)]
    pub(crate) fn keys(&self) -> &[i64] {
        &self.key
    }

    #[inline(always)]
    pub(crate) fn values(&self) -> &[V] {
        &self.values
    }

    #[inline(always)]
    pub(crate) fn locate(&self, k: i64) -> Result<usize, usize> {
        slice_search_linear(&self.key, &k)
    }

    pub(crate) fn get_ref(&self, k: i64) -> Option<&V> {
        self.locate(k).ok().map(|idx| &self.values[idx])
    }

    pub(crate) fn get_mut_ref(&mut self, k: i64) -> Option<&mut V> {
        match self.locate(k) {
            Ok(idx) => Some(&mut self.values[idx]),
            Err(_) => None,
        }
    }

    pub(crate) fn get_kv_idx_checked(&self, idx: usize) -> Option<(&i64, &V)> {
        match (self.key.get(idx), self.values.get(idx)) {
            (Some(k), Some(v)) => Some((k, v)),
            _ => None,
        }
    }

    /// Insert the record so the leaf stays in ascending key order. If the key
    /// already exists the value is replaced in place and the prior value returned.
    pub(crate) fn insert_or_update(&mut self, k: i64, v: V) -> Option<V> {
        match self.locate(k) {
            Ok(idx) => Some(std::mem::replace(&mut self.values[idx], v)),
            Err(idx) => {
                self.key.insert(idx, k);
                self.values.insert(idx, v);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, k: i64) -> Option<V> {
        match self.locate(k) {
            Ok(idx) => {
                let _pk = self.key.remove(idx);
                Some(self.values.remove(idx))
            }
            Err(_) => None,
        }
    }

    /// Keep `[0, at)` and return a new unlinked leaf holding `[at, count)`.
    pub(crate) fn split_off(&mut self, at: usize) -> Self {
        debug_assert!(at > 0 && at < self.count());
        Leaf {
            key: self.key.drain(at..).collect(),
            values: self.values.drain(at..).collect(),
            prev: None,
            next: None,
        }
    }

    pub(crate) fn pop_first(&mut self) -> (i64, V) {
        if self.key.is_empty() {
            unreachable!("pop_first on an empty leaf");
        }
        (self.key.remove(0), self.values.remove(0))
    }

    pub(crate) fn pop_last(&mut self) -> (i64, V) {
        match (self.key.pop(), self.values.pop()) {
            (Some(k), Some(v)) => (k, v),
            _ => unreachable!("pop_last on an empty leaf"),
        }
    }

    pub(crate) fn push_front(&mut self, k: i64, v: V) {
        debug_assert!(self.min().map(|m| k < m).unwrap_or(true));
        self.key.insert(0, k);
        self.values.insert(0, v);
    }

    pub(crate) fn push_back(&mut self, k: i64, v: V) {
        debug_assert!(self.max().map(|m| k > m).unwrap_or(true));
        self.key.push(k);
        self.values.push(v);
    }

    /// Move every record of `right` onto our tail. `right` must be our successor.
    pub(crate) fn merge(&mut self, right: &mut Self) {
        debug_assert!(match (self.max(), right.min()) {
            (Some(l), Some(r)) => l < r,
            _ => true,
        });
        self.key.extend(right.key.drain(..));
        self.values.extend(right.values.drain(..));
    }

    pub(crate) fn verify(&self) -> bool {
        if self.key.len() != self.values.len() {
            return false;
        }
        self.key.windows(2).all(|w| w[0] < w[1])
    }
}

impl<V> Debug for Leaf<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), Error> {
        write!(f, "Leaf -> {}", self.count())?;
        write!(f, "  \\-> [ ")?;
        for k in self.key.iter() {
            write!(f, "{:?}, ", k)?;
        }
        write!(f, " ]")
    }
}

impl Branch {
    pub(crate) fn new(lkey: i64, l: NodeId, rkey: i64, r: NodeId) -> Self {
        debug_assert!(lkey < rkey);
        let mut key = SmallVec::new();
        key.push(lkey);
        key.push(rkey);
        let mut nodes = SmallVec::new();
        nodes.push(l);
        nodes.push(r);
        Branch { key, nodes }
    }

    #[inline(always)]
    pub(crate) fn count(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub(crate) fn max(&self) -> Option<i64> {
        self.key.last().copied()
    }

    #[inline(always)]
    pub(crate) fn keys(&self) -> &[i64] {
        &self.key
    }

    #[inline(always)]
    pub(crate) fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Pick the first child whose max key is at least `k`. Keys beyond
    /// everything in the tree route to the last child.
    #[inline(always)]
    pub(crate) fn locate_node(&self, k: i64) -> usize {
        debug_assert!(self.count() > 0);
        match slice_search_linear(&self.key, &k) {
            Ok(idx) => idx,
            Err(idx) => idx.min(self.count() - 1),
        }
    }

    #[inline(always)]
    pub(crate) fn get_idx_unchecked(&self, idx: usize) -> NodeId {
        debug_assert!(idx < self.count());
        self.nodes[idx]
    }

    #[inline(always)]
    pub(crate) fn get_idx_checked(&self, idx: usize) -> Option<NodeId> {
        self.nodes.get(idx).copied()
    }

    #[inline(always)]
    pub(crate) fn min_node(&self) -> NodeId {
        self.nodes[0]
    }

    #[inline(always)]
    pub(crate) fn max_node(&self) -> NodeId {
        self.nodes[self.count() - 1]
    }

    /// Add a child, ordered by its max key. Equal keys go after the existing
    /// ones so that a fresh right sibling lands to the right.
    pub(crate) fn add_child(&mut self, nkey: i64, node: NodeId) {
        let idx = self
            .key
            .iter()
            .position(|k| *k > nkey)
            .unwrap_or(self.key.len());
        self.key.insert(idx, nkey);
        self.nodes.insert(idx, node);
    }

    /// Remove a child by identity. Returns the index it held.
    pub(crate) fn remove_child(&mut self, node: NodeId) -> Option<usize> {
        let idx = self.nodes.iter().position(|n| *n == node)?;
        let _ = self.remove_by_idx(idx);
        Some(idx)
    }

    pub(crate) fn remove_by_idx(&mut self, idx: usize) -> (i64, NodeId) {
        (self.key.remove(idx), self.nodes.remove(idx))
    }

    #[inline(always)]
    pub(crate) fn rekey_by_idx(&mut self, idx: usize, nkey: i64) {
        debug_assert!(idx < self.count());
        self.key[idx] = nkey;
    }

    /// Keep children `[0, at)` and return a new branch holding `[at, count)`.
    pub(crate) fn split_off(&mut self, at: usize) -> Self {
        debug_assert!(at > 0 && at < self.count());
        Branch {
            key: self.key.drain(at..).collect(),
            nodes: self.nodes.drain(at..).collect(),
        }
    }

    pub(crate) fn pop_first(&mut self) -> (i64, NodeId) {
        if self.nodes.is_empty() {
            unreachable!("pop_first on an empty branch");
        }
        self.remove_by_idx(0)
    }

    pub(crate) fn pop_last(&mut self) -> (i64, NodeId) {
        match (self.key.pop(), self.nodes.pop()) {
            (Some(k), Some(n)) => (k, n),
            _ => unreachable!("pop_last on an empty branch"),
        }
    }

    pub(crate) fn push_front(&mut self, nkey: i64, node: NodeId) {
        debug_assert!(self.key.first().map(|m| nkey < *m).unwrap_or(true));
        self.key.insert(0, nkey);
        self.nodes.insert(0, node);
    }

    pub(crate) fn push_back(&mut self, nkey: i64, node: NodeId) {
        debug_assert!(self.max().map(|m| nkey > m).unwrap_or(true));
        self.key.push(nkey);
        self.nodes.push(node);
    }

    pub(crate) fn merge(&mut self, right: &mut Self) {
        debug_assert!(match (self.max(), right.key.first()) {
            (Some(l), Some(r)) => l < *r,
            _ => true,
        });
        self.key.extend(right.key.drain(..));
        self.nodes.extend(right.nodes.drain(..));
    }

    pub(crate) fn verify(&self) -> bool {
        if self.key.len() != self.nodes.len() || self.nodes.is_empty() {
            return false;
        }
        // Sibling subtrees never overlap, so the cached maxima are strict.
        self.key.windows(2).all(|w| w[0] < w[1])
    }
}

impl Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), Error> {
        write!(f, "Branch -> {}", self.count())?;
        write!(f, "  \\-> [ ")?;
        for (k, n) in self.key.iter().zip(self.nodes.iter()) {
            write!(f, "{:?}@{}, ", k, n)?;
        }
        write!(f, " ]")
    }
}
