//! Iterators for the tree. These never touch a branch once positioned, they
//! walk the leaf chain from the leftmost leaf.

use super::cursor::SuperBlock;
use super::node::{Node, NodeId};

/// Iterator over `(&key, &value)` pairs in ascending key order.
pub struct Iter<'a, V> {
    sblock: &'a SuperBlock<V>,
    work_leaf: Option<NodeId>,
    idx: usize,
    remain: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(sblock: &'a SuperBlock<V>) -> Self {
        Iter {
            sblock,
            work_leaf: Some(sblock.first_leaf()),
            idx: 0,
            remain: sblock.len(),
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a i64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf_id = self.work_leaf?;
            let sblock = self.sblock;
            let lref = leaf_ref!(sblock, leaf_id);
            match lref.get_kv_idx_checked(self.idx) {
                Some(kv) => {
                    self.idx += 1;
                    self.remain = self.remain.saturating_sub(1);
                    return Some(kv);
                }
                None => {
                    // This leaf is exhausted, follow the chain.
                    self.work_leaf = lref.next;
                    self.idx = 0;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remain, Some(self.remain))
    }
}

/// Iterator over keys in ascending order.
pub struct KeyIter<'a, V> {
    iter: Iter<'a, V>,
}

impl<'a, V> KeyIter<'a, V> {
    pub(crate) fn new(sblock: &'a SuperBlock<V>) -> Self {
        KeyIter {
            iter: Iter::new(sblock),
        }
    }
}

impl<'a, V> Iterator for KeyIter<'a, V> {
    type Item = &'a i64;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

/// Iterator over values in ascending key order.
pub struct ValueIter<'a, V> {
    iter: Iter<'a, V>,
}

impl<'a, V> ValueIter<'a, V> {
    pub(crate) fn new(sblock: &'a SuperBlock<V>) -> Self {
        ValueIter {
            iter: Iter::new(sblock),
        }
    }
}

impl<'a, V> Iterator for ValueIter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
