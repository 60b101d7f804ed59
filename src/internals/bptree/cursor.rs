// The superblock is what actually knits a tree together from the parts
// we have, and has an important role to keep the system consistent.
//
// It owns every node through an arena, so all links (children, and the
// leaf chain's next/prev) are plain indices that we can check independently.
// Descent is recursive, and any split or underflow repair is applied as the
// recursion unwinds, so a parent always sees its children's final shape.

use super::constants::MIN_ORDER;
use super::iter::{Iter, KeyIter, ValueIter};
use super::node::*;
use super::states::*;
use crate::bptree::TreeData;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// The root of the tree, the arena that holds every node, and the shape
/// parameters of the tree.
pub(crate) struct SuperBlock<V> {
    nodes: Vec<Option<Node<V>>>,
    free: Vec<NodeId>,
    root: NodeId,
    order: usize,
    min_occupancy: usize,
    length: usize,
}

impl<V> SuperBlock<V> {
    pub(crate) fn new(order: usize) -> Self {
        let order = if order < MIN_ORDER {
            debug!(requested = order, clamped = MIN_ORDER, "order clamped");
            MIN_ORDER
        } else {
            order
        };
        let min_occupancy = order.div_ceil(2);
        debug!(order, min_occupancy, "new tree");
        SuperBlock {
            nodes: vec![Some(Node::Leaf(Leaf::new()))],
            free: Vec::new(),
            root: 0,
            order,
            min_occupancy,
            length: 0,
        }
    }

    // == arena

    fn alloc(&mut self, node: Node<V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                debug_assert!(self.nodes[id].is_none());
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node<V> {
        match self.nodes.get_mut(id).and_then(Option::take) {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => unreachable!("double release of node {}", id),
        }
    }

    #[inline(always)]
    pub(crate) fn node_ref(&self, id: NodeId) -> &Node<V> {
        match self.nodes.get(id) {
            Some(Some(node)) => node,
            _ => unreachable!("dangling node id {}", id),
        }
    }

    #[inline(always)]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        match self.nodes.get_mut(id) {
            Some(Some(node)) => node,
            _ => unreachable!("dangling node id {}", id),
        }
    }

    /// The max key of a subtree that hangs below a branch. Only the root may be
    /// empty, so anything else is a corrupt tree.
    fn subtree_max(&self, id: NodeId) -> i64 {
        match self.node_ref(id).max() {
            Some(k) => k,
            None => unreachable!("empty node {} below a branch", id),
        }
    }

    fn rekey_child(&mut self, parent: NodeId, idx: usize, child: NodeId) {
        let nkey = self.subtree_max(child);
        let bmut = branch_mut!(self, parent);
        debug_assert!(bmut.get_idx_unchecked(idx) == child);
        bmut.rekey_by_idx(idx, nkey);
    }

    // == read

    pub(crate) fn len(&self) -> usize {
        self.length
    }

    pub(crate) fn order(&self) -> usize {
        self.order
    }

    pub(crate) fn min_occupancy(&self) -> usize {
        self.min_occupancy
    }

    #[cfg(test)]
    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }

    fn locate_leaf(&self, k: i64) -> NodeId {
        let mut work_node = self.root;
        loop {
            match self.node_ref(work_node) {
                Node::Leaf(_) => return work_node,
                Node::Branch(bref) => {
                    work_node = bref.get_idx_unchecked(bref.locate_node(k));
                }
            }
        }
    }

    pub(crate) fn first_leaf(&self) -> NodeId {
        let mut work_node = self.root;
        while let Node::Branch(bref) = self.node_ref(work_node) {
            work_node = bref.min_node();
        }
        work_node
    }

    pub(crate) fn last_leaf(&self) -> NodeId {
        let mut work_node = self.root;
        while let Node::Branch(bref) = self.node_ref(work_node) {
            work_node = bref.max_node();
        }
        work_node
    }

    pub(crate) fn search(&self, k: i64) -> Option<&V> {
        let leaf = self.locate_leaf(k);
        leaf_ref!(self, leaf).get_ref(k)
    }

    pub(crate) fn contains_key(&self, k: i64) -> bool {
        self.search(k).is_some()
    }

    pub(crate) fn first_key_value(&self) -> Option<(&i64, &V)> {
        let leaf = self.first_leaf();
        leaf_ref!(self, leaf).get_kv_idx_checked(0)
    }

    pub(crate) fn last_key_value(&self) -> Option<(&i64, &V)> {
        let leaf = self.last_leaf();
        let lref = leaf_ref!(self, leaf);
        lref.get_kv_idx_checked(lref.count().checked_sub(1)?)
    }

    pub(crate) fn kv_iter(&self) -> Iter<'_, V> {
        Iter::new(self)
    }

    pub(crate) fn k_iter(&self) -> KeyIter<'_, V> {
        KeyIter::new(self)
    }

    pub(crate) fn v_iter(&self) -> ValueIter<'_, V> {
        ValueIter::new(self)
    }

    /// Export the tree as nested maps mirroring its shape.
    pub(crate) fn get_data(&self) -> TreeData<V>
    where
        V: Clone,
    {
        self.get_data_inner(self.root)
    }

    fn get_data_inner(&self, id: NodeId) -> TreeData<V>
    where
        V: Clone,
    {
        match self.node_ref(id) {
            Node::Leaf(lref) => TreeData::Leaf(
                lref.keys()
                    .iter()
                    .copied()
                    .zip(lref.values().iter().cloned())
                    .collect(),
            ),
            Node::Branch(bref) => {
                let children: BTreeMap<i64, TreeData<V>> = bref
                    .keys()
                    .iter()
                    .zip(bref.nodes().iter())
                    .map(|(k, child)| (*k, self.get_data_inner(*child)))
                    .collect();
                TreeData::Branch(children)
            }
        }
    }

    /// Write one line per level of the tree. Nodes are separated with `|`.
    pub(crate) fn fmt_levels(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut level = vec![self.root];
        while !level.is_empty() {
            let mut next_level = Vec::new();
            for (i, id) in level.iter().enumerate() {
                if i > 0 {
                    write!(f, " |")?;
                }
                match self.node_ref(*id) {
                    Node::Leaf(lref) => {
                        for k in lref.keys() {
                            write!(f, " {}", k)?;
                        }
                    }
                    Node::Branch(bref) => {
                        for k in bref.keys() {
                            write!(f, " {}", k)?;
                        }
                        next_level.extend_from_slice(bref.nodes());
                    }
                }
            }
            writeln!(f)?;
            level = next_level;
        }
        Ok(())
    }

    // == write

    pub(crate) fn clear(&mut self) {
        trace!(released = self.nodes.len(), "clear");
        self.nodes = vec![Some(Node::Leaf(Leaf::new()))];
        self.free.clear();
        self.root = 0;
        self.length = 0;
    }

    pub(crate) fn get_mut_ref(&mut self, k: i64) -> Option<&mut V> {
        let leaf = self.locate_leaf(k);
        leaf_mut!(self, leaf).get_mut_ref(k)
    }

    // Functions as insert_or_update
    pub(crate) fn insert(&mut self, k: i64, v: V) -> Option<V> {
        let root = self.root;
        let r = match self.insert_inner(root, k, v) {
            CRInsertState::Ok(res) => res,
            CRInsertState::Split(rnode) => {
                // The previous root had to split - make a new
                // root now and put it inplace.
                let nroot = self.new_branch(root, rnode);
                trace!(old_root = root, new_root = nroot, "root split");
                self.root = nroot;
                // As we split, there must NOT have been an existing
                // key to overwrite.
                None
            }
        };
        // If this is none, it means a new slot is now occupied.
        if r.is_none() {
            self.length += 1;
        }
        r
    }

    fn insert_inner(&mut self, node: NodeId, k: i64, v: V) -> CRInsertState<V> {
        let order = self.order;
        if self.node_ref(node).is_leaf() {
            let lmut = leaf_mut!(self, node);
            let res = lmut.insert_or_update(k, v);
            if lmut.count() > order {
                debug_assert!(res.is_none());
                CRInsertState::Split(self.split_leaf(node))
            } else {
                CRInsertState::Ok(res)
            }
        } else {
            let (anode_idx, anode) = {
                let bref = branch_ref!(self, node);
                let idx = bref.locate_node(k);
                (idx, bref.get_idx_unchecked(idx))
            };
            let state = self.insert_inner(anode, k, v);
            // Our child may have a new max, so update our routing key for it
            // before anything else looks at us.
            self.rekey_child(node, anode_idx, anode);
            match state {
                CRInsertState::Ok(res) => CRInsertState::Ok(res),
                CRInsertState::Split(rnode) => {
                    let rkey = self.subtree_max(rnode);
                    let bmut = branch_mut!(self, node);
                    bmut.add_child(rkey, rnode);
                    if bmut.count() > order {
                        CRInsertState::Split(self.split_branch(node))
                    } else {
                        CRInsertState::Ok(None)
                    }
                }
            }
        }
    }

    fn new_branch(&mut self, lnode: NodeId, rnode: NodeId) -> NodeId {
        let lkey = self.subtree_max(lnode);
        let rkey = self.subtree_max(rnode);
        self.alloc(Node::Branch(Branch::new(lkey, lnode, rkey, rnode)))
    }

    /// Split an overflowing leaf, and splice the new right half into the leaf
    /// chain directly after it.
    fn split_leaf(&mut self, lnode: NodeId) -> NodeId {
        let lmut = leaf_mut!(self, lnode);
        let mut right = lmut.split_off(split_point(lmut.count()));
        let old_next = lmut.next;
        right.prev = Some(lnode);
        right.next = old_next;
        let rnode = self.alloc(Node::Leaf(right));

        leaf_mut!(self, lnode).next = Some(rnode);
        if let Some(next) = old_next {
            leaf_mut!(self, next).prev = Some(rnode);
        }
        trace!(lnode, rnode, "leaf split");
        rnode
    }

    fn split_branch(&mut self, lnode: NodeId) -> NodeId {
        let bmut = branch_mut!(self, lnode);
        let right = bmut.split_off(split_point(bmut.count()));
        let rnode = self.alloc(Node::Branch(right));
        trace!(lnode, rnode, "branch split");
        rnode
    }

    pub(crate) fn remove(&mut self, k: i64) -> Option<V> {
        let root = self.root;
        let r = match self.remove_inner(root, k) {
            CRRemoveState::Ok(res) => res,
            // The root is allowed to be under occupied.
            CRRemoveState::Shrink(res) => res,
        };
        self.collapse_root();
        if r.is_some() {
            self.length -= 1;
        }
        r
    }

    fn remove_inner(&mut self, node: NodeId, k: i64) -> CRRemoveState<V> {
        let min_occupancy = self.min_occupancy;
        if self.node_ref(node).is_leaf() {
            let lmut = leaf_mut!(self, node);
            match lmut.remove(k) {
                // Nothing changed, so there is nothing to repair.
                None => CRRemoveState::Ok(None),
                Some(res) if lmut.count() < min_occupancy => CRRemoveState::Shrink(Some(res)),
                Some(res) => CRRemoveState::Ok(Some(res)),
            }
        } else {
            // Locate the node we need to work on and then react if it
            // requests a shrink.
            let (anode_idx, anode) = {
                let bref = branch_ref!(self, node);
                let idx = bref.locate_node(k);
                (idx, bref.get_idx_unchecked(idx))
            };
            match self.remove_inner(anode, k) {
                CRRemoveState::Ok(None) => CRRemoveState::Ok(None),
                CRRemoveState::Ok(res) => {
                    self.rekey_child(node, anode_idx, anode);
                    CRRemoveState::Ok(res)
                }
                CRRemoveState::Shrink(res) => {
                    self.rekey_child(node, anode_idx, anode);
                    self.rebalance(node, anode_idx);
                    if branch_ref!(self, node).count() < min_occupancy {
                        CRRemoveState::Shrink(res)
                    } else {
                        CRRemoveState::Ok(res)
                    }
                }
            }
        }
    }

    /// Decide how to repair the under occupied child at `idx` of `parent`.
    /// Prefer borrowing, as it leaves the shape of the tree alone.
    fn rebalance_decision(&self, parent: NodeId, idx: usize) -> RebalanceState {
        let bref = branch_ref!(self, parent);
        let count = self.node_ref(bref.get_idx_unchecked(idx)).count();
        let left = idx
            .checked_sub(1)
            .map(|lidx| self.node_ref(bref.get_idx_unchecked(lidx)).count());
        let right = bref
            .get_idx_checked(idx + 1)
            .map(|rnode| self.node_ref(rnode).count());

        match (left, right) {
            (Some(lcount), _) if lcount > self.min_occupancy => RebalanceState::BorrowLeft,
            (_, Some(rcount)) if rcount > self.min_occupancy => RebalanceState::BorrowRight,
            (Some(lcount), _) if lcount + count <= self.order => RebalanceState::MergeLeft,
            (_, Some(rcount)) if rcount + count <= self.order => RebalanceState::MergeRight,
            _ => unreachable!(
                "node at {} of branch {} can neither borrow nor merge",
                idx, parent
            ),
        }
    }

    fn rebalance(&mut self, parent: NodeId, idx: usize) {
        let decision = self.rebalance_decision(parent, idx);
        let (node, sibling) = {
            let bref = branch_ref!(self, parent);
            let sibling_idx = match decision {
                RebalanceState::BorrowLeft | RebalanceState::MergeLeft => idx - 1,
                RebalanceState::BorrowRight | RebalanceState::MergeRight => idx + 1,
            };
            (
                bref.get_idx_unchecked(idx),
                bref.get_idx_unchecked(sibling_idx),
            )
        };
        trace!(?decision, parent, node, sibling, "rebalance");

        match decision {
            RebalanceState::BorrowLeft => {
                self.take_from_l_to_r(sibling, node);
                self.rekey_child(parent, idx - 1, sibling);
                self.rekey_child(parent, idx, node);
            }
            RebalanceState::BorrowRight => {
                self.take_from_r_to_l(node, sibling);
                self.rekey_child(parent, idx, node);
                self.rekey_child(parent, idx + 1, sibling);
            }
            RebalanceState::MergeLeft => {
                self.merge(parent, sibling, node);
                self.rekey_child(parent, idx - 1, sibling);
            }
            RebalanceState::MergeRight => {
                self.merge(parent, node, sibling);
                self.rekey_child(parent, idx, node);
            }
        }
    }

    /// Move the last entry of `left` to the front of `right`.
    fn take_from_l_to_r(&mut self, left: NodeId, right: NodeId) {
        if self.node_ref(left).is_leaf() {
            let (k, v) = leaf_mut!(self, left).pop_last();
            leaf_mut!(self, right).push_front(k, v);
        } else {
            let (k, n) = branch_mut!(self, left).pop_last();
            branch_mut!(self, right).push_front(k, n);
        }
    }

    /// Move the first entry of `right` to the end of `left`.
    fn take_from_r_to_l(&mut self, left: NodeId, right: NodeId) {
        if self.node_ref(left).is_leaf() {
            let (k, v) = leaf_mut!(self, right).pop_first();
            leaf_mut!(self, left).push_back(k, v);
        } else {
            let (k, n) = branch_mut!(self, right).pop_first();
            branch_mut!(self, left).push_back(k, n);
        }
    }

    /// Absorb `right` into `left`, unlink `right` from the parent (and the leaf
    /// chain) and release it.
    fn merge(&mut self, parent: NodeId, left: NodeId, right: NodeId) {
        let removed = branch_mut!(self, parent).remove_child(right);
        debug_assert!(removed.is_some());
        match self.release(right) {
            Node::Leaf(mut rleaf) => {
                let lmut = leaf_mut!(self, left);
                lmut.merge(&mut rleaf);
                lmut.next = rleaf.next;
                if let Some(next) = rleaf.next {
                    leaf_mut!(self, next).prev = Some(left);
                }
            }
            Node::Branch(mut rbranch) => {
                branch_mut!(self, left).merge(&mut rbranch);
            }
        }
        trace!(left, right, "merged");
    }

    /// A branch root that is left with a single child is replaced by that child.
    fn collapse_root(&mut self) {
        loop {
            let root = self.root;
            let child = match self.node_ref(root) {
                Node::Branch(bref) if bref.count() == 1 => bref.min_node(),
                _ => break,
            };
            let _ = self.release(root);
            self.root = child;
            trace!(old_root = root, new_root = child, "root collapsed");
        }
    }

    // == verification

    /// Check every structural invariant of the tree. This is expensive, and
    /// is meant for tests and debugging.
    pub(crate) fn verify(&self) -> bool {
        let mut leaves = Vec::new();
        let mut reachable = 0;
        let mut leaf_depth = None;
        if !self.verify_inner(
            self.root,
            true,
            0,
            &mut leaf_depth,
            &mut leaves,
            &mut reachable,
        ) {
            return false;
        }

        // Nothing may be live in the arena that the tree can't reach.
        let live = self.nodes.iter().filter(|n| n.is_some()).count();
        if live != reachable || live + self.free.len() != self.nodes.len() {
            return false;
        }

        // The chain must visit the leaves in the same order as the tree does.
        let leaf_at = |id: NodeId| match self.nodes.get(id) {
            Some(Some(Node::Leaf(lref))) => Some(lref),
            _ => None,
        };
        let (first, last) = match (leaves.first(), leaves.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return false,
        };
        match (leaf_at(first), leaf_at(last)) {
            (Some(f), Some(l)) if f.prev.is_none() && l.next.is_none() => {}
            _ => return false,
        }
        for pair in leaves.windows(2) {
            match (leaf_at(pair[0]), leaf_at(pair[1])) {
                (Some(a), Some(b)) if a.next == Some(pair[1]) && b.prev == Some(pair[0]) => {}
                _ => return false,
            }
        }

        // Keys along the chain ascend strictly and account for every record.
        let mut count = 0;
        let mut prev_key: Option<i64> = None;
        for id in leaves {
            let Some(lref) = leaf_at(id) else {
                return false;
            };
            for k in lref.keys() {
                if prev_key.map(|p| p >= *k).unwrap_or(false) {
                    return false;
                }
                prev_key = Some(*k);
                count += 1;
            }
        }
        count == self.length
    }

    fn verify_inner(
        &self,
        id: NodeId,
        is_root: bool,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<NodeId>,
        reachable: &mut usize,
    ) -> bool {
        *reachable += 1;
        let node = match self.nodes.get(id) {
            Some(Some(node)) => node,
            _ => return false,
        };
        if !node.verify() || node.count() > self.order {
            return false;
        }
        if !is_root && node.count() < self.min_occupancy {
            return false;
        }
        match node {
            Node::Leaf(_) => {
                match *leaf_depth {
                    Some(d) if d != depth => return false,
                    Some(_) => {}
                    None => *leaf_depth = Some(depth),
                }
                leaves.push(id);
                true
            }
            Node::Branch(bref) => {
                if is_root && bref.count() < 2 {
                    return false;
                }
                for (k, child) in bref.keys().iter().zip(bref.nodes().iter()) {
                    // Compare the routing key against the real content, not
                    // against any other cache.
                    if self.recompute_max(*child) != Some(*k) {
                        return false;
                    }
                    if !self.verify_inner(*child, false, depth + 1, leaf_depth, leaves, reachable) {
                        return false;
                    }
                }
                true
            }
        }
    }

    fn recompute_max(&self, id: NodeId) -> Option<i64> {
        match self.nodes.get(id) {
            Some(Some(Node::Leaf(lref))) => lref.keys().iter().max().copied(),
            Some(Some(Node::Branch(bref))) => bref
                .nodes()
                .iter()
                .filter_map(|child| self.recompute_max(*child))
                .max(),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut work_leaf = Some(self.first_leaf());
        while let Some(id) = work_leaf {
            count += 1;
            work_leaf = leaf_ref!(self, id).next;
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn chain_keys(&self) -> Vec<i64> {
        self.k_iter().copied().collect()
    }

    #[cfg(test)]
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut work_node = self.root;
        while let Node::Branch(bref) = self.node_ref(work_node) {
            work_node = bref.min_node();
            height += 1;
        }
        height
    }
}

impl<V> Extend<(i64, V)> for SuperBlock<V> {
    fn extend<I: IntoIterator<Item = (i64, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(|(k, v)| {
            let _ = self.insert(k, v);
        });
    }
}

impl<V> fmt::Debug for SuperBlock<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "SuperBlock -> order: {} length: {} root: {}",
            self.order, self.length, self.root
        )?;
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(node) = node {
                writeln!(f, "  {} -> {:?}", id, node)?;
            }
        }
        Ok(())
    }
}

impl<V> fmt::Display for SuperBlock<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_levels(f)
    }
}
