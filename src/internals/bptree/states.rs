use super::node::NodeId;

#[derive(Debug)]
pub(crate) enum CRInsertState<V> {
    // The insert completed, and this node is still within capacity. Contains the
    // prior value if the key existed.
    Ok(Option<V>),
    // This node overflowed and was split. Contains the new right sibling that the
    // parent must adopt.
    Split(NodeId),
}

#[derive(Debug)]
pub(crate) enum CRRemoveState<V> {
    // The remove completed, and this node still meets minimum occupancy.
    Ok(Option<V>),
    // We removed the value, but now fall under minimum occupancy, so the parent
    // must borrow for us or merge us away.
    Shrink(Option<V>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RebalanceState {
    BorrowLeft,
    BorrowRight,
    MergeLeft,
    MergeRight,
}
