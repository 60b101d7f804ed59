/// The smallest order a tree may be built with. Smaller requests are clamped
/// up to this value.
pub const MIN_ORDER: usize = 3;

/// The order used by [crate::bptree::BPTree::default].
#[cfg(feature = "skinny")]
pub const DEFAULT_ORDER: usize = MIN_ORDER;
/// The order used by [crate::bptree::BPTree::default].
#[cfg(not(feature = "skinny"))]
pub const DEFAULT_ORDER: usize = 7;

// Nodes at the default order hold one extra entry just before they split, so
// they can stay inline. Wider trees spill to the heap.
pub(crate) const INLINE_CAPACITY: usize = DEFAULT_ORDER + 1;
