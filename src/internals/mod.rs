//! This module contains the internals of how the tree is laid out and knitted
//! together. Nothing here is exposed directly, the public surface lives in
//! [crate::bptree], which wraps these types in a lock.

pub(crate) mod bptree;
