//! bpindex - an in-memory ordered index
//!
//! This crate provides a [B+Tree](https://en.wikipedia.org/wiki/B%2B_tree) that maps
//! 64-bit integer keys to arbitrary values. It supports point lookup, upsert, deletion
//! and an ordered full scan through the chain of leaves. It is the kind of structure
//! that sits underneath the index layer of a storage engine or an embedded database.
//!
//! Every node lives in an arena owned by the tree, and nodes refer to each other by
//! stable indices. Leaves are doubly linked in key order so that ordered traversal
//! never has to revisit a branch.
//!
//! The tree is guarded by a single readers-writer lock. Lookups share the lock, while
//! writers are serialised, just like a `RwLock<BTreeMap>`. If you need to perform
//! several operations under the same lock, take a guard with [`bptree::BPTree::read`]
//! or [`bptree::BPTree::write`].
//!
//! ```
//! use bpindex::bptree::BPTree;
//!
//! let tree: BPTree<&str> = BPTree::new(4);
//! tree.set(10, "ten");
//! tree.set(20, "twenty");
//! assert_eq!(tree.get(10), Some("ten"));
//! tree.remove(10);
//! assert_eq!(tree.get(10), None);
//! ```
//!
//! # Features
//!
//! * `asynch` - an async variant of the tree guarded by a tokio lock
//! * `serde` - serialise the tree as a key/value map, and its shape export as nested maps
//! * `skinny` - use the minimum order by default, which is useful to test deep trees
//!
//! By default only `asynch` is enabled.

#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![allow(clippy::needless_lifetimes)]

// This is where the tree shape is maintained.
mod internals;
mod utils;

pub mod bptree;
