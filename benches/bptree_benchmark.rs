// The benchmarks aim to only measure times of the operations in their names.
// That's why all use Bencher::iter_batched which enables non-benchmarked
// preparation before running the measured function.
// Insert, remove and search have benchmarks with empty values and with custom
// structs of 42 64-bit integers, and each is run at a narrow and a wide order
// so that the cost of deeper trees against wider nodes can be compared.
// The counts of inserted/removed/searched elements are chosen at random from
// constant ranges in an attempt to avoid a single count performing better
// because of specific HW features of computers the code is benchmarked with.

extern crate bpindex;
extern crate criterion;
extern crate rand;

use bpindex::bptree::*;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::seq::SliceRandom;
use rand::Rng;

// ranges of counts for different benchmarks (MINs are inclusive, MAXes exclusive):
const INSERT_COUNT_MIN: usize = 1200;
const INSERT_COUNT_MAX: usize = 1400;
const INSERT_COUNT_FOR_REMOVE_MIN: usize = 3400;
const INSERT_COUNT_FOR_REMOVE_MAX: usize = 3600;
const REMOVE_COUNT_MIN: usize = 1200;
const REMOVE_COUNT_MAX: usize = 1400;
const INSERT_COUNT_FOR_SEARCH_MIN: usize = 1200;
const INSERT_COUNT_FOR_SEARCH_MAX: usize = 1400;
const SEARCH_COUNT_MIN: usize = 1200;
const SEARCH_COUNT_MAX: usize = 1400;
// In the search benches, we randomly search for elements of a range of SEARCH_SIZE_NUMERATOR / SEARCH_SIZE_DENOMINATOR
// times the number of elements contained.
const SEARCH_SIZE_NUMERATOR: usize = 4;
const SEARCH_SIZE_DENOMINATOR: usize = 3;

const NARROW: usize = 4;
const WIDE: usize = 32;

pub fn insert_empty_value(c: &mut Criterion) {
    for order in [NARROW, WIDE] {
        c.bench_function(&format!("insert_empty_value_order_{}", order), |b| {
            b.iter_batched(
                || prepare_insert(order, ()),
                |(tree, list)| insert_vec(&tree, list),
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn insert_struct_value(c: &mut Criterion) {
    for order in [NARROW, WIDE] {
        c.bench_function(&format!("insert_struct_value_order_{}", order), |b| {
            b.iter_batched(
                || prepare_insert(order, Struct::default()),
                |(tree, list)| insert_vec(&tree, list),
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn remove_empty_value(c: &mut Criterion) {
    for order in [NARROW, WIDE] {
        c.bench_function(&format!("remove_empty_value_order_{}", order), |b| {
            b.iter_batched(
                || prepare_remove(order, ()),
                |(ref tree, ref list)| remove_vec(tree, list),
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn remove_struct_value(c: &mut Criterion) {
    for order in [NARROW, WIDE] {
        c.bench_function(&format!("remove_struct_value_order_{}", order), |b| {
            b.iter_batched(
                || prepare_remove(order, Struct::default()),
                |(ref tree, ref list)| remove_vec(tree, list),
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn search_empty_value(c: &mut Criterion) {
    for order in [NARROW, WIDE] {
        c.bench_function(&format!("search_empty_value_order_{}", order), |b| {
            b.iter_batched(
                || prepare_search(order, ()),
                |(ref tree, ref list)| search_vec(tree, list),
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn search_struct_value(c: &mut Criterion) {
    for order in [NARROW, WIDE] {
        c.bench_function(&format!("search_struct_value_order_{}", order), |b| {
            b.iter_batched(
                || prepare_search(order, Struct::default()),
                |(ref tree, ref list)| search_vec(tree, list),
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn scan(c: &mut Criterion) {
    for order in [NARROW, WIDE] {
        c.bench_function(&format!("scan_order_{}", order), |b| {
            b.iter_batched(
                || prepare_search(order, 0u64),
                |(ref tree, _)| scan_vec(tree),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(insert, insert_empty_value, insert_struct_value);
criterion_group!(remove, remove_empty_value, remove_struct_value);
criterion_group!(search, search_empty_value, search_struct_value, scan);
criterion_main!(insert, remove, search);

// Utility functions:

fn insert_vec<V>(tree: &BPTree<V>, list: Vec<(i64, V)>) {
    let mut write = tree.write();
    for (key, val) in list.into_iter() {
        write.insert(key, val);
    }
}

fn remove_vec<V>(tree: &BPTree<V>, list: &[i64]) {
    let mut write = tree.write();
    for i in list.iter() {
        write.remove(*i);
    }
}

fn scan_vec(tree: &BPTree<u64>) -> u64 {
    let read = tree.read();
    let total = read.values().copied().sum();
    total
}

fn search_vec<V>(tree: &BPTree<V>, list: &[i64]) {
    let read = tree.read();
    for i in list.iter() {
        read.get(black_box(*i));
    }
}

#[derive(Default, Clone)]
#[allow(dead_code)]
struct Struct {
    var1: i64,
    var2: i64,
    var3: i64,
    var4: i64,
    var5: i64,
    var6: i64,
    var7: i64,
    var8: i64,
    var9: i64,
    var10: i64,
    var11: i64,
    var12: i64,
    var13: i64,
    var14: i64,
    var15: i64,
    var16: i64,
    var17: i64,
    var18: i64,
    var19: i64,
    var20: i64,
    var21: i64,
    var22: i64,
    var23: i64,
    var24: i64,
    var25: i64,
    var26: i64,
    var27: i64,
    var28: i64,
    var29: i64,
    var30: i64,
    var31: i64,
    var32: i64,
    var33: i64,
    var34: i64,
    var35: i64,
    var36: i64,
    var37: i64,
    var38: i64,
    var39: i64,
    var40: i64,
    var41: i64,
    var42: i64,
}

fn prepare_insert<V: Clone>(order: usize, value: V) -> (BPTree<V>, Vec<(i64, V)>) {
    let mut rng = rand::rng();
    let count = rng.random_range(INSERT_COUNT_MIN..INSERT_COUNT_MAX);
    let mut list = Vec::with_capacity(count);
    for _ in 0..count {
        list.push((
            rng.random_range(0..(INSERT_COUNT_MAX << 8) as i64),
            value.clone(),
        ));
    }
    (BPTree::new(order), list)
}

/// Prepares a remove benchmark with values in the tree being clones of the 'value' parameter
fn prepare_remove<V: Clone>(order: usize, value: V) -> (BPTree<V>, Vec<i64>) {
    let mut rng = rand::rng();
    let insert_count = rng.random_range(INSERT_COUNT_FOR_REMOVE_MIN..INSERT_COUNT_FOR_REMOVE_MAX);
    let remove_count = rng.random_range(REMOVE_COUNT_MIN..REMOVE_COUNT_MAX);
    let tree = BPTree::new(order);
    tree.write().extend(
        random_order(insert_count, insert_count)
            .into_iter()
            .map(|k| (k, value.clone())),
    );
    (tree, random_order(insert_count, remove_count))
}

fn prepare_search<V: Clone>(order: usize, value: V) -> (BPTree<V>, Vec<i64>) {
    let mut rng = rand::rng();
    let insert_count = rng.random_range(INSERT_COUNT_FOR_SEARCH_MIN..INSERT_COUNT_FOR_SEARCH_MAX);
    let search_limit = insert_count * SEARCH_SIZE_NUMERATOR / SEARCH_SIZE_DENOMINATOR;
    let search_count = rng.random_range(SEARCH_COUNT_MIN..SEARCH_COUNT_MAX);

    // Create a tree with elements 0 through insert_count(-1)
    let tree = BPTree::new(order);
    tree.write()
        .extend((0..insert_count as i64).map(|k| (k, value.clone())));

    // Choose 'search_count' numbers from [0,search_limit) randomly to be searched in the created tree.
    let mut list = Vec::with_capacity(search_count);
    for _ in 0..search_count {
        list.push(rng.random_range(0..search_limit as i64));
    }
    (tree, list)
}

/// Returns a Vec of n elements from the range [0,up_to) in random order without repetition
fn random_order(up_to: usize, n: usize) -> Vec<i64> {
    let mut rng = rand::rng();
    let mut order: Vec<i64> = (0..up_to as i64).collect();
    order.shuffle(&mut rng);
    order.truncate(n);
    order
}
