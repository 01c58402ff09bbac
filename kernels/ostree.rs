//! An order-statistics multiset for running medians.
//!
//! [`OrderStatTree`] is an AVL tree in which every node stores one distinct value, its
//! multiplicity, and the number of occurrences in its whole subtree. The subtree sizes
//! turn rank selection into a single root-to-leaf walk, so `insert`, `remove`, and
//! `median` are all O(log n).
//!
//! Invariants, checked by the tests below after every mutation:
//! - in-order traversal is strictly increasing under [`Sample::total_order`];
//! - `size == count + left.size + right.size` for every node;
//! - sibling heights differ by at most one.

use crate::types::Sample;
use std::cmp::Ordering;

/// The operations a sliding median filter needs from its window store.
pub trait OrderStatistics<T: Sample> {
    /// Adds one occurrence of `value`.
    fn insert(&mut self, value: T);

    /// Removes one occurrence of `value`. Returns `false` if it was not present.
    fn remove(&mut self, value: T) -> bool;

    /// Number of stored occurrences.
    fn len(&self) -> usize;

    /// The `rank`-th smallest occurrence (0-based).
    fn select(&self, rank: usize) -> Option<T>;

    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Middle order statistic for odd sizes, mean of the two central ones for even
    /// sizes, `None` when empty.
    fn median(&self) -> Option<T> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        if n % 2 == 1 {
            return self.select(n / 2);
        }
        let lo = self.select(n / 2 - 1)?;
        let hi = self.select(n / 2)?;
        Some((lo + hi) / (T::one() + T::one()))
    }
}

type Link<T> = Option<Box<Node<T>>>;

struct Node<T> {
    value: T,
    count: usize,
    size: usize,
    height: i32,
    left: Link<T>,
    right: Link<T>,
}

impl<T: Sample> Node<T> {
    fn leaf(value: T) -> Box<Self> {
        Box::new(Self {
            value,
            count: 1,
            size: 1,
            height: 1,
            left: None,
            right: None,
        })
    }

    #[inline(always)]
    fn refresh(&mut self) {
        self.size = self.count + size(&self.left) + size(&self.right);
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    #[inline(always)]
    fn balance(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

#[inline(always)]
fn size<T>(link: &Link<T>) -> usize {
    link.as_ref().map_or(0, |node| node.size)
}

#[inline(always)]
fn height<T>(link: &Link<T>) -> i32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn rotate_right<T: Sample>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    match node.left.take() {
        Some(mut pivot) => {
            node.left = pivot.right.take();
            node.refresh();
            pivot.right = Some(node);
            pivot.refresh();
            pivot
        }
        None => node,
    }
}

fn rotate_left<T: Sample>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    match node.right.take() {
        Some(mut pivot) => {
            node.right = pivot.left.take();
            node.refresh();
            pivot.left = Some(node);
            pivot.refresh();
            pivot
        }
        None => node,
    }
}

/// Restores the AVL height invariant at `node`, assuming both subtrees satisfy it.
fn rebalance<T: Sample>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    node.refresh();
    let balance = node.balance();
    if balance > 1 {
        if node.left.as_ref().is_some_and(|l| l.balance() < 0) {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if node.right.as_ref().is_some_and(|r| r.balance() > 0) {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

fn insert_into<T: Sample>(link: Link<T>, value: T) -> Box<Node<T>> {
    let mut node = match link {
        Some(node) => node,
        None => return Node::leaf(value),
    };
    match value.total_order(&node.value) {
        Ordering::Less => node.left = Some(insert_into(node.left.take(), value)),
        Ordering::Greater => node.right = Some(insert_into(node.right.take(), value)),
        Ordering::Equal => node.count += 1,
    }
    rebalance(node)
}

/// Detaches the smallest node of a subtree, returning `(rest, min)`.
fn take_min<T: Sample>(mut node: Box<Node<T>>) -> (Link<T>, Box<Node<T>>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            node.refresh();
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn remove_from<T: Sample>(link: Link<T>, value: T, removed: &mut bool) -> Link<T> {
    let mut node = link?;
    match value.total_order(&node.value) {
        Ordering::Less => node.left = remove_from(node.left.take(), value, removed),
        Ordering::Greater => node.right = remove_from(node.right.take(), value, removed),
        Ordering::Equal => {
            *removed = true;
            if node.count > 1 {
                node.count -= 1;
            } else {
                match (node.left.take(), node.right.take()) {
                    (None, right) => return right,
                    (left, None) => return left,
                    (left, Some(right)) => {
                        let (rest, mut successor) = take_min(right);
                        successor.left = left;
                        successor.right = rest;
                        return Some(rebalance(successor));
                    }
                }
            }
        }
    }
    Some(rebalance(node))
}

/// AVL-balanced multiset of samples with O(log n) rank selection.
pub struct OrderStatTree<T> {
    root: Link<T>,
}

impl<T: Sample> OrderStatTree<T> {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Height of the tree; an empty tree has height 0.
    pub fn height(&self) -> usize {
        height(&self.root) as usize
    }
}

impl<T: Sample> Default for OrderStatTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample> FromIterator<T> for OrderStatTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::new();
        for value in iter {
            tree.insert(value);
        }
        tree
    }
}

impl<T: Sample> OrderStatistics<T> for OrderStatTree<T> {
    fn insert(&mut self, value: T) {
        self.root = Some(insert_into(self.root.take(), value));
    }

    fn remove(&mut self, value: T) -> bool {
        let mut removed = false;
        self.root = remove_from(self.root.take(), value, &mut removed);
        removed
    }

    fn len(&self) -> usize {
        size(&self.root)
    }

    fn select(&self, rank: usize) -> Option<T> {
        let mut link = &self.root;
        let mut rank = rank;
        while let Some(node) = link {
            let left = size(&node.left);
            if rank < left {
                link = &node.left;
            } else if rank < left + node.count {
                return Some(node.value);
            } else {
                rank -= left + node.count;
                link = &node.right;
            }
        }
        None
    }

    fn clear(&mut self) {
        self.root = None;
    }
}
