//! Balanced asset index tree
//!
//! AVL tree keyed by `file_id`. Nodes are box-owned by their parents
//! (no back-pointers, no shared ownership); the payload sits behind an
//! `Arc<RwLock<..>>` so the lookup cache can hold a `Weak`
//! back-reference without owning the record.
//!
//! The tree itself is not synchronized. The store facade serializes all
//! structural mutation behind its own guard; using `IndexTree` directly
//! from concurrent writers is not supported.

use crate::library::record::AssetRecord;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use tracing::trace;
use wavecell_common::time;

/// Shared handle to a tree-owned record
pub type RecordHandle = Arc<RwLock<AssetRecord>>;

/// Tree-level statistics
#[derive(Debug, Clone, Serialize)]
pub struct TreeStats {
    /// Number of records in the tree
    pub file_count: usize,

    /// Aggregate byte size of all indexed assets
    pub total_size: u64,

    /// Height of the tree (0 when empty)
    pub tree_height: u32,

    /// Mean asset size in bytes (0.0 when empty)
    pub average_file_size: f64,
}

struct Node {
    record: RecordHandle,
    height: u32,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn new(record: RecordHandle) -> Box<Self> {
        Box::new(Self {
            record,
            height: 1,
            left: None,
            right: None,
        })
    }
}

#[cfg(test)]
impl Node {
    fn file_id(&self) -> String {
        self.record.read().unwrap().file_id.clone()
    }
}

fn height(node: &Option<Box<Node>>) -> u32 {
    node.as_ref().map_or(0, |n| n.height)
}

fn update_height(node: &mut Node) {
    node.height = 1 + height(&node.left).max(height(&node.right));
}

fn balance_factor(node: &Node) -> i32 {
    height(&node.left) as i32 - height(&node.right) as i32
}

/// Single right rotation (LL case)
fn rotate_right(mut y: Box<Node>) -> Box<Node> {
    let mut x = y.left.take().expect("rotate_right requires a left child");
    y.left = x.right.take();
    update_height(&mut y);
    x.right = Some(y);
    update_height(&mut x);
    x
}

/// Single left rotation (RR case)
fn rotate_left(mut x: Box<Node>) -> Box<Node> {
    let mut y = x.right.take().expect("rotate_left requires a right child");
    x.right = y.left.take();
    update_height(&mut x);
    y.left = Some(x);
    update_height(&mut y);
    y
}

/// Restore the AVL invariant at this node, choosing among the four
/// rotations by the balance factors of the node and its heavier child
fn rebalance(mut node: Box<Node>) -> Box<Node> {
    update_height(&mut node);
    let balance = balance_factor(&node);

    if balance > 1 {
        // Left-heavy: LR first rotates the left child left
        if balance_factor(node.left.as_ref().unwrap()) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }

    if balance < -1 {
        // Right-heavy: RL first rotates the right child right
        if balance_factor(node.right.as_ref().unwrap()) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }

    node
}

/// Self-balancing index of asset records keyed by identifier
#[derive(Default)]
pub struct IndexTree {
    root: Option<Box<Node>>,
    file_count: usize,
    total_size: u64,
}

impl IndexTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, rebalancing ancestors on the way back up
    ///
    /// If the identifier already exists, the existing record only has
    /// its access metadata bumped; the incoming record is discarded and
    /// the count stays unchanged. Returns whether a new node was added.
    pub fn insert(&mut self, record: AssetRecord) -> bool {
        let file_size = record.file_size;
        let handle = Arc::new(RwLock::new(record));
        let mut inserted = false;
        let root = self.root.take();
        self.root = Self::insert_node(root, handle, &mut inserted);
        if inserted {
            self.file_count += 1;
            self.total_size += file_size;
        }
        inserted
    }

    fn insert_node(
        node: Option<Box<Node>>,
        record: RecordHandle,
        inserted: &mut bool,
    ) -> Option<Box<Node>> {
        let mut node = match node {
            Some(node) => node,
            None => {
                *inserted = true;
                return Some(Node::new(record));
            }
        };

        let ordering = {
            let incoming = record.read().unwrap();
            let existing = node.record.read().unwrap();
            incoming.file_id.cmp(&existing.file_id)
        };

        match ordering {
            Ordering::Less => node.left = Self::insert_node(node.left.take(), record, inserted),
            Ordering::Greater => node.right = Self::insert_node(node.right.take(), record, inserted),
            Ordering::Equal => {
                // Duplicate identifier: count an access, keep the node
                let mut existing = node.record.write().unwrap();
                existing.last_accessed = time::now();
                existing.access_count += 1;
            }
        }

        Some(rebalance(node))
    }

    /// Find a record, bumping its access metadata as a side effect
    pub fn find(&self, file_id: &str) -> Option<RecordHandle> {
        let handle = self.peek(file_id)?;
        handle.write().unwrap().touch();
        Some(handle)
    }

    /// Find a record without touching its access metadata
    pub fn peek(&self, file_id: &str) -> Option<RecordHandle> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            let ordering = file_id.cmp(node.record.read().unwrap().file_id.as_str());
            match ordering {
                Ordering::Equal => return Some(Arc::clone(&node.record)),
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
            }
        }
        None
    }

    /// Remove a record by identifier; returns whether a deletion occurred
    ///
    /// A node with at most one child is spliced out directly. A node
    /// with two children takes a field-copy of its in-order successor
    /// and the successor is deleted from the right subtree, so the node
    /// physically removed always has at most one child. Each recursive
    /// call returns the (possibly new) owned subtree root and the
    /// caller reassigns its child link.
    pub fn remove(&mut self, file_id: &str) -> bool {
        let removed_size = match self.peek(file_id) {
            Some(handle) => handle.read().unwrap().file_size,
            None => return false,
        };

        let root = self.root.take();
        self.root = Self::remove_node(root, file_id);
        self.file_count -= 1;
        self.total_size = self.total_size.saturating_sub(removed_size);
        trace!("Removed {} from index tree ({} remain)", file_id, self.file_count);
        true
    }

    fn remove_node(node: Option<Box<Node>>, file_id: &str) -> Option<Box<Node>> {
        let mut node = node?;

        let ordering = file_id.cmp(node.record.read().unwrap().file_id.as_str());
        match ordering {
            Ordering::Less => node.left = Self::remove_node(node.left.take(), file_id),
            Ordering::Greater => node.right = Self::remove_node(node.right.take(), file_id),
            Ordering::Equal => {
                if node.left.is_none() {
                    return node.right.take();
                }
                if node.right.is_none() {
                    return node.left.take();
                }

                // Two children: copy every field from the in-order
                // successor, then delete the successor from the right
                // subtree. The successor node has no left child, so the
                // physical removal below splices at most one child.
                let successor = Self::min_record(node.right.as_deref().unwrap());
                let successor_id = {
                    let source = successor.read().unwrap();
                    let mut target = node.record.write().unwrap();
                    *target = source.clone();
                    target.file_id.clone()
                };
                node.right = Self::remove_node(node.right.take(), &successor_id);
            }
        }

        Some(rebalance(node))
    }

    /// Leftmost record of a subtree (minimum identifier)
    fn min_record(node: &Node) -> RecordHandle {
        let mut current = node;
        while let Some(left) = current.left.as_deref() {
            current = left;
        }
        Arc::clone(&current.record)
    }

    /// Full in-order sequence, ascending by identifier
    pub fn in_order(&self) -> Vec<RecordHandle> {
        let mut records = Vec::with_capacity(self.file_count);
        Self::walk(self.root.as_deref(), &mut records);
        records
    }

    fn walk(node: Option<&Node>, records: &mut Vec<RecordHandle>) {
        if let Some(node) = node {
            Self::walk(node.left.as_deref(), records);
            records.push(Arc::clone(&node.record));
            Self::walk(node.right.as_deref(), records);
        }
    }

    /// Number of records in the tree
    pub fn len(&self) -> usize {
        self.file_count
    }

    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }

    /// Tree height (0 when empty)
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    /// Aggregate byte size of all indexed assets
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn statistics(&self) -> TreeStats {
        TreeStats {
            file_count: self.file_count,
            total_size: self.total_size,
            tree_height: self.height(),
            average_file_size: if self.file_count > 0 {
                self.total_size as f64 / self.file_count as f64
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, size: u64) -> AssetRecord {
        AssetRecord {
            file_id: id.to_string(),
            filename: format!("{}.wav", id),
            file_size: size,
            ..AssetRecord::default()
        }
    }

    fn ids(tree: &IndexTree) -> Vec<String> {
        tree.in_order()
            .iter()
            .map(|handle| handle.read().unwrap().file_id.clone())
            .collect()
    }

    /// Verify the AVL invariant and strict key ordering for a subtree;
    /// returns its height.
    fn check_invariants(node: Option<&Node>) -> u32 {
        let Some(node) = node else { return 0 };
        let left = check_invariants(node.left.as_deref());
        let right = check_invariants(node.right.as_deref());
        assert!((left as i32 - right as i32).abs() <= 1, "balance violated");
        assert_eq!(node.height, 1 + left.max(right), "stale height");
        if let Some(child) = node.left.as_deref() {
            assert!(child.file_id() < node.file_id());
        }
        if let Some(child) = node.right.as_deref() {
            assert!(child.file_id() > node.file_id());
        }
        node.height
    }

    #[test]
    fn test_insert_in_order_listing() {
        let mut tree = IndexTree::new();
        for id in ["b", "a", "c"] {
            assert!(tree.insert(record(id, 10)));
        }
        assert_eq!(ids(&tree), vec!["a", "b", "c"]);
        assert!(tree.height() <= 2);
        check_invariants(tree.root.as_deref());
    }

    #[test]
    fn test_sequential_inserts_stay_balanced() {
        let mut tree = IndexTree::new();
        let n = 256;
        for i in 0..n {
            tree.insert(record(&format!("{:04}", i), 1));
        }
        assert_eq!(tree.len(), n);
        check_invariants(tree.root.as_deref());

        // AVL height bound: h <= ~1.44 * log2(n + 2)
        let bound = (1.4405 * ((n + 2) as f64).log2()).floor() as u32;
        assert!(tree.height() <= bound, "height {} exceeds {}", tree.height(), bound);

        let listing = ids(&tree);
        let mut sorted = listing.clone();
        sorted.sort();
        assert_eq!(listing, sorted);
    }

    #[test]
    fn test_duplicate_insert_updates_access_metadata() {
        let mut tree = IndexTree::new();
        assert!(tree.insert(record("dup", 100)));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.total_size(), 100);

        // Re-insert: count unchanged, access_count bumped by 1
        assert!(!tree.insert(record("dup", 999)));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.total_size(), 100);
        let handle = tree.peek("dup").unwrap();
        assert_eq!(handle.read().unwrap().access_count, 1);
    }

    #[test]
    fn test_find_touches_peek_does_not() {
        let mut tree = IndexTree::new();
        tree.insert(record("x", 1));

        tree.peek("x").unwrap();
        assert_eq!(tree.peek("x").unwrap().read().unwrap().access_count, 0);

        tree.find("x").unwrap();
        tree.find("x").unwrap();
        assert_eq!(tree.peek("x").unwrap().read().unwrap().access_count, 2);

        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn test_remove_leaf_and_single_child() {
        let mut tree = IndexTree::new();
        for id in ["b", "a", "c", "d"] {
            tree.insert(record(id, 5));
        }

        assert!(tree.remove("a")); // leaf
        assert!(tree.remove("c")); // one child (d)
        assert_eq!(ids(&tree), vec!["b", "d"]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.total_size(), 10);
        check_invariants(tree.root.as_deref());
    }

    #[test]
    fn test_remove_two_children_uses_successor() {
        let mut tree = IndexTree::new();
        for id in ["d", "b", "f", "a", "c", "e", "g"] {
            tree.insert(record(id, 1));
        }

        // "d" has two children; its in-order successor is "e"
        assert!(tree.remove("d"));
        assert_eq!(ids(&tree), vec!["a", "b", "c", "e", "f", "g"]);
        assert!(tree.peek("d").is_none());
        assert_eq!(tree.peek("e").unwrap().read().unwrap().filename, "e.wav");
        check_invariants(tree.root.as_deref());
    }

    #[test]
    fn test_remove_missing_leaves_tree_unchanged() {
        let mut tree = IndexTree::new();
        for id in ["b", "a", "c"] {
            tree.insert(record(id, 7));
        }

        assert!(!tree.remove("zz"));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.total_size(), 21);
        assert_eq!(ids(&tree), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_root_until_empty() {
        let mut tree = IndexTree::new();
        for i in 0..32 {
            tree.insert(record(&format!("{:02}", i), 1));
        }
        for i in 0..32 {
            assert!(tree.remove(&format!("{:02}", i)));
            check_invariants(tree.root.as_deref());
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.total_size(), 0);
    }

    #[test]
    fn test_interleaved_inserts_and_removes_stay_ordered() {
        let mut tree = IndexTree::new();
        for i in 0..100 {
            tree.insert(record(&format!("{:03}", i), 2));
        }
        for i in (0..100).step_by(3) {
            assert!(tree.remove(&format!("{:03}", i)));
        }
        for i in 100..130 {
            tree.insert(record(&format!("{:03}", i), 2));
        }

        check_invariants(tree.root.as_deref());
        let listing = ids(&tree);
        let mut sorted = listing.clone();
        sorted.sort();
        assert_eq!(listing, sorted);
        assert_eq!(tree.len(), listing.len());
    }

    #[test]
    fn test_statistics() {
        let mut tree = IndexTree::new();
        assert_eq!(tree.statistics().average_file_size, 0.0);

        tree.insert(record("a", 100));
        tree.insert(record("b", 300));
        let stats = tree.statistics();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size, 400);
        assert_eq!(stats.average_file_size, 200.0);
        assert_eq!(stats.tree_height, tree.height());
    }
}
