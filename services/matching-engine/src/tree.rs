//! Balanced price-level index
//!
//! A direction-parameterised AVL tree over level-pool indices. Bids use
//! descending order (highest price first), asks ascending (lowest first);
//! stop ladders flip the directions. `first()` is therefore always the best
//! price of the side the tree indexes.
//!
//! Removal takes a direct node handle, no key lookup. When the removed node
//! has two children the in-order successor's payload is relocated into the
//! removed node's slot and every order on the relocated FIFO list is
//! re-pointed; the successor's slot is the one returned to the pool.

use crate::pool::{NodeIndex, NodePool, NIL};
use std::cmp::Ordering;
use types::prelude::*;

/// AVL tree of price levels.
#[derive(Debug)]
pub struct LevelTree {
    root: NodeIndex,
    size: usize,
    /// True for bid-style ordering (higher price is "first").
    descending: bool,
}

impl LevelTree {
    pub fn new(descending: bool) -> Self {
        Self {
            root: NIL,
            size: 0,
            descending,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The first (best) level under this tree's ordering, or `NIL`.
    pub fn first(&self, pool: &NodePool) -> NodeIndex {
        if self.root == NIL {
            return NIL;
        }
        let mut node = self.root;
        while pool.level(node).left != NIL {
            node = pool.level(node).left;
        }
        node
    }

    /// Find the level at an exact price, or `NIL`.
    pub fn find(&self, pool: &NodePool, price: Price) -> NodeIndex {
        let mut node = self.root;
        while node != NIL {
            let node_price = pool.level(node).level.price;
            if price == node_price {
                return node;
            }
            node = match self.compare(price, node_price) {
                Ordering::Less => pool.level(node).left,
                _ => pool.level(node).right,
            };
        }
        NIL
    }

    fn compare(&self, a: Price, b: Price) -> Ordering {
        if self.descending {
            b.cmp(&a)
        } else {
            a.cmp(&b)
        }
    }

    /// Insert a freshly acquired level node. The node must not already be
    /// linked into any tree.
    pub fn insert(&mut self, pool: &mut NodePool, node: NodeIndex) {
        if self.root == NIL {
            self.root = node;
            self.size += 1;
            return;
        }

        let price = pool.level(node).level.price;
        let mut parent = self.root;
        let is_left;
        loop {
            let parent_price = pool.level(parent).level.price;
            if self.compare(price, parent_price) == Ordering::Less {
                let left = pool.level(parent).left;
                if left == NIL {
                    pool.level_mut(parent).left = node;
                    pool.level_mut(node).parent = parent;
                    is_left = true;
                    break;
                }
                parent = left;
            } else {
                let right = pool.level(parent).right;
                if right == NIL {
                    pool.level_mut(parent).right = node;
                    pool.level_mut(node).parent = parent;
                    is_left = false;
                    break;
                }
                parent = right;
            }
        }

        self.size += 1;
        self.rebalance_insert(pool, node, parent, is_left);
    }

    /// Remove a level by node handle and return its slot to the pool.
    ///
    /// After this call `node` either holds the relocated successor level
    /// (two-children case) or has been released; callers must re-derive any
    /// cached handles from the tree.
    pub fn remove(&mut self, pool: &mut NodePool, node: NodeIndex) {
        if node == NIL {
            return;
        }

        let (left, right) = {
            let n = pool.level(node);
            (n.left, n.right)
        };

        if left != NIL && right != NIL {
            // Two children: relocate the in-order successor into this slot.
            let mut successor = right;
            while pool.level(successor).left != NIL {
                successor = pool.level(successor).left;
            }
            let (succ_level, succ_head, succ_tail, succ_parent, succ_right) = {
                let s = pool.level(successor);
                (s.level, s.head, s.tail, s.parent, s.right)
            };
            {
                let n = pool.level_mut(node);
                n.level = succ_level;
                n.head = succ_head;
                n.tail = succ_tail;
            }
            // Orders on the relocated list must follow their level.
            let mut order = succ_head;
            while order != NIL {
                pool.order_mut(order).level = node;
                order = pool.order(order).next;
            }

            let rebalance_from = if succ_parent == node {
                pool.level_mut(node).right = succ_right;
                if succ_right != NIL {
                    pool.level_mut(succ_right).parent = node;
                }
                node
            } else {
                pool.level_mut(succ_parent).left = succ_right;
                if succ_right != NIL {
                    pool.level_mut(succ_right).parent = succ_parent;
                }
                succ_parent
            };

            self.size -= 1;
            self.rebalance_remove(pool, rebalance_from);
            pool.release_level(successor);
            return;
        }

        let replacement = if left != NIL { left } else { right };
        let parent = pool.level(node).parent;

        if parent == NIL {
            self.root = replacement;
        } else if pool.level(parent).left == node {
            pool.level_mut(parent).left = replacement;
        } else {
            pool.level_mut(parent).right = replacement;
        }
        if replacement != NIL {
            pool.level_mut(replacement).parent = parent;
        }

        self.size -= 1;
        if parent != NIL {
            self.rebalance_remove(pool, parent);
        }
        pool.release_level(node);
    }

    /// In-order traversal. The visitor returns `false` to stop early.
    pub fn for_each<F>(&self, pool: &NodePool, mut visit: F)
    where
        F: FnMut(NodeIndex) -> bool,
    {
        self.visit_in_order(pool, self.root, &mut visit);
    }

    fn visit_in_order<F>(&self, pool: &NodePool, node: NodeIndex, visit: &mut F) -> bool
    where
        F: FnMut(NodeIndex) -> bool,
    {
        if node == NIL {
            return true;
        }
        let (left, right) = {
            let n = pool.level(node);
            (n.left, n.right)
        };
        if !self.visit_in_order(pool, left, visit) {
            return false;
        }
        if !visit(node) {
            return false;
        }
        self.visit_in_order(pool, right, visit)
    }

    // ── Rebalancing ─────────────────────────────────────────────────────

    fn rebalance_insert(
        &mut self,
        pool: &mut NodePool,
        mut node: NodeIndex,
        mut parent: NodeIndex,
        mut is_left: bool,
    ) {
        while parent != NIL {
            {
                let p = pool.level_mut(parent);
                if is_left {
                    p.balance -= 1;
                } else {
                    p.balance += 1;
                }
            }
            let balance = pool.level(parent).balance;
            if balance == 0 {
                break;
            }
            if balance == -2 || balance == 2 {
                self.rebalance(pool, parent);
                break;
            }
            node = parent;
            parent = pool.level(node).parent;
            if parent != NIL {
                is_left = pool.level(parent).left == node;
            }
        }
    }

    fn rebalance_remove(&mut self, pool: &mut NodePool, mut node: NodeIndex) {
        while node != NIL {
            let old_balance = pool.level(node).balance;

            let (left, right) = {
                let n = pool.level(node);
                (n.left, n.right)
            };
            let balance = self.height(pool, right) - self.height(pool, left);
            pool.level_mut(node).balance = balance;

            if balance == -2 || balance == 2 {
                node = self.rebalance(pool, node);
                let balance = pool.level(node).balance;
                if balance == -1 || balance == 1 {
                    break;
                }
            } else if old_balance == 0 {
                break;
            }

            node = pool.level(node).parent;
        }
    }

    fn height(&self, pool: &NodePool, node: NodeIndex) -> i32 {
        if node == NIL {
            return 0;
        }
        let (left, right) = {
            let n = pool.level(node);
            (n.left, n.right)
        };
        1 + self.height(pool, left).max(self.height(pool, right))
    }

    fn rebalance(&mut self, pool: &mut NodePool, node: NodeIndex) -> NodeIndex {
        let balance = pool.level(node).balance;
        if balance == -2 {
            let left = pool.level(node).left;
            if pool.level(left).balance <= 0 {
                return self.rotate_right(pool, node);
            }
            self.rotate_left(pool, left);
            return self.rotate_right(pool, node);
        }
        if balance == 2 {
            let right = pool.level(node).right;
            if pool.level(right).balance >= 0 {
                return self.rotate_left(pool, node);
            }
            self.rotate_right(pool, right);
            return self.rotate_left(pool, node);
        }
        node
    }

    fn rotate_left(&mut self, pool: &mut NodePool, node: NodeIndex) -> NodeIndex {
        let pivot = pool.level(node).right;
        let parent = pool.level(node).parent;

        let pivot_left = pool.level(pivot).left;
        pool.level_mut(node).right = pivot_left;
        if pivot_left != NIL {
            pool.level_mut(pivot_left).parent = node;
        }

        pool.level_mut(pivot).left = node;
        pool.level_mut(node).parent = pivot;

        pool.level_mut(pivot).parent = parent;
        if parent == NIL {
            self.root = pivot;
        } else if pool.level(parent).left == node {
            pool.level_mut(parent).left = pivot;
        } else {
            pool.level_mut(parent).right = pivot;
        }

        let pivot_balance = pool.level(pivot).balance;
        {
            let n = pool.level_mut(node);
            n.balance = n.balance - 1 - pivot_balance.max(0);
        }
        let node_balance = pool.level(node).balance;
        {
            let p = pool.level_mut(pivot);
            p.balance = p.balance - 1 + node_balance.min(0);
        }

        pivot
    }

    fn rotate_right(&mut self, pool: &mut NodePool, node: NodeIndex) -> NodeIndex {
        let pivot = pool.level(node).left;
        let parent = pool.level(node).parent;

        let pivot_right = pool.level(pivot).right;
        pool.level_mut(node).left = pivot_right;
        if pivot_right != NIL {
            pool.level_mut(pivot_right).parent = node;
        }

        pool.level_mut(pivot).right = node;
        pool.level_mut(node).parent = pivot;

        pool.level_mut(pivot).parent = parent;
        if parent == NIL {
            self.root = pivot;
        } else if pool.level(parent).left == node {
            pool.level_mut(parent).left = pivot;
        } else {
            pool.level_mut(parent).right = pivot;
        }

        let pivot_balance = pool.level(pivot).balance;
        {
            let n = pool.level_mut(node);
            n.balance = n.balance + 1 - pivot_balance.min(0);
        }
        let node_balance = pool.level(node).balance;
        {
            let p = pool.level_mut(pivot);
            p.balance = p.balance + 1 + node_balance.max(0);
        }

        pivot
    }
}
