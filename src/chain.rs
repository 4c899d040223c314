//! Chain: arena-backed doubly-linked list shared by every bucket.
//!
//! Nodes live in a `SlotMap`, so a position is a generational key. A
//! position stays valid until its own node is removed; removing a node
//! never disturbs the positions of its neighbours.

use slotmap::{DefaultKey, SecondaryMap, SlotMap};

#[derive(Clone, Debug)]
struct Node<T> {
    item: T,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Clone, Debug)]
pub(crate) struct Chain<T> {
    nodes: SlotMap<DefaultKey, Node<T>>,
    front: Option<DefaultKey>,
}

impl<T> Chain<T> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            front: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn front(&self) -> Option<DefaultKey> {
        self.front
    }

    pub(crate) fn get(&self, at: DefaultKey) -> Option<&T> {
        self.nodes.get(at).map(|n| &n.item)
    }

    pub(crate) fn get_mut(&mut self, at: DefaultKey) -> Option<&mut T> {
        self.nodes.get_mut(at).map(|n| &mut n.item)
    }

    /// Successor of `at`, or `None` at the end of the chain (or for a
    /// stale position).
    pub(crate) fn next(&self, at: DefaultKey) -> Option<DefaultKey> {
        self.nodes.get(at).and_then(|n| n.next)
    }

    pub(crate) fn push_front(&mut self, item: T) -> DefaultKey {
        let old_front = self.front;
        let at = self.nodes.insert(Node {
            item,
            prev: None,
            next: old_front,
        });
        if let Some(f) = old_front {
            self.nodes[f].prev = Some(at);
        }
        self.front = Some(at);
        at
    }

    /// Links `item` immediately before the live position `before`.
    pub(crate) fn insert_before(&mut self, before: DefaultKey, item: T) -> DefaultKey {
        debug_assert!(self.nodes.contains_key(before), "insert_before: stale position");
        let prev = self.nodes[before].prev;
        let at = self.nodes.insert(Node {
            item,
            prev,
            next: Some(before),
        });
        self.nodes[before].prev = Some(at);
        match prev {
            Some(p) => self.nodes[p].next = Some(at),
            None => self.front = Some(at),
        }
        at
    }

    pub(crate) fn remove(&mut self, at: DefaultKey) -> Option<T> {
        let node = self.nodes.remove(at)?;
        match node.prev {
            Some(p) => self.nodes[p].next = node.next,
            None => self.front = node.next,
        }
        if let Some(n) = node.next {
            self.nodes[n].prev = node.prev;
        }
        Some(node.item)
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.front = None;
    }

    /// Chain-order iterator from the front.
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        self.iter_from(self.front)
    }

    /// Chain-order iterator starting at `start` and running to the end of
    /// the whole chain. `None` yields nothing.
    pub(crate) fn iter_from(&self, start: Option<DefaultKey>) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            cursor: start,
        }
    }

    /// Chain-order mutable iterator. The links can't be followed while
    /// items are borrowed mutably, so the arena's items are ranked by chain
    /// position up front; this costs one pass and one allocation.
    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, T> {
        let rank: SecondaryMap<DefaultKey, usize> = self
            .iter()
            .enumerate()
            .map(|(i, (at, _))| (at, i))
            .collect();
        let mut items: Vec<(DefaultKey, &mut T)> = self
            .nodes
            .iter_mut()
            .map(|(at, n)| (at, &mut n.item))
            .collect();
        items.sort_unstable_by_key(|(at, _)| rank.get(*at).copied().unwrap_or(usize::MAX));
        IterMut {
            it: items.into_iter(),
        }
    }
}

pub(crate) struct Iter<'a, T> {
    nodes: &'a SlotMap<DefaultKey, Node<T>>,
    cursor: Option<DefaultKey>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (DefaultKey, &'a T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let at = self.cursor?;
        let node = self.nodes.get(at)?;
        self.cursor = node.next;
        Some((at, &node.item))
    }
}

pub(crate) struct IterMut<'a, T> {
    it: std::vec::IntoIter<(DefaultKey, &'a mut T)>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (DefaultKey, &'a mut T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
