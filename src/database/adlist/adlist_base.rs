use std::fmt;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle of a list node. Stays valid until the node is deleted.
    pub struct NodeId;
}

#[derive(Clone)]
struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Doubly linked list whose nodes live in an arena and are addressed by
/// [`NodeId`] handles.
#[derive(Clone)]
pub struct LinkedList<T> {
    nodes: SlotMap<NodeId, Node<T>>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HeadToTail,
    TailToHead,
}

/// Detached cursor. The next node is remembered before the current one is
/// handed out, so the caller may delete the node it just received.
#[derive(Debug, Clone)]
pub struct ListCursor {
    next: Option<NodeId>,
    direction: Direction,
}

/// Borrowing iterator over values.
pub struct Iter<'a, T> {
    list: &'a LinkedList<T>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl<T> LinkedList<T> {
    pub fn new() -> Self {
        LinkedList {
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.head
    }

    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn next_node(
        &self,
        id: NodeId,
    ) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.next)
    }

    pub fn prev_node(
        &self,
        id: NodeId,
    ) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.prev)
    }

    pub fn value(
        &self,
        id: NodeId,
    ) -> Option<&T> {
        self.nodes.get(id).map(|n| &n.value)
    }

    pub fn value_mut(
        &mut self,
        id: NodeId,
    ) -> Option<&mut T> {
        self.nodes.get_mut(id).map(|n| &mut n.value)
    }

    pub fn add_head(
        &mut self,
        value: T,
    ) -> NodeId {
        let id = self.nodes.insert(Node {
            value,
            prev: None,
            next: self.head,
        });
        match self.head {
            Some(old) => self.nodes[old].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    pub fn add_tail(
        &mut self,
        value: T,
    ) -> NodeId {
        let id = self.nodes.insert(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(old) => self.nodes[old].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Inserts `value` next to `old`, after it when `after` is set. Returns
    /// `None` if `old` is no longer in the list.
    pub fn insert_node(
        &mut self,
        old: NodeId,
        value: T,
        after: bool,
    ) -> Option<NodeId> {
        let (old_prev, old_next) = {
            let n = self.nodes.get(old)?;
            (n.prev, n.next)
        };
        let (prev, next) = if after {
            (Some(old), old_next)
        } else {
            (old_prev, Some(old))
        };
        let id = self.nodes.insert(Node { value, prev, next });
        match prev {
            Some(p) => self.nodes[p].next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(n) => self.nodes[n].prev = Some(id),
            None => self.tail = Some(id),
        }
        Some(id)
    }

    /// Unlinks the node and returns its value.
    pub fn del_node(
        &mut self,
        id: NodeId,
    ) -> Option<T> {
        let node = self.nodes.remove(id)?;
        match node.prev {
            Some(p) => self.nodes[p].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.nodes[n].prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.value)
    }

    pub fn pop_head(&mut self) -> Option<T> {
        self.head.and_then(|id| self.del_node(id))
    }

    pub fn pop_tail(&mut self) -> Option<T> {
        self.tail.and_then(|id| self.del_node(id))
    }

    /// Node at zero-based `index`; negative values count from the tail, `-1`
    /// being the last node.
    pub fn index(
        &self,
        index: i64,
    ) -> Option<NodeId> {
        if index < 0 {
            let steps = (-(index + 1)) as u64;
            let mut cur = self.tail;
            for _ in 0..steps {
                cur = self.prev_node(cur?);
            }
            cur
        } else {
            let mut cur = self.head;
            for _ in 0..index {
                cur = self.next_node(cur?);
            }
            cur
        }
    }

    /// First node, from the head, whose value matches.
    pub fn search_key<F>(
        &self,
        mut matches: F,
    ) -> Option<NodeId>
    where
        F: FnMut(&T) -> bool,
    {
        let mut cur = self.head;
        while let Some(id) = cur {
            let node = &self.nodes[id];
            if matches(&node.value) {
                return Some(id);
            }
            cur = node.next;
        }
        None
    }

    /// Moves the tail node to the head.
    pub fn rotate(&mut self) {
        if self.len() <= 1 {
            return;
        }
        let (Some(tail), Some(head)) = (self.tail, self.head) else {
            return;
        };
        let new_tail = self.nodes[tail].prev;
        if let Some(nt) = new_tail {
            self.nodes[nt].next = None;
        }
        self.tail = new_tail;

        self.nodes[tail].prev = None;
        self.nodes[tail].next = Some(head);
        self.nodes[head].prev = Some(tail);
        self.head = Some(tail);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn cursor(
        &self,
        direction: Direction,
    ) -> ListCursor {
        let next = match direction {
            Direction::HeadToTail => self.head,
            Direction::TailToHead => self.tail,
        };
        ListCursor { next, direction }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }
}

impl ListCursor {
    pub fn next<T>(
        &mut self,
        list: &LinkedList<T>,
    ) -> Option<NodeId> {
        let current = self.next?;
        let node = list.nodes.get(current)?;
        self.next = match self.direction {
            Direction::HeadToTail => node.next,
            Direction::TailToHead => node.prev,
        };
        Some(current)
    }

    pub fn rewind<T>(
        &mut self,
        list: &LinkedList<T>,
    ) {
        self.next = list.head;
        self.direction = Direction::HeadToTail;
    }

    pub fn rewind_tail<T>(
        &mut self,
        list: &LinkedList<T>,
    ) {
        self.next = list.tail;
        self.direction = Direction::TailToHead;
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.list.nodes[self.front?];
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.list.nodes[self.back?];
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a LinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> FromIterator<T> for LinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = LinkedList::new();
        list.extend(iter);
        list
    }
}

impl<T> Extend<T> for LinkedList<T> {
    fn extend<I: IntoIterator<Item = T>>(
        &mut self,
        iter: I,
    ) {
        for v in iter {
            self.add_tail(v);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for LinkedList<T> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone>(list: &LinkedList<T>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn test_add_head_and_tail() {
        let mut list = LinkedList::new();
        list.add_tail(2);
        list.add_head(1);
        list.add_tail(3);
        assert_eq!(collect(&list), vec![1, 2, 3]);
        assert_eq!(list.iter().rev().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_insert_node_before_and_after() {
        let mut list: LinkedList<&str> = ["a", "c"].into_iter().collect();
        let a = list.first().unwrap();
        let c = list.last().unwrap();
        list.insert_node(a, "b", true).unwrap();
        list.insert_node(c, "d", true).unwrap();
        let first = list.insert_node(a, "_", false).unwrap();
        assert_eq!(collect(&list), vec!["_", "a", "b", "c", "d"]);
        assert_eq!(list.first(), Some(first));
        assert_eq!(list.value(list.last().unwrap()), Some(&"d"));
    }

    #[test]
    fn test_del_node_relinks_neighbours() {
        let mut list: LinkedList<i32> = (1..=4).collect();
        let second = list.index(1).unwrap();
        assert_eq!(list.del_node(second), Some(2));
        assert_eq!(list.del_node(second), None, "stale handle");
        assert_eq!(collect(&list), vec![1, 3, 4]);
        assert_eq!(list.pop_head(), Some(1));
        assert_eq!(list.pop_tail(), Some(4));
        assert_eq!(collect(&list), vec![3]);
        assert_eq!(list.first(), list.last());
    }

    #[test]
    fn test_index_negative_counts_from_tail() {
        let list: LinkedList<i32> = (0..5).collect();
        let at = |i| list.index(i).and_then(|id| list.value(id)).copied();
        assert_eq!(at(0), Some(0));
        assert_eq!(at(4), Some(4));
        assert_eq!(at(-1), Some(4));
        assert_eq!(at(-5), Some(0));
        assert_eq!(at(5), None);
        assert_eq!(at(-6), None);
    }

    #[test]
    fn test_search_key_and_rotate() {
        let mut list: LinkedList<i32> = (1..=3).collect();
        let two = list.search_key(|v| *v == 2).unwrap();
        assert_eq!(list.value(two), Some(&2));
        assert!(list.search_key(|v| *v == 9).is_none());

        list.rotate();
        assert_eq!(collect(&list), vec![3, 1, 2]);
        assert_eq!(list.value(list.last().unwrap()), Some(&2));
    }

    /// The node just returned by a cursor can be deleted without breaking
    /// the walk.
    #[test]
    fn test_cursor_survives_deleting_current() {
        let mut list: LinkedList<i32> = (1..=6).collect();
        let mut cursor = list.cursor(Direction::HeadToTail);
        while let Some(id) = cursor.next(&list) {
            if list.value(id).is_some_and(|v| v % 2 == 0) {
                list.del_node(id);
            }
        }
        assert_eq!(collect(&list), vec![1, 3, 5]);

        let mut seen = Vec::new();
        cursor.rewind_tail(&list);
        while let Some(id) = cursor.next(&list) {
            seen.push(*list.value(id).unwrap());
        }
        assert_eq!(seen, vec![5, 3, 1]);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut list: LinkedList<String> = ["x".to_string()].into_iter().collect();
        let copy = list.clone();
        let head = list.first().unwrap();
        list.value_mut(head).unwrap().push('!');
        assert_eq!(collect(&copy), vec!["x".to_string()]);
        assert_ne!(list, copy);
    }
}
