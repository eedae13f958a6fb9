//! LRU Recency List Module
//!
//! Doubly linked recency list backed by a reusable node pool.
//!
//! Nodes live in an arena addressed by [`NodeId`]. Detached slots go onto a
//! free list and are handed out again by the next insertion, so steady-state
//! traffic does not allocate. A slot is either linked (reachable from the
//! list) or pooled (on the free list, payload cleared), never both.

// == Node Handle ==
/// Stable handle to a linked node, valid until that node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Recency-ordered list of payloads.
///
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug)]
pub struct RecencyList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates an empty list with an empty pool.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Links `value` as the most recently used node.
    pub fn push_front(&mut self, value: T) -> NodeId {
        let idx = self.alloc(value);
        self.link_front(idx);
        self.len += 1;
        NodeId(idx)
    }

    // == Remove ==
    /// Unlinks a node and returns its slot to the pool.
    ///
    /// Returns None if the handle points at a pooled slot.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let value = self.nodes.get_mut(id.0)?.value.take()?;
        self.unlink(id.0);
        self.free.push(id.0);
        self.len -= 1;
        Some(value)
    }

    // == Move To Front ==
    /// Promotes a node to most recently used.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head != Some(id.0) {
            self.unlink(id.0);
            self.link_front(id.0);
        }
        true
    }

    /// Unlinks and returns the most recently used payload.
    pub fn pop_front(&mut self) -> Option<T> {
        self.head.and_then(|idx| self.remove(NodeId(idx)))
    }

    /// Handle of the least recently used node, the eviction candidate.
    pub fn back(&self) -> Option<NodeId> {
        self.tail.map(NodeId)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0)?.value.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id.0)?.value.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of pooled slots ready for reuse.
    #[allow(dead_code)]
    pub(crate) fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Walks payloads from least to most recently used.
    pub fn iter_oldest_first(&self) -> OldestFirst<'_, T> {
        OldestFirst {
            list: self,
            cursor: self.tail,
        }
    }

    fn alloc(&mut self, value: T) -> usize {
        let node = Node {
            value: Some(value),
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;
        match self.head {
            Some(old_head) => self.nodes[old_head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);

        match prev {
            Some(prev_idx) => self.nodes[prev_idx].next = next,
            None => self.head = next,
        }
        match next {
            Some(next_idx) => self.nodes[next_idx].prev = prev,
            None => self.tail = prev,
        }

        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

// == Iterators ==
/// Iterator from the back (oldest) to the front (newest) of a [`RecencyList`].
pub struct OldestFirst<'a, T> {
    list: &'a RecencyList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for OldestFirst<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = &self.list.nodes[self.cursor?];
        self.cursor = node.prev;
        node.value.as_ref()
    }
}
