//! Sentinel-node doubly linked list over [`Entry`] values.
//!
//! This is internal plumbing for [`crate::lru`]; it is not meant to be used
//! directly. It exposes raw-pointer operations that require careful
//! invariant maintenance — use [`crate::lru::LruCore`] instead.
//!
//! The list is anchored by two sentinel nodes, `head` and `tail`, that
//! never carry data. For an empty list, `head.next == tail` and
//! `tail.prev == head`. `len()` counts only the data entries strictly
//! between the sentinels.

use crate::entry::Entry;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

/// A node in the list: either a sentinel (uninitialized `entry`) or a data
/// node holding a live `Entry<K, V>`.
pub(crate) struct Node<K, V> {
    entry: MaybeUninit<Entry<K, V>>,
    prev: *mut Node<K, V>,
    next: *mut Node<K, V>,
}

impl<K, V> Node<K, V> {
    fn sigil() -> Self {
        Node {
            entry: MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    fn data(entry: Entry<K, V>) -> Self {
        Node {
            entry: MaybeUninit::new(entry),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }
}

/// A handle to a node in the list. Opaque to callers outside this module
/// and [`crate::lru`]; dereferencing is only valid while the owning
/// `List` is alive and the node hasn't been removed.
pub(crate) type NodePtr<K, V> = NonNull<Node<K, V>>;

pub(crate) struct List<K, V> {
    head: NodePtr<K, V>,
    tail: NodePtr<K, V>,
    len: usize,
}

impl<K, V> List<K, V> {
    pub(crate) fn new() -> Self {
        let head = Box::into_raw(Box::new(Node::sigil()));
        let tail = Box::into_raw(Box::new(Node::sigil()));
        // SAFETY: head and tail were just allocated and are non-null.
        unsafe {
            (*head).next = tail;
            (*tail).prev = head;
        }
        List {
            // SAFETY: both pointers come from `Box::into_raw`, never null.
            head: unsafe { NonNull::new_unchecked(head) },
            tail: unsafe { NonNull::new_unchecked(tail) },
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Prepends a new data node immediately after `head` and returns a
    /// handle to it.
    pub(crate) fn insert(&mut self, key: K, value: V, expires: u64) -> NodePtr<K, V> {
        let node = Box::into_raw(Box::new(Node::data(Entry::new(key, value, expires))));
        // SAFETY: `node` was just allocated and is non-null.
        let node = unsafe { NonNull::new_unchecked(node) };
        // SAFETY: `node` is a freshly allocated node, not part of any list.
        unsafe { self.attach(node) };
        self.len += 1;
        node
    }

    /// Unlinks `node` from the list and drops it, returning the owned
    /// entry. Must not be called on a sentinel; double-removing a node is
    /// a programmer error (the node is no longer valid to reference after
    /// this call).
    ///
    /// # Safety
    ///
    /// `node` must currently be linked into `self` and must not be a
    /// sentinel.
    pub(crate) unsafe fn remove(&mut self, node: NodePtr<K, V>) -> Entry<K, V> {
        debug_assert_ne!(node, self.head, "cannot remove the head sentinel");
        debug_assert_ne!(node, self.tail, "cannot remove the tail sentinel");
        // SAFETY: caller guarantees `node` is linked into this list.
        unsafe { self.detach(node) };
        self.len -= 1;
        // SAFETY: `node` was allocated by `insert` via `Box::into_raw` and
        // has just been unlinked, so we now own it exclusively.
        let boxed = unsafe { Box::from_raw(node.as_ptr()) };
        // SAFETY: data nodes always carry an initialized entry.
        unsafe { boxed.entry.assume_init() }
    }

    /// Equivalent to `remove` followed by re-linking immediately after
    /// `head`; length is unchanged.
    ///
    /// # Safety
    ///
    /// `node` must currently be linked into `self` and must not be a
    /// sentinel.
    pub(crate) unsafe fn move_to_front(&mut self, node: NodePtr<K, V>) {
        // SAFETY: `head` is always a valid sentinel.
        if unsafe { self.head.as_ref().next } == node.as_ptr() {
            return;
        }
        // SAFETY: caller guarantees `node` is linked into this list.
        unsafe {
            self.detach(node);
            self.attach(node);
        }
    }

    /// The tail-most data node, or `None` if the list is empty.
    pub(crate) fn back(&self) -> Option<NodePtr<K, V>> {
        // SAFETY: `tail` is always a valid sentinel.
        let prev = unsafe { self.tail.as_ref().prev };
        if prev == self.head.as_ptr() {
            None
        } else {
            // SAFETY: `prev` is a live node whenever it isn't `head`.
            Some(unsafe { NonNull::new_unchecked(prev) })
        }
    }

    /// Borrows the entry held by `node`.
    ///
    /// # Safety
    ///
    /// `node` must currently be linked into `self` and must not be a
    /// sentinel.
    pub(crate) unsafe fn entry(&self, node: NodePtr<K, V>) -> &Entry<K, V> {
        // SAFETY: caller guarantees `node` is a live data node.
        unsafe { node.as_ref().entry.assume_init_ref() }
    }

    /// Mutably borrows the entry held by `node`.
    ///
    /// # Safety
    ///
    /// `node` must currently be linked into `self` and must not be a
    /// sentinel.
    pub(crate) unsafe fn entry_mut(&mut self, mut node: NodePtr<K, V>) -> &mut Entry<K, V> {
        // SAFETY: caller guarantees `node` is a live data node.
        unsafe { node.as_mut().entry.assume_init_mut() }
    }

    /// Removes every data node, returning their entries in MRU-to-LRU
    /// order. Used by `LruCore::clear` so the evict callback can be fired
    /// for each one.
    pub(crate) fn drain(&mut self) -> Vec<Entry<K, V>> {
        let mut out = Vec::with_capacity(self.len);
        while let Some(node) = {
            // SAFETY: `head` is always a valid sentinel.
            let next = unsafe { self.head.as_ref().next };
            if next == self.tail.as_ptr() {
                None
            } else {
                // SAFETY: `next` is a live data node since it isn't `tail`.
                Some(unsafe { NonNull::new_unchecked(next) })
            }
        } {
            // SAFETY: `node` was just read off the list and is linked in.
            out.push(unsafe { self.remove(node) });
        }
        out
    }

    /// # Safety
    ///
    /// `node` must currently be linked into `self`.
    unsafe fn detach(&mut self, node: NodePtr<K, V>) {
        // SAFETY: caller guarantees `node`'s neighbors are valid entries.
        unsafe {
            let n = node.as_ref();
            (*n.prev).next = n.next;
            (*n.next).prev = n.prev;
        }
    }

    /// # Safety
    ///
    /// `node` must not already be linked into any list.
    unsafe fn attach(&mut self, mut node: NodePtr<K, V>) {
        // SAFETY: `head` is always valid; caller guarantees `node` is
        // detached.
        unsafe {
            let head = self.head.as_mut();
            let old_first = head.next;
            let n = node.as_mut();
            n.next = old_first;
            n.prev = self.head.as_ptr();
            head.next = node.as_ptr();
            (*old_first).prev = node.as_ptr();
        }
    }
}

impl<K, V> Drop for List<K, V> {
    fn drop(&mut self) {
        // SAFETY: walk and free every node we own, head to tail, exactly
        // once each, matching the allocations made in `new`/`insert`.
        unsafe {
            let mut cur = self.head.as_ptr();
            while !cur.is_null() {
                let next = (*cur).next;
                drop(Box::from_raw(cur));
                cur = next;
            }
        }
    }
}

// SAFETY: `List` owns every node it points to exclusively; it never
// exposes shared aliasing of a node without the caller holding `&mut
// List`. Send/Sync follow K, V being Send.
unsafe impl<K: Send, V: Send> Send for List<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_has_no_back() {
        let list: List<&str, i32> = List::new();
        assert_eq!(list.len(), 0);
        assert!(list.back().is_none());
    }

    #[test]
    fn insert_prepends_and_tracks_len() {
        let mut list = List::new();
        let a = list.insert("a", 1, 0);
        let _b = list.insert("b", 2, 0);
        assert_eq!(list.len(), 2);
        // SAFETY: `a` is still linked in.
        assert_eq!(unsafe { list.entry(a).value() }, &1);
    }

    #[test]
    fn back_is_the_oldest_insert() {
        let mut list = List::new();
        let a = list.insert("a", 1, 0);
        let _b = list.insert("b", 2, 0);
        let back = list.back().unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn move_to_front_reorders_without_changing_len() {
        let mut list = List::new();
        let a = list.insert("a", 1, 0);
        let _b = list.insert("b", 2, 0);
        // SAFETY: `a` is linked in.
        unsafe { list.move_to_front(a) };
        assert_eq!(list.len(), 2);
        assert_ne!(list.back().unwrap(), a);
    }

    #[test]
    fn remove_unlinks_and_returns_entry() {
        let mut list = List::new();
        let a = list.insert("a", 1, 0);
        // SAFETY: `a` is linked in and not a sentinel.
        let entry = unsafe { list.remove(a) };
        assert_eq!(entry.value(), &1);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn drain_empties_the_list() {
        let mut list = List::new();
        list.insert("a", 1, 0);
        list.insert("b", 2, 0);
        let drained = list.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(list.len(), 0);
        assert!(list.back().is_none());
    }
}
