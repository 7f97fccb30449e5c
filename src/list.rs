use std::{marker::PhantomData, ptr::NonNull};

/// Non-null pointer to `T`.
pub(crate) type Link<T> = Option<NonNull<T>>;

/// Intrusive list node. The node lives inside the memory it describes, so
/// the list itself never allocates.
#[repr(C)]
pub(crate) struct Node<T> {
    /// Element of the node
    pub data: T,
    /// Pointer to the next node of the list
    pub next: Link<Self>,
    /// Pointer to the previous node of the list
    pub prev: Link<Self>,
}

/// Doubly linked list of nodes kept sorted by memory address, lowest first.
///
/// Keeping the order by address means two members that touch in memory are
/// always list neighbours, which is what lets the allocator merge them with
/// a local check instead of a search.
pub(crate) struct List<T> {
    head: Link<Node<T>>,
    tail: Link<Node<T>>,
    len: usize,
    marker: PhantomData<T>,
}

pub(crate) struct Iter<'a, T> {
    current: Link<Node<T>>,
    remaining: usize,
    marker: PhantomData<&'a T>,
}

impl<T> Node<T> {
    pub const fn new(data: T) -> Self {
        Self { data, next: None, prev: None }
    }
}

impl<T> List<T> {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Links `node` into the list right before the first member with a
    /// greater address.
    ///
    /// Both ends are checked first since blocks released in allocation
    /// order usually land there, so the walk is only needed for interior
    /// positions.
    ///
    /// **SAFETY**: `node` must point to a valid, writable [`Node`] that is
    /// not currently a member of any list.
    pub unsafe fn insert(&mut self, mut node: NonNull<Node<T>>) {
        unsafe {
            let (Some(mut head), Some(mut tail)) = (self.head, self.tail) else {
                node.as_mut().next = None;
                node.as_mut().prev = None;
                self.head = Some(node);
                self.tail = Some(node);
                self.len = 1;
                return;
            };

            if node < head {
                node.as_mut().prev = None;
                node.as_mut().next = Some(head);
                head.as_mut().prev = Some(node);
                self.head = Some(node);
            } else if node > tail {
                node.as_mut().next = None;
                node.as_mut().prev = Some(tail);
                tail.as_mut().next = Some(node);
                self.tail = Some(node);
            } else {
                // head < node < tail, so there is always a greater member.
                let mut prev = head;
                let mut current = head.as_ref().next;

                while let Some(mut greater) = current {
                    if greater > node {
                        node.as_mut().prev = Some(prev);
                        node.as_mut().next = Some(greater);
                        prev.as_mut().next = Some(node);
                        greater.as_mut().prev = Some(node);
                        break;
                    }

                    prev = greater;
                    current = greater.as_ref().next;
                }
            }

            self.len += 1;
        }
    }

    /// Unlinks `node` from the list, fixing up `head` and `tail` when it
    /// was one of the ends.
    ///
    /// **SAFETY**: `node` must currently be a member of this list.
    pub unsafe fn remove(&mut self, mut node: NonNull<Node<T>>) {
        unsafe {
            let prev = node.as_ref().prev;
            let next = node.as_ref().next;

            match prev {
                Some(mut prev) => prev.as_mut().next = next,
                None => self.head = next,
            }

            match next {
                Some(mut next) => next.as_mut().prev = prev,
                None => self.tail = prev,
            }

            node.as_mut().next = None;
            node.as_mut().prev = None;
        }

        self.len -= 1;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            current: self.head,
            remaining: self.len,
            marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = NonNull<Node<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;

        unsafe {
            self.current = node.as_ref().next;
            self.remaining -= 1;
        }

        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = NonNull<Node<T>>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
