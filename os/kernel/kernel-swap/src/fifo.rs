use alloc::boxed::Box;
use alloc::vec;

/// Fixed-capacity circular FIFO.
///
/// Storage is allocated once; pushing onto a full ring hands the value back
/// instead of growing.
///
/// ### Invariants
/// - `len <= slots.len()`
/// - logical element `i` lives at `slots[(head + i) % slots.len()]`, and
///   exactly those `len` slots are `Some`.
#[derive(Debug, Clone)]
pub struct FifoRing<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    len: usize,
}

impl<T: Copy> FifoRing<T> {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    #[inline]
    fn physical(&self, i: usize) -> usize {
        (self.head + i) % self.slots.len()
    }

    /// Append at the tail.
    ///
    /// # Errors
    /// Returns `value` back if the ring is full.
    pub fn push_back(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        let at = self.physical(self.len);
        self.slots[at] = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Remove from the head.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        value
    }

    #[must_use]
    pub fn front(&self) -> Option<T> {
        self.get(0)
    }

    /// Element at logical position `i` (0 = head).
    #[must_use]
    pub fn get(&self, i: usize) -> Option<T> {
        if i >= self.len {
            return None;
        }
        self.slots[self.physical(i)]
    }

    /// Logical position of the first element matching `pred`.
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter().position(|v| pred(&v))
    }

    /// Remove the element at logical position `i`, closing the gap.
    pub fn remove(&mut self, i: usize) -> Option<T> {
        if i >= self.len {
            return None;
        }
        if i == 0 {
            return self.pop_front();
        }
        let value = self.slots[self.physical(i)].take();
        for j in i..self.len - 1 {
            let (to, from) = (self.physical(j), self.physical(j + 1));
            self.slots[to] = self.slots[from].take();
        }
        self.len -= 1;
        value
    }

    /// Insert `value` at logical position `i`, shifting later elements back.
    ///
    /// # Errors
    /// Returns `value` back if the ring is full or `i > len`.
    pub fn insert(&mut self, i: usize, value: T) -> Result<(), T> {
        if self.is_full() || i > self.len {
            return Err(value);
        }
        for j in (i..self.len).rev() {
            let (to, from) = (self.physical(j + 1), self.physical(j));
            self.slots[to] = self.slots[from].take();
        }
        let at = self.physical(i);
        self.slots[at] = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Elements from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).filter_map(move |i| self.slots[self.physical(i)])
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.head = 0;
        self.len = 0;
    }
}
