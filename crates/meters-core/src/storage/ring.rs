//! Fixed-capacity circular buffers.
//!
//! [`Cursor`] owns the wraparound arithmetic so call sites never reduce an
//! index by hand; [`CursorRing`] pairs one with a `[T; N]` arena. Both the
//! slots and the cursor position are part of the persisted record.

/// Position in a ring of `N` slots, always `< N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor<const N: usize> {
    index: u16,
}

impl<const N: usize> Cursor<N> {
    /// Creates a cursor at `index`, wrapping it into range.
    pub const fn new(index: usize) -> Self {
        Self {
            index: (index % N) as u16,
        }
    }

    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Moves one slot forward and returns the new position.
    pub fn advance(&mut self) -> usize {
        self.index = ((self.index as usize + 1) % N) as u16;
        self.index()
    }
}

/// `N` slots written in cursor order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorRing<T: Copy, const N: usize> {
    slots: [T; N],
    cursor: Cursor<N>,
}

impl<T: Copy, const N: usize> CursorRing<T, N> {
    /// Ring with every slot set to `value` and the cursor at 0.
    pub const fn filled(value: T) -> Self {
        Self {
            slots: [value; N],
            cursor: Cursor::new(0),
        }
    }

    pub const fn from_parts(slots: [T; N], cursor: Cursor<N>) -> Self {
        Self { slots, cursor }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub const fn cursor(&self) -> Cursor<N> {
        self.cursor
    }

    /// Moves the cursor forward one slot. The slot contents are untouched.
    pub fn advance(&mut self) -> usize {
        self.cursor.advance()
    }

    pub fn current(&self) -> &T {
        &self.slots[self.cursor.index()]
    }

    /// Replaces the slot under the cursor.
    pub fn set_current(&mut self, value: T) {
        self.slots[self.cursor.index()] = value;
    }

    /// Overwrites every slot; the cursor stays where it is.
    pub fn fill(&mut self, value: T) {
        self.slots = [value; N];
    }

    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// Slots in storage order (not cursor order).
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.slots.iter()
    }
}

impl<'a, T: Copy, const N: usize> IntoIterator for &'a CursorRing<T, N> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
