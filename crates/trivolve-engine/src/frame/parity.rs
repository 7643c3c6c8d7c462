use std::ops::{Index, IndexMut};

/// Logical role of a generation buffer within one frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GenerationSlot {
    /// Rendered, graded and read by evolve.
    Current,
    /// Written by evolve; becomes `Current` next frame.
    Next,
}

/// Physical buffer indices for one frame, computed once from the frame index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GenerationRoles {
    pub current: usize,
    pub next: usize,
}

impl GenerationRoles {
    pub fn for_frame(frame_index: u64) -> Self {
        let current = (frame_index % 2) as usize;
        Self {
            current,
            next: 1 - current,
        }
    }

    pub fn physical(self, slot: GenerationSlot) -> usize {
        match slot {
            GenerationSlot::Current => self.current,
            GenerationSlot::Next => self.next,
        }
    }
}

/// A pair of values addressed by [`GenerationRoles`].
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
}

impl<T> PingPong<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
        }
    }

    pub fn get(&self, roles: GenerationRoles, slot: GenerationSlot) -> &T {
        &self.slots[roles.physical(slot)]
    }

    pub fn get_mut(&mut self, roles: GenerationRoles, slot: GenerationSlot) -> &mut T {
        &mut self.slots[roles.physical(slot)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

impl<T> Index<usize> for PingPong<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.slots[index]
    }
}

impl<T> IndexMut<usize> for PingPong<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.slots[index]
    }
}
