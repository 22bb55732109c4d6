// SmartWake - Fixed-Capacity History Buffer
//
// Overwrite-oldest circular store for epoch scores. Storage is reserved once
// at construction and never grows; callers only see logical indices
// (0 = newest).

use crate::error::WakeError;

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Slot the next push writes to.
    head: usize,
    len: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// Reserve storage for `capacity` samples.
    ///
    /// Returns [`WakeError::AllocationFailure`] when the allocator refuses the
    /// request instead of aborting the process.
    pub fn with_capacity(capacity: usize) -> Result<Self, WakeError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| WakeError::AllocationFailure { capacity })?;

        log::debug!(
            "Allocated {} B history buffer",
            capacity * core::mem::size_of::<T>()
        );

        Ok(Self {
            data,
            capacity,
            head: 0,
            len: 0,
        })
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }

        if self.data.len() < self.capacity {
            self.data.push(item);
        } else {
            self.data[self.head] = item;
        }
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Sample `index` positions behind the newest one.
    pub fn peek(&self, index: usize) -> Result<T, WakeError> {
        if index >= self.len {
            return Err(WakeError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        let slot = (self.head + self.capacity - 1 - index) % self.capacity;
        Ok(self.data[slot])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.len == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).filter_map(move |i| self.peek(i).ok())
    }

    /// Forget all samples but keep the storage.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
        self.len = 0;
    }

    /// Return the storage to the allocator. The buffer behaves as an empty,
    /// zero-capacity buffer afterwards.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.capacity = 0;
        self.head = 0;
        self.len = 0;
    }
}
