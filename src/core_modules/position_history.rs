// THEORY:
// The `PositionHistory` module is the engine's short-term spatial memory. Each
// tracked entity owns one: a bounded, chronologically ordered window of the
// positions it was last observed at. The window is the raw material for the
// pattern matcher, which needs pairs of adjacent samples to form movement
// vectors.
//
// Key architectural principles:
// 1.  **Bounded FIFO**: Capacity is fixed at construction. Appending to a
//     full window evicts the oldest entry first, so the contents are always
//     exactly the last `capacity` samples in arrival order, oldest at the
//     front.
// 2.  **Arena-Backed**: Evicted records are retired into the `PositionArena`
//     and appended records are drawn from it, keeping steady-state appends
//     allocation-free without changing any observable value.
// 3.  **Value Copies Only**: The window stores copies of sampled positions,
//     never references into caller data. Readers get copies back; nothing in
//     the window can alias live caller state.

use crate::core_modules::arena::PositionArena;
use crate::core_modules::position::position::Position;
use std::collections::VecDeque;

/// A bounded, ordered window of an entity's recent positions.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    /// The stored samples, oldest at the front.
    entries: VecDeque<Position>,
    /// Fixed upper bound on `entries`.
    capacity: usize,
}

impl PositionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a value copy of `sampled`, evicting and retiring the oldest
    /// entry first when the window is full.
    pub fn append(&mut self, sampled: Position, arena: &mut PositionArena) {
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                arena.release(evicted);
            }
        }

        let mut record = arena.acquire();
        record.x = sampled.x;
        record.y = sampled.y;
        record.z = sampled.z;
        self.entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently appended position.
    pub fn last(&self) -> Option<Position> {
        self.entries.back().copied()
    }

    /// The position appended immediately before the last one.
    pub fn second_last(&self) -> Option<Position> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.get(self.entries.len() - 2).copied()
    }

    /// Indexed access, oldest entry at index 0.
    pub fn get(&self, index: usize) -> Option<Position> {
        self.entries.get(index).copied()
    }
}
