// THEORY:
// The `arena` module is a recycling pool for retired `Position` records. The
// scan loop appends one position per entity per tick, and each append can
// evict one from the far end of a history; without pooling that is a steady
// drip of short-lived allocations across every tracked entity. The arena
// keeps a bounded free list of cleared records and hands them back out on
// demand, the same pop-or-allocate / bounded push-back shape the parallel
// service uses for its scan buffers.
//
// Key architectural principles:
// 1.  **Semantically Transparent**: The arena only changes the allocation
//     pattern, never the values callers read. Running with pooling disabled
//     must produce bit-identical classification results.
// 2.  **Cleared On Release**: Every released record is zeroed before it joins
//     the free list, so a recycled record is indistinguishable from a fresh
//     one and stale telemetry cannot leak between entities.
// 3.  **Bounded**: The free list never grows past `max_size`; overflow
//     releases simply drop the record. Acquire never fails; an empty free
//     list falls back to allocation.

use crate::core_modules::position::position::Position;

const DEFAULT_MAX_POOL_SIZE: usize = 500;

/// A bounded recycling pool of retired `Position` records.
pub struct PositionArena {
    /// Retired, cleared records awaiting reuse.
    free_list: Vec<Position>,
    /// Upper bound on the free list; overflow releases are dropped.
    max_size: usize,
    /// When false, acquire always allocates and release always drops.
    enabled: bool,
}

impl PositionArena {
    pub fn new(enabled: bool, max_size: usize) -> Self {
        Self {
            free_list: Vec::new(),
            max_size,
            enabled,
        }
    }

    /// Acquires a zero-valued record, reusing a retired one when available.
    pub fn acquire(&mut self) -> Position {
        if self.enabled {
            self.free_list.pop().unwrap_or_default()
        } else {
            Position::default()
        }
    }

    /// Retires a record: clears every field, then returns it to the free
    /// list if there is room, else drops it. Accepting records that did not
    /// originate from this arena is harmless.
    pub fn release(&mut self, mut record: Position) {
        if self.enabled && self.free_list.len() < self.max_size {
            record.clear();
            self.free_list.push(record);
        }
    }

    /// The number of records currently parked on the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

impl Default for PositionArena {
    fn default() -> Self {
        Self::new(true, DEFAULT_MAX_POOL_SIZE)
    }
}
