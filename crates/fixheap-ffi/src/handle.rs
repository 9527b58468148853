//! Generational handle table backing the opaque `u64` heap handles.
//!
//! A handle packs a slot index (high 32 bits) and the slot's generation
//! (low 32 bits). Destroying a heap bumps the generation, so stale or
//! repeated handles resolve to `None` instead of another caller's heap.

fn pack(index: u32, generation: u32) -> u64 {
    (u64::from(index) << 32) | u64::from(generation)
}

fn unpack(handle: u64) -> (usize, u32) {
    ((handle >> 32) as usize, handle as u32)
}

enum Entry<T> {
    Occupied { generation: u32, value: T },
    /// `next_vacant` chains reusable slots, most recently vacated first.
    Vacant { generation: u32, next_vacant: Option<u32> },
    /// Generation space exhausted; never reused.
    Retired,
}

/// Slots addressed by packed handles, with vacated slots chained for reuse.
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    first_vacant: Option<u32>,
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            first_vacant: None,
        }
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> u64 {
        if let Some(index) = self.first_vacant {
            let entry = &mut self.entries[index as usize];
            if let Entry::Vacant {
                generation,
                next_vacant,
            } = *entry
            {
                self.first_vacant = next_vacant;
                *entry = Entry::Occupied { generation, value };
                return pack(index, generation);
            }
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });
        pack(index, 0)
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        let (index, wanted) = unpack(handle);
        match self.entries.get(index)? {
            Entry::Occupied { generation, value } if *generation == wanted => Some(value),
            _ => None,
        }
    }

    /// Take the value out, invalidating `handle` and every copy of it.
    pub fn remove(&mut self, handle: u64) -> Option<T> {
        let (index, wanted) = unpack(handle);
        let entry = self.entries.get_mut(index)?;
        match entry {
            Entry::Occupied { generation, .. } if *generation == wanted => {}
            _ => return None,
        }
        let next = match wanted.checked_add(1) {
            Some(generation) => Entry::Vacant {
                generation,
                next_vacant: self.first_vacant,
            },
            None => Entry::Retired,
        };
        let reusable = matches!(next, Entry::Vacant { .. });
        let Entry::Occupied { value, .. } = std::mem::replace(entry, next) else {
            return None;
        };
        if reusable {
            self.first_vacant = Some(index as u32);
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let mut table = HandleTable::new();
        let h = table.insert("a");
        assert_eq!(table.get(h), Some(&"a"));
    }

    #[test]
    fn removed_handle_is_stale() {
        let mut table = HandleTable::new();
        let h = table.insert(7u8);
        assert_eq!(table.remove(h), Some(7));
        assert_eq!(table.get(h), None);
        assert_eq!(table.remove(h), None);
    }

    #[test]
    fn vacated_slot_is_reused_with_new_generation() {
        let mut table = HandleTable::new();
        let first = table.insert(1u8);
        table.remove(first);
        let second = table.insert(2u8);
        assert_eq!(unpack(first).0, unpack(second).0);
        assert_eq!(unpack(second).1, unpack(first).1 + 1);
        assert_eq!(table.get(first), None);
        assert_eq!(table.get(second), Some(&2));
    }

    #[test]
    fn vacant_slots_reuse_most_recent_first() {
        let mut table = HandleTable::new();
        let a = table.insert('a');
        let b = table.insert('b');
        table.remove(a);
        table.remove(b);
        assert_eq!(unpack(table.insert('c')).0, 1);
        assert_eq!(unpack(table.insert('d')).0, 0);
        assert_eq!(unpack(table.insert('e')).0, 2);
    }

    #[test]
    fn unknown_slot_is_none() {
        let table: HandleTable<u8> = HandleTable::new();
        assert_eq!(table.get(pack(12, 0)), None);
    }

    #[test]
    fn exhausted_generation_retires_slot() {
        let mut table = HandleTable::new();
        let h = table.insert(1u8);
        table.remove(h);
        table.entries[0] = Entry::Vacant {
            generation: u32::MAX,
            next_vacant: None,
        };
        let last = table.insert(2u8);
        assert_eq!(unpack(last), (0, u32::MAX));
        assert_eq!(table.remove(last), Some(2));
        assert!(matches!(table.entries[0], Entry::Retired));
        assert_eq!(table.get(pack(0, 0)), None);
        assert_eq!(unpack(table.insert(3u8)).0, 1);
    }
}
