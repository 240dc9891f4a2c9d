/// A key into a [`Slab`].
///
/// Keys carry the generation of the slot they were issued for. Once the
/// slot is freed and reused, the old key no longer resolves, which lets
/// holders of stale keys (for example a cancellation handle whose
/// operation already fired) fail harmlessly instead of hitting an
/// unrelated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlabKey {
    index: usize,
    generation: u64,
}

enum Slot<T> {
    Occupied { generation: u64, value: T },
    Vacant { generation: u64 },
}

/// A generational slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and
/// returns keys that can be reused after removal without aliasing.
///
/// Internally, it keeps track of:
/// - occupied and vacant slots, each tagged with a generation,
/// - and a stack of free indices.
pub(crate) struct Slab<T> {
    /// Storage for items.
    slots: Vec<Slot<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with room for `size` items before growing.
    pub(crate) fn new(size: usize) -> Self {
        let slots = (0..size).map(|_| Slot::Vacant { generation: 0 }).collect();
        let free = (0..size).rev().collect();

        Self {
            slots,
            free,
            len: 0,
        }
    }

    /// Inserts a value into the slab and returns its key.
    ///
    /// If a free slot is available, it is reused with a bumped
    /// generation. Otherwise, the slab grows exponentially.
    pub(crate) fn insert(&mut self, value: T) -> SlabKey {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                let len = self.slots.len();
                let new_len = if len == 0 { 1 } else { 2 * len };

                self.slots
                    .extend((len..new_len).map(|_| Slot::Vacant { generation: 0 }));
                self.free.extend(((len + 1)..new_len).rev());

                len
            }
        };

        let generation = match self.slots[index] {
            Slot::Vacant { generation } => generation,
            Slot::Occupied { .. } => unreachable!("free list pointed at an occupied slot"),
        };

        self.slots[index] = Slot::Occupied { generation, value };
        self.len += 1;

        SlabKey { index, generation }
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` if the key is stale or was never issued by this slab.
    pub(crate) fn remove(&mut self, key: SlabKey) -> Option<T> {
        match self.slots.get(key.index) {
            Some(Slot::Occupied { generation, .. }) if *generation == key.generation => {}
            _ => return None,
        }

        let vacated = Slot::Vacant {
            generation: key.generation.wrapping_add(1),
        };

        match std::mem::replace(&mut self.slots[key.index], vacated) {
            Slot::Occupied { value, .. } => {
                self.free.push(key.index);
                self.len -= 1;
                Some(value)
            }
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns a reference to the value stored under `key`, if still live.
    pub(crate) fn get(&self, key: SlabKey) -> Option<&T> {
        match self.slots.get(key.index) {
            Some(Slot::Occupied { generation, value }) if *generation == key.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn insert_and_remove() {
        let mut slab = Slab::new(1);
        let key = slab.insert(10);

        assert_eq!(slab.get(key), Some(&10));
        assert_eq!(slab.remove(key), Some(10));
        assert!(slab.is_empty());
    }

    #[test]
    fn stale_key_does_not_resolve_after_reuse() {
        let mut slab = Slab::new(1);
        let old = slab.insert("first");
        slab.remove(old);

        let new = slab.insert("second");

        assert_eq!(slab.get(old), None);
        assert_eq!(slab.remove(old), None);
        assert_eq!(slab.get(new), Some(&"second"));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut slab = Slab::new(0);
        let keys: Vec<_> = (0..10).map(|i| slab.insert(i)).collect();

        assert_eq!(slab.len(), 10);
        for (i, key) in keys.into_iter().enumerate() {
            assert_eq!(slab.remove(key), Some(i));
        }
        assert!(slab.is_empty());
    }
}
