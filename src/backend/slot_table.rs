//! Fixed-capacity slot table with free-list reuse and generation checks

use crate::backend::handle::{ResourceKind, SlotHandle};
use crate::backend::traits::{GraphicsError, GraphicsResult};
use std::marker::PhantomData;

struct Slot<T> {
    value: Option<T>,
    generation: u16,
}

/// Per-kind table of backend records addressed by generation-checked handles.
///
/// Capacity is fixed when the device is created. Every release bumps the
/// slot's generation so handles issued before the release stop resolving.
/// A slot whose generation would wrap past `u16::MAX` is retired instead of
/// being reused.
pub struct SlotTable<H: SlotHandle, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u16>,
    capacity: usize,
    retired: usize,
    _handle: PhantomData<H>,
}

impl<H: SlotHandle, T> SlotTable<H, T> {
    /// `capacity` must not exceed the 16-bit index space.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity <= u16::MAX as usize + 1);
        Self {
            slots: Vec::with_capacity(capacity.min(64)),
            free: Vec::new(),
            capacity,
            retired: 0,
            _handle: PhantomData,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        H::KIND
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len() - self.retired
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a record, reusing a freed slot first.
    pub fn allocate(&mut self, value: T) -> GraphicsResult<H> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Ok(H::from_parts(index, slot.generation));
        }

        if self.slots.len() >= self.capacity {
            log::error!("{} table exhausted (capacity {})", H::KIND, self.capacity);
            return Err(GraphicsError::CapacityExceeded {
                kind: H::KIND,
                capacity: self.capacity,
            });
        }

        let index = self.slots.len() as u16;
        self.slots.push(Slot {
            value: Some(value),
            generation: 0,
        });
        Ok(H::from_parts(index, 0))
    }

    /// Take the record out, invalidating every outstanding copy of `handle`.
    pub fn release(&mut self, handle: H) -> GraphicsResult<T> {
        let slot = self
            .slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation() && slot.value.is_some())
            .ok_or_else(|| stale(handle))?;

        let value = slot.value.take().ok_or_else(|| stale(handle))?;
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.free.push(handle.index());
            }
            None => {
                log::warn!(
                    "{} slot {} exhausted its generations, retiring it",
                    H::KIND,
                    handle.index()
                );
                self.retired += 1;
            }
        }
        Ok(value)
    }

    pub fn resolve(&self, handle: H) -> GraphicsResult<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| stale(handle))
    }

    pub fn resolve_mut(&mut self, handle: H) -> GraphicsResult<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
            .ok_or_else(|| stale(handle))
    }

    pub fn contains(&self, handle: H) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Live records with their current handles
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (H::from_parts(index as u16, slot.generation), value))
        })
    }

    /// Release every live record (device teardown).
    pub fn drain(&mut self) -> Vec<T> {
        let live: Vec<H> = self.iter().map(|(handle, _)| handle).collect();
        live.into_iter()
            .filter_map(|handle| self.release(handle).ok())
            .collect()
    }
}

fn stale<H: SlotHandle>(handle: H) -> GraphicsError {
    GraphicsError::StaleHandle {
        kind: H::KIND,
        index: handle.index(),
        generation: handle.generation(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::handle::BufferHandle;

    #[test]
    fn test_reuse_bumps_generation() {
        let mut table: SlotTable<BufferHandle, &str> = SlotTable::new(4);
        let first = table.allocate("a").unwrap();
        assert_eq!(table.release(first).unwrap(), "a");

        let second = table.allocate("b").unwrap();
        assert_eq!(second.index(), first.index());
        assert_eq!(second.generation(), first.generation() + 1);
        assert!(matches!(table.resolve(first), Err(GraphicsError::StaleHandle { .. })));
        assert_eq!(*table.resolve(second).unwrap(), "b");
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut table: SlotTable<BufferHandle, u32> = SlotTable::new(3);
        let handles: Vec<_> = (0..3).map(|i| table.allocate(i).unwrap()).collect();
        let err = table.allocate(99).unwrap_err();
        assert!(matches!(err, GraphicsError::CapacityExceeded { capacity: 3, .. }));
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(*table.resolve(*handle).unwrap(), i as u32);
        }
    }

    #[test]
    fn test_double_release_is_stale() {
        let mut table: SlotTable<BufferHandle, ()> = SlotTable::new(1);
        let handle = table.allocate(()).unwrap();
        table.release(handle).unwrap();
        assert!(table.release(handle).is_err());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_out_of_range_handle_is_stale() {
        let table: SlotTable<BufferHandle, ()> = SlotTable::new(1);
        assert!(table.resolve(BufferHandle::from_parts(10, 0)).is_err());
    }

    #[test]
    fn test_slot_retired_when_generation_exhausted() {
        let mut table: SlotTable<BufferHandle, ()> = SlotTable::new(1);
        for expected in 0..u16::MAX {
            let handle = table.allocate(()).unwrap();
            assert_eq!(handle.generation(), expected);
            table.release(handle).unwrap();
        }
        let last = table.allocate(()).unwrap();
        assert_eq!(last.generation(), u16::MAX);
        table.release(last).unwrap();

        assert!(table.allocate(()).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_iter_and_drain() {
        let mut table: SlotTable<BufferHandle, u32> = SlotTable::new(4);
        let a = table.allocate(1).unwrap();
        let b = table.allocate(2).unwrap();
        table.release(a).unwrap();
        let live: Vec<_> = table.iter().collect();
        assert_eq!(live, vec![(b, &2)]);

        assert_eq!(table.drain(), vec![2]);
        assert!(table.is_empty());
        assert!(table.resolve(b).is_err());
    }
}
