//! Per-type slab storage. Every item, node, connection, and piece of geometry in a map lives
//! in one of these; everything else refers to it by a generation-checked `Handle`.

use std::fmt;
use std::marker::PhantomData;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Refers to one object in an `Arena<T>`. A handle outlives the object it points to only as a
/// harmless stale value: lookups with it fail once the slot is recycled.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

// Derives would require T: Clone etc
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Handle<T> {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Handle<T>) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for Handle<T> {}
impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}
impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct Arena<T> {
    name: &'static str,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    pub fn new(name: &'static str) -> Arena<T> {
        Arena {
            name,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Pre-sizes storage for exactly `n` more objects, so a bulk load doesn't reallocate.
    /// Running out of memory is reported instead of aborting.
    pub fn reallocate(&mut self, n: usize) -> Result<()> {
        let wanted = n.saturating_sub(self.free.len());
        if let Err(err) = self.slots.try_reserve_exact(wanted) {
            bail!(
                "Out of memory reserving {} objects in the {} allocator: {}",
                n,
                self.name,
                err
            );
        }
        Ok(())
    }

    pub fn alloc(&mut self, value: T) -> Handle<T> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle {
                index,
                generation: slot.generation,
                _marker: PhantomData,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle {
            index,
            generation: 0,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, h: Handle<T>) -> Option<&T> {
        let slot = self.slots.get(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, h: Handle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Takes an object back, recycling its slot. The object is returned by value and dropped
    /// as its concrete type by the caller.
    pub fn hand_over(&mut self, h: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(h.index);
        self.live -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                        _marker: PhantomData,
                    },
                    value,
                )
            })
        })
    }

    /// Drops every object at once.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }

    /// Bytes reserved for slots, not counting anything the objects own.
    pub fn slot_memory(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Slot<T>>()
    }
}

impl<T: Default> Arena<T> {
    /// A fresh, default-initialized object.
    pub fn next_object(&mut self) -> Handle<T> {
        self.alloc(T::default())
    }
}
