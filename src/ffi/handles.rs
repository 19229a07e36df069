//! Handle types for opaque references to native entities.
//!
//! The host only ever sees a `u64` token. Tokens index a process-wide slot
//! table; the upper 32 bits carry the slot generation so that a token kept
//! after `destroy` no longer resolves, even once the slot is reused.

use std::any::{Any, TypeId};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::error::{Error, Result};
use crate::store;

/// A native type that may be stored behind a [`Handle`].
pub trait Entity: Clone + Send + 'static {
    /// Class name used as the type tag and command prefix.
    const CLASS: &'static str;

    /// Last modification time, seconds since the Unix epoch.
    fn updated_at(&self) -> store::Result<i64>;
}

trait ErasedEntity: Send {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn ErasedEntity>;
    fn updated_at(&self) -> store::Result<i64>;
}

impl<T: Entity> ErasedEntity for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ErasedEntity> {
        Box::new(self.clone())
    }

    fn updated_at(&self) -> store::Result<i64> {
        Entity::updated_at(self)
    }
}

struct Cell {
    type_id: TypeId,
    class: &'static str,
    value: Box<dyn ErasedEntity>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    cell: Option<Cell>,
}

struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

static TABLE: Mutex<HandleTable> = Mutex::new(HandleTable {
    slots: Vec::new(),
    free: Vec::new(),
});

fn table() -> MutexGuard<'static, HandleTable> {
    TABLE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn encode(index: usize, generation: u32) -> u64 {
    (u64::from(generation) << 32) | (index as u64 + 1)
}

fn decode(token: u64) -> Option<(usize, u32)> {
    let low = token & 0xffff_ffff;
    if low == 0 {
        return None;
    }
    Some(((low - 1) as usize, (token >> 32) as u32))
}

impl HandleTable {
    fn insert(&mut self, cell: Cell) -> u64 {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.cell = Some(cell);
        encode(index, slot.generation)
    }

    fn resolve(&self, token: u64) -> Result<&Cell> {
        let (index, generation) = decode(token).ok_or(Error::InvalidHandle(token))?;
        let slot = self.slots.get(index).ok_or(Error::InvalidHandle(token))?;
        if slot.generation != generation {
            return Err(Error::EmptyHandle(token));
        }
        slot.cell.as_ref().ok_or(Error::EmptyHandle(token))
    }

    fn remove(&mut self, token: u64) -> Result<Cell> {
        self.resolve(token)?;
        let (index, _) = decode(token).ok_or(Error::InvalidHandle(token))?;
        let slot = &mut self.slots[index];
        let cell = slot.cell.take().ok_or(Error::EmptyHandle(token))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Ok(cell)
    }
}

/// Opaque, type-tagged reference to a native entity.
///
/// A `Handle` is a non-owning alias of a table cell: copies refer to the same
/// cell, and exactly one [`Handle::destroy`] retires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    token: u64,
}

impl Handle {
    /// Store `value` in a new cell tagged with its class.
    pub fn new<T: Entity>(value: T) -> Self {
        let cell = Cell {
            type_id: TypeId::of::<T>(),
            class: T::CLASS,
            value: Box::new(value),
        };
        let token = table().insert(cell);
        trace!(token, class = T::CLASS, "handle created");
        Self { token }
    }

    /// View the cell named by a token previously returned by [`Handle::address`].
    ///
    /// Never fails; tokens are validated on use.
    pub const fn from_token(token: u64) -> Self {
        Self { token }
    }

    /// Create an invalid (null) handle.
    pub const fn invalid() -> Self {
        Self { token: 0 }
    }

    /// The token handed to the host. Unchanged by `destroy`.
    pub const fn address(&self) -> u64 {
        self.token
    }

    /// Check if this handle currently names a live cell.
    pub fn is_live(&self) -> bool {
        table().resolve(self.token).is_ok()
    }

    /// Class tag of the stored entity.
    pub fn class_name(&self) -> Result<&'static str> {
        table().resolve(self.token).map(|cell| cell.class)
    }

    /// Recover a copy of the stored entity.
    pub fn get<T: Entity>(&self) -> Result<T> {
        let table = table();
        let cell = table.resolve(self.token)?;
        if cell.type_id != TypeId::of::<T>() {
            return Err(Error::TypeMismatch {
                expected: T::CLASS,
                found: cell.class,
            });
        }
        cell.value
            .as_any()
            .downcast_ref::<T>()
            .cloned()
            .ok_or(Error::TypeMismatch {
                expected: T::CLASS,
                found: cell.class,
            })
    }

    /// Last modification time of the stored entity, whatever its class.
    pub fn updated_at(&self) -> Result<i64> {
        let value = table().resolve(self.token)?.value.clone_box();
        Ok(value.updated_at()?)
    }

    /// Release the stored entity and retire the cell.
    ///
    /// Any later use of this token fails with [`Error::EmptyHandle`].
    pub fn destroy(&self) -> Result<()> {
        let cell = table().remove(self.token)?;
        trace!(token = self.token, class = cell.class, "handle destroyed");
        drop(cell);
        Ok(())
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Number of live handle cells in this process.
pub fn live_handles() -> usize {
    table().slots.iter().filter(|s| s.cell.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Probe(u32);

    impl Entity for Probe {
        const CLASS: &'static str = "Probe";

        fn updated_at(&self) -> store::Result<i64> {
            Ok(i64::from(self.0))
        }
    }

    #[derive(Clone, Debug)]
    struct Other;

    impl Entity for Other {
        const CLASS: &'static str = "Other";

        fn updated_at(&self) -> store::Result<i64> {
            Ok(0)
        }
    }

    #[test]
    fn test_get_matching_type() {
        let h = Handle::new(Probe(7));
        assert_eq!(h.get::<Probe>().unwrap(), Probe(7));
        assert_eq!(h.class_name().unwrap(), "Probe");
        h.destroy().unwrap();
    }

    #[test]
    fn test_get_wrong_type() {
        let h = Handle::new(Probe(1));
        let err = h.get::<Other>().unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "Other",
                found: "Probe"
            }
        ));
        h.destroy().unwrap();
    }

    #[test]
    fn test_token_round_trip() {
        let h = Handle::new(Probe(3));
        let again = Handle::from_token(h.address());
        assert_eq!(again.get::<Probe>().unwrap(), Probe(3));
        assert_eq!(again.updated_at().unwrap(), 3);
        h.destroy().unwrap();
    }

    #[test]
    fn test_destroy_keeps_token_and_empties_cell() {
        let h = Handle::new(Probe(5));
        let before = h.address();
        h.destroy().unwrap();
        assert_eq!(h.address(), before);
        assert!(!h.is_live());
        assert!(matches!(h.get::<Probe>(), Err(Error::EmptyHandle(t)) if t == before));
        assert!(matches!(h.destroy(), Err(Error::EmptyHandle(_))));
    }

    #[test]
    fn test_reused_slot_rejects_stale_token() {
        let stale = Handle::new(Probe(1));
        stale.destroy().unwrap();
        // Allocate until the retired slot is handed out again.
        let fresh: Vec<Handle> = (0..8).map(|i| Handle::new(Probe(i))).collect();
        assert!(fresh.iter().all(|h| h.address() != stale.address()));
        assert!(matches!(stale.get::<Probe>(), Err(Error::EmptyHandle(_))));
        for h in fresh {
            h.destroy().unwrap();
        }
    }

    #[test]
    fn test_forged_tokens() {
        assert!(matches!(
            Handle::invalid().get::<Probe>(),
            Err(Error::InvalidHandle(0))
        ));
        let forged = Handle::from_token(0xffff_fff0);
        assert!(matches!(forged.get::<Probe>(), Err(Error::InvalidHandle(_))));
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(decode(encode(0, 0)), Some((0, 0)));
        assert_eq!(decode(encode(41, 9)), Some((41, 9)));
        assert_eq!(decode(0), None);
    }
}
