//! # Slab de Objetos do Kernel
//!
//! Liga um [`KSlabHeap<T>`] ao ciclo de vida dos `KAutoObject`s: `create`
//! constrói o objeto em um slot livre e o associa a este slab como storage;
//! quando o último `close` acontece, [`ObjectStorage::release`] destrói o
//! objeto no lugar e devolve o slot.

use super::KSlabHeap;
use crate::core::object::{KAutoObject, KObjectType, KScopedAutoObject, ObjectStorage};
use crate::mm::arena::KPageArena;
use crate::sys::error::{KResult, KernelError};
use core::ptr::NonNull;

pub struct KObjectSlab<T: KObjectType> {
    heap: KSlabHeap<T>,
}

impl<T: KObjectType> KObjectSlab<T> {
    pub fn new(arena: &KPageArena, capacity: usize) -> KResult<Self> {
        Ok(Self {
            heap: KSlabHeap::new(arena, capacity)?,
        })
    }

    /// Constrói `value` em um slot. `OutOfResource` se o slab está cheio.
    pub fn create(&'static self, value: T) -> KResult<KScopedAutoObject<T>> {
        let slot = match self.heap.allocate() {
            Some(slot) => slot,
            None => {
                crate::kwarn!("(Slab) Slab de objetos esgotado, tipo=", T::KIND as u8);
                return Err(KernelError::OutOfResource);
            }
        };

        // SAFETY: Slot livre, alinhado e do tamanho de `T`
        unsafe { slot.as_ptr().write(value) };
        // SAFETY: Acabou de ser inicializado
        let object = unsafe { slot.as_ref() };
        object.base().bind_storage(self);

        // SAFETY: O objeto nasce com refcount 1, que passa a ser do chamador
        Ok(unsafe { KScopedAutoObject::from_raw(slot) })
    }

    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.heap.contains(ptr.cast())
    }

    pub fn total_size(&self) -> usize {
        self.heap.total_size()
    }

    pub fn used_size(&self) -> usize {
        self.heap.used_size()
    }

    pub fn free_size(&self) -> usize {
        self.heap.free_size()
    }
}

impl<T: KObjectType> ObjectStorage for KObjectSlab<T> {
    unsafe fn release(&self, object: NonNull<dyn KAutoObject>) {
        let ptr = object.cast::<T>();
        core::ptr::drop_in_place(ptr.as_ptr());
        self.heap.free(ptr);
    }
}
