//! # Alloc - Slab Heaps
//!
//! Pools de slots de tamanho fixo para os objetos do kernel.
//!
//! | Tipo                | Free list             | Quando                         |
//! |---------------------|-----------------------|--------------------------------|
//! | `KSlabHeapAtomic`   | CAS com tag (ABA)     | `lock_free_slab` no alvo       |
//! | `KDynamicSlabHeap`  | Ticket spinlock       | Demais alvos / estatísticas    |
//! | `KSlabHeap<T>`      | Escolhe um dos dois   | Front end tipado               |
//! | `KObjectSlab<T>`    | `KSlabHeap<T>`        | Storage de `KAutoObject`s      |
//!
//! A capacidade é fixa na criação: dada em slots (`new`) ou derivada do
//! tamanho da região (`with_region_size`). Esgotado, `allocate` devolve `None`.

pub mod dynamic_slab;
pub mod object_slab;
pub mod slab;

pub use dynamic_slab::KDynamicSlabHeap;
pub use object_slab::KObjectSlab;
pub use slab::{KSlabHeapAtomic, SlabBlock};

use crate::arch::TargetCapabilities;
use crate::mm::arena::KPageArena;
use crate::sys::error::KResult;
use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;

enum SlabStrategy {
    LockFree(KSlabHeapAtomic),
    Locked(KDynamicSlabHeap),
}

/// Slab heap tipado para `T`.
pub struct KSlabHeap<T> {
    inner: SlabStrategy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> KSlabHeap<T> {
    /// Cria o heap com a estratégia adequada ao alvo atual.
    pub fn new(arena: &KPageArena, capacity: usize) -> KResult<Self> {
        Self::with_capabilities(arena, capacity, TargetCapabilities::current())
    }

    /// Cria o heap ocupando até `region_size` bytes da arena.
    ///
    /// Capacidade = `region_size / tamanho do slot`. `OutOfRange` se nem um
    /// slot cabe na região.
    pub fn with_region_size(arena: &KPageArena, region_size: usize) -> KResult<Self> {
        Self::new(arena, Self::capacity_for(region_size))
    }

    /// Quantos slots de `T` cabem em `region_size` bytes.
    #[inline]
    pub fn capacity_for(region_size: usize) -> usize {
        region_size / SlabBlock::slot_layout(Layout::new::<T>()).size()
    }

    pub fn with_capabilities(
        arena: &KPageArena,
        capacity: usize,
        caps: TargetCapabilities,
    ) -> KResult<Self> {
        let layout = Layout::new::<T>();
        let inner = if caps.lock_free_slab {
            SlabStrategy::LockFree(KSlabHeapAtomic::new(arena, layout, capacity)?)
        } else {
            SlabStrategy::Locked(KDynamicSlabHeap::new(arena, layout, capacity)?)
        };
        Ok(Self {
            inner,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn is_lock_free(&self) -> bool {
        matches!(self.inner, SlabStrategy::LockFree(_))
    }

    /// Slot não inicializado para um `T`.
    pub fn allocate(&self) -> Option<NonNull<T>> {
        let slot = match &self.inner {
            SlabStrategy::LockFree(heap) => heap.allocate(),
            SlabStrategy::Locked(heap) => heap.allocate(),
        };
        slot.map(NonNull::cast)
    }

    /// Devolve o slot (o valor já deve ter sido destruído).
    ///
    /// # Safety
    /// `ptr` veio deste heap e não é mais usado.
    pub unsafe fn free(&self, ptr: NonNull<T>) {
        match &self.inner {
            SlabStrategy::LockFree(heap) => heap.free(ptr.cast()),
            SlabStrategy::Locked(heap) => heap.free(ptr.cast()),
        }
    }

    pub fn contains(&self, ptr: NonNull<T>) -> bool {
        match &self.inner {
            SlabStrategy::LockFree(heap) => heap.contains(ptr.cast()),
            SlabStrategy::Locked(heap) => heap.contains(ptr.cast()),
        }
    }

    pub fn total_size(&self) -> usize {
        match &self.inner {
            SlabStrategy::LockFree(heap) => heap.total_size(),
            SlabStrategy::Locked(heap) => heap.total_size(),
        }
    }

    pub fn used_size(&self) -> usize {
        match &self.inner {
            SlabStrategy::LockFree(heap) => heap.used_size(),
            SlabStrategy::Locked(heap) => heap.used_size(),
        }
    }

    pub fn free_size(&self) -> usize {
        self.total_size() - self.used_size()
    }
}
