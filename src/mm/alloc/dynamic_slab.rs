//! # Slab Heap com Lock
//!
//! Mesma geometria do [`KSlabHeapAtomic`](super::KSlabHeapAtomic), mas a free
//! list é protegida por um ticket spinlock. Usado em alvos onde a variante
//! lock-free não é segura e sempre que as estatísticas de uso importam.
//!
//! ## Estatísticas
//!
//! | Consulta          | Significado                                   |
//! |-------------------|-----------------------------------------------|
//! | `total_size()`    | Slots no bloco                                |
//! | `free_size()`     | Slots na free list agora                      |
//! | `used_size()`     | Slots entregues agora                         |
//! | `peak_size()`     | Maior `used_size()` já observado              |
//! | `retried_count()` | Alocações que encontraram o pool vazio        |

use super::slab::SlabBlock;
use crate::mm::arena::KPageArena;
use crate::mm::config::SLAB_NIL_INDEX;
use crate::sync::Spinlock;
use crate::sys::error::KResult;
use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

struct FreeList {
    head: u32,
    used: usize,
    peak: usize,
}

pub struct KDynamicSlabHeap {
    block: SlabBlock,
    list: Spinlock<FreeList>,
    retried: AtomicUsize,
}

impl KDynamicSlabHeap {
    pub fn new(arena: &KPageArena, layout: Layout, capacity: usize) -> KResult<Self> {
        let block = SlabBlock::commit(arena, layout, capacity)?;

        let last = capacity as u32 - 1;
        for index in 0..last {
            block.link(index).store(index + 1, Ordering::Relaxed);
        }
        block.link(last).store(SLAB_NIL_INDEX, Ordering::Relaxed);

        crate::kinfo!("(Slab) Heap com lock criado, slots=", capacity);

        Ok(Self {
            block,
            list: Spinlock::new(FreeList {
                head: 0,
                used: 0,
                peak: 0,
            }),
            retried: AtomicUsize::new(0),
        })
    }

    pub fn allocate(&self) -> Option<NonNull<u8>> {
        let index = {
            let mut list = self.list.lock();
            let index = list.head;
            if index == SLAB_NIL_INDEX {
                drop(list);
                self.retried.fetch_add(1, Ordering::Relaxed);
                crate::ktrace!("(Slab) Pool vazio, slot_size=", self.block.slot_size());
                return None;
            }
            list.head = self.block.link(index).load(Ordering::Relaxed);
            list.used += 1;
            if list.used > list.peak {
                list.peak = list.used;
            }
            index
        };

        self.block.mark_allocated(index);
        Some(self.block.slot_ptr(index))
    }

    /// Devolve um slot ao pool.
    ///
    /// # Safety
    /// `ptr` não pode mais ser usado pelo chamador.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        let index = self.block.index_of(ptr);
        self.block.mark_free(index);

        let mut list = self.list.lock();
        self.block.link(index).store(list.head, Ordering::Relaxed);
        list.head = index;
        list.used -= 1;
    }

    pub fn total_size(&self) -> usize {
        self.block.capacity()
    }

    pub fn used_size(&self) -> usize {
        self.list.lock().used
    }

    pub fn free_size(&self) -> usize {
        self.total_size() - self.used_size()
    }

    pub fn peak_size(&self) -> usize {
        self.list.lock().peak
    }

    pub fn retried_count(&self) -> usize {
        self.retried.load(Ordering::Relaxed)
    }

    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.block.contains(ptr)
    }

    pub fn slot_size(&self) -> usize {
        self.block.slot_size()
    }
}
