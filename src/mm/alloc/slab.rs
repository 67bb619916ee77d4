//! # Slab Heap Atômico (lock-free)
//!
//! Pool de slots de tamanho fixo cuja free list é manipulada apenas com CAS.
//!
//! ## Layout
//!
//! ```text
//! bloco: [ slot 0 | slot 1 | ... | slot N-1 ]
//! slot livre: [ next: AtomicU32 | lixo ... ]
//! head: AtomicU64 = (tag << 32) | índice
//! ```
//!
//! Os nós são endereçados por índice dentro do bloco, nunca por ponteiro.
//! Cada CAS bem-sucedido incrementa o `tag`, então um head que saiu e voltou
//! para a lista (ABA) nunca compara igual ao valor lido antes.
//!
//! Só é usado quando `TargetCapabilities::lock_free_slab` é verdadeiro. Caso
//! contrário o [`KSlabHeap`](super::KSlabHeap) escolhe o
//! [`KDynamicSlabHeap`](super::KDynamicSlabHeap).

use crate::core::panic::fatal;
use crate::klib::align_up;
use crate::klib::bitmap::AtomicBitmap;
use crate::mm::arena::KPageArena;
use crate::mm::config::{SLAB_MIN_SLOT_SIZE, SLAB_NIL_INDEX};
use crate::sys::error::{KResult, KernelError};
use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// =============================================================================
// GEOMETRIA DO BLOCO (compartilhada pelas duas variantes)
// =============================================================================

/// Bloco contíguo dividido em slots, com bitmap de ocupação.
///
/// O bitmap detecta double free e frees de ponteiros estranhos ao bloco:
/// ambos são defeitos fatais.
pub struct SlabBlock {
    base: NonNull<u8>,
    slot_size: usize,
    capacity: usize,
    occupied: AtomicBitmap,
}

// SAFETY: O bloco é memória exclusiva do slab. O acesso aos slots é
// coordenado pela free list (CAS ou spinlock) e pelo bitmap atômico.
unsafe impl Send for SlabBlock {}
unsafe impl Sync for SlabBlock {}

impl SlabBlock {
    /// Geometria de slot para objetos com `layout`.
    pub fn slot_layout(layout: Layout) -> Layout {
        let align = layout.align().max(core::mem::align_of::<AtomicU32>());
        let size = align_up(layout.size().max(SLAB_MIN_SLOT_SIZE), align);
        // `size` é múltiplo de `align` e `align` é potência de dois
        Layout::from_size_align(size, align).unwrap_or(layout)
    }

    /// Reserva `capacity` slots na arena.
    pub fn commit(arena: &KPageArena, layout: Layout, capacity: usize) -> KResult<Self> {
        if capacity == 0 || capacity >= SLAB_NIL_INDEX as usize {
            return Err(KernelError::OutOfRange);
        }
        let slot = Self::slot_layout(layout);
        let bytes = slot
            .size()
            .checked_mul(capacity)
            .ok_or(KernelError::OutOfRange)?;
        let base = arena.commit(bytes, slot.align())?;

        crate::kdebug!("(Slab) Bloco slots=", capacity);
        crate::ktrace!("(Slab) Bloco slot_size=", slot.size());

        Ok(Self {
            base,
            slot_size: slot.size(),
            capacity,
            occupied: AtomicBitmap::new(capacity),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    #[inline]
    pub fn slot_ptr(&self, index: u32) -> NonNull<u8> {
        debug_assert!((index as usize) < self.capacity);
        // SAFETY: `index < capacity`, então o deslocamento fica dentro do bloco.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(index as usize * self.slot_size)) }
    }

    /// Link "next" guardado no próprio slot livre.
    #[inline]
    pub fn link(&self, index: u32) -> &AtomicU32 {
        // SAFETY: Slots são alinhados para AtomicU32 e maiores que ele. O link
        // só é interpretado enquanto o slot está livre.
        unsafe { &*(self.slot_ptr(index).as_ptr() as *const AtomicU32) }
    }

    /// Índice do slot de `ptr`. Ponteiros de fora ou desalinhados são fatais.
    pub fn index_of(&self, ptr: NonNull<u8>) -> u32 {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        let end = base + self.slot_size * self.capacity;

        if addr < base || addr >= end {
            fatal("(Slab) Free de ponteiro fora do bloco", addr as u64);
        }
        let offset = addr - base;
        if offset % self.slot_size != 0 {
            fatal("(Slab) Free de ponteiro desalinhado", addr as u64);
        }
        (offset / self.slot_size) as u32
    }

    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        addr >= base && addr < base + self.slot_size * self.capacity
    }

    /// Marca o slot como ocupado (saída da free list).
    #[inline]
    pub fn mark_allocated(&self, index: u32) {
        if self.occupied.test_and_set(index as usize) {
            fatal("(Slab) Slot livre ja estava ocupado", index as u64);
        }
    }

    /// Marca o slot como livre. Double free é fatal.
    #[inline]
    pub fn mark_free(&self, index: u32) {
        if !self.occupied.test_and_clear(index as usize) {
            fatal("(Slab) Double free", self.slot_ptr(index).as_ptr() as u64);
        }
    }

    pub fn used_count(&self) -> usize {
        self.occupied.count_ones()
    }
}

// =============================================================================
// HEAD EMPACOTADO
// =============================================================================

#[inline]
const fn pack(tag: u32, index: u32) -> u64 {
    ((tag as u64) << 32) | index as u64
}

#[inline]
const fn head_index(head: u64) -> u32 {
    head as u32
}

#[inline]
const fn head_tag(head: u64) -> u32 {
    (head >> 32) as u32
}

// =============================================================================
// SLAB HEAP LOCK-FREE
// =============================================================================

pub struct KSlabHeapAtomic {
    block: SlabBlock,
    head: AtomicU64,
}

impl KSlabHeapAtomic {
    pub fn new(arena: &KPageArena, layout: Layout, capacity: usize) -> KResult<Self> {
        let block = SlabBlock::commit(arena, layout, capacity)?;

        // Encadear todos os slots: 0 → 1 → ... → N-1 → NIL
        let last = capacity as u32 - 1;
        for index in 0..last {
            block.link(index).store(index + 1, Ordering::Relaxed);
        }
        block.link(last).store(SLAB_NIL_INDEX, Ordering::Relaxed);

        crate::kinfo!("(Slab) Heap atomico criado, slots=", capacity);

        Ok(Self {
            block,
            head: AtomicU64::new(pack(0, 0)),
        })
    }

    pub fn allocate(&self) -> Option<NonNull<u8>> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let index = head_index(head);
            if index == SLAB_NIL_INDEX {
                return None;
            }

            // Pode ler um link já sobrescrito por quem ganhou a corrida;
            // nesse caso o tag mudou e o CAS abaixo falha.
            let next = self.block.link(index).load(Ordering::Relaxed);
            let new = pack(head_tag(head).wrapping_add(1), next);

            match self
                .head
                .compare_exchange_weak(head, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.block.mark_allocated(index);
                    return Some(self.block.slot_ptr(index));
                }
                Err(actual) => head = actual,
            }
        }
    }

    /// Devolve um slot ao pool.
    ///
    /// # Safety
    /// `ptr` não pode mais ser usado pelo chamador.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        let index = self.block.index_of(ptr);
        self.block.mark_free(index);

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            self.block.link(index).store(head_index(head), Ordering::Relaxed);
            let new = pack(head_tag(head).wrapping_add(1), index);

            match self
                .head
                .compare_exchange_weak(head, new, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => head = actual,
            }
        }
    }

    pub fn total_size(&self) -> usize {
        self.block.capacity()
    }

    pub fn used_size(&self) -> usize {
        self.block.used_count()
    }

    pub fn free_size(&self) -> usize {
        self.total_size() - self.used_size()
    }

    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.block.contains(ptr)
    }

    pub fn slot_size(&self) -> usize {
        self.block.slot_size()
    }
}
