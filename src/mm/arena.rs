//! # Page Arena
//!
//! Fonte de memória de apoio dos slab heaps. Recebe uma região contígua já
//! mapeada (o VMM fica fora do núcleo de objetos) e entrega blocos em
//! granularidade de página.
//!
//! Internamente é um [`linked_list_allocator::Heap`] protegido por
//! `spin::Mutex`: commits são raros (só na criação de slab heaps), então a
//! contenção não importa.

use crate::klib::align_up;
use crate::mm::config::PAGE_SIZE;
use crate::sys::error::{KResult, KernelError};
use core::alloc::Layout;
use core::ptr::NonNull;
use linked_list_allocator::Heap;
use spin::Mutex;

pub struct KPageArena {
    heap: Mutex<Heap>,
}

impl KPageArena {
    /// Arena sem memória (todo commit falha com `OutOfMemory`).
    pub const fn empty() -> Self {
        Self {
            heap: Mutex::new(Heap::empty()),
        }
    }

    /// Cria a arena sobre `[base, base + size)`.
    ///
    /// # Safety
    /// A região precisa estar mapeada, ser gravável, não ser usada por mais
    /// ninguém e viver enquanto a arena (e os blocos entregues) existirem.
    pub unsafe fn from_region(base: *mut u8, size: usize) -> Self {
        crate::kdebug!("(Arena) Regiao base=", base as usize);
        crate::kdebug!("(Arena) Regiao tamanho=", size);
        Self {
            heap: Mutex::new(Heap::new(base, size)),
        }
    }

    /// Cria a arena sobre uma região estática.
    pub fn from_static(region: &'static mut [u8]) -> Self {
        // SAFETY: O empréstimo `'static` exclusivo garante posse da região.
        unsafe { Self::from_region(region.as_mut_ptr(), region.len()) }
    }

    fn layout_for(size: usize, align: usize) -> KResult<Layout> {
        let size = align_up(size.max(1), PAGE_SIZE);
        Layout::from_size_align(size, align.max(PAGE_SIZE)).map_err(|_| KernelError::OutOfRange)
    }

    /// Entrega um bloco de `size` bytes (arredondado para páginas), alinhado
    /// a página ou a `align`, o que for maior.
    pub fn commit(&self, size: usize, align: usize) -> KResult<NonNull<u8>> {
        let layout = Self::layout_for(size, align)?;
        match self.heap.lock().allocate_first_fit(layout) {
            Ok(block) => {
                crate::ktrace!("(Arena) Commit bytes=", layout.size());
                Ok(block)
            }
            Err(()) => {
                crate::kwarn!("(Arena) Sem memoria para commit de bytes=", layout.size());
                Err(KernelError::OutOfMemory)
            }
        }
    }

    /// Devolve um bloco entregue por [`commit`](Self::commit).
    ///
    /// # Safety
    /// `block`, `size` e `align` precisam ser exatamente os do commit, e
    /// ninguém pode mais usar o bloco.
    pub unsafe fn decommit(&self, block: NonNull<u8>, size: usize, align: usize) {
        if let Ok(layout) = Self::layout_for(size, align) {
            self.heap.lock().deallocate(block, layout);
        }
    }

    pub fn size(&self) -> usize {
        self.heap.lock().size()
    }

    pub fn used_size(&self) -> usize {
        self.heap.lock().used()
    }

    pub fn free_size(&self) -> usize {
        self.heap.lock().free()
    }
}
