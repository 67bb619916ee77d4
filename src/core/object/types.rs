//! Tipos concretos de objetos do kernel.
//!
//! Apenas o estado que o núcleo de objetos precisa: a lógica de cada
//! subsistema (scheduler, IPC, memória compartilhada) vive fora daqui.
//!
//! Os tipos com slab dedicado ([`KObjectSlabs`]) são criados nele depois de
//! `core::init`; antes disso (e nos testes) caem no heap do kernel.
//!
//! Os construtores por valor (`new`) ficam restritos ao crate: fora dele só
//! `create` produz um objeto, sempre já ligado ao seu storage e dono da
//! primeira referência.

use super::kobject::impl_auto_object;
use super::{KAutoObjectBase, KObjectType, KScopedAutoObject};
use crate::arch::CoreId;
use crate::core::handle::KHandleTable;
use crate::mm::alloc::KObjectSlab;
use crate::mm::arena::KPageArena;
use crate::mm::config::{
    SLAB_COUNT_EVENT, SLAB_COUNT_INTERRUPT_EVENT, SLAB_COUNT_PROCESS, SLAB_COUNT_SHARED_MEMORY,
    SLAB_COUNT_THREAD,
};
use crate::sched::ThreadId;
use crate::sys::error::KResult;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Once;

// =============================================================================
// SLABS POR TIPO
// =============================================================================

/// Slab heap de cada tipo concreto.
pub struct KObjectSlabs {
    pub thread: KObjectSlab<KThread>,
    pub process: KObjectSlab<KProcess>,
    pub event: KObjectSlab<KEvent>,
    pub interrupt_event: KObjectSlab<KInterruptEvent>,
    pub shared_memory: KObjectSlab<KSharedMemory>,
}

static OBJECT_SLABS: Once<KObjectSlabs> = Once::new();

/// Cria os slabs de objetos (uma vez). Chamadas seguintes devolvem os existentes.
pub fn init_object_slabs(arena: &KPageArena) -> KResult<&'static KObjectSlabs> {
    OBJECT_SLABS.try_call_once(|| {
        Ok(KObjectSlabs {
            thread: KObjectSlab::new(arena, SLAB_COUNT_THREAD)?,
            process: KObjectSlab::new(arena, SLAB_COUNT_PROCESS)?,
            event: KObjectSlab::new(arena, SLAB_COUNT_EVENT)?,
            interrupt_event: KObjectSlab::new(arena, SLAB_COUNT_INTERRUPT_EVENT)?,
            shared_memory: KObjectSlab::new(arena, SLAB_COUNT_SHARED_MEMORY)?,
        })
    })
}

#[inline]
pub fn object_slabs() -> Option<&'static KObjectSlabs> {
    OBJECT_SLABS.get()
}

fn create_in<T: KObjectType>(
    slab: Option<&'static KObjectSlab<T>>,
    value: T,
) -> KResult<KScopedAutoObject<T>> {
    match slab {
        Some(slab) => slab.create(value),
        None => Ok(KScopedAutoObject::new(value)),
    }
}

// =============================================================================
// KThread
// =============================================================================

pub struct KThread {
    base: KAutoObjectBase,
    thread_id: ThreadId,
    core: CoreId,
}

impl_auto_object!(KThread => Thread);

impl KThread {
    pub(crate) fn new(thread_id: ThreadId, core: CoreId) -> Self {
        Self {
            base: KAutoObjectBase::new(),
            thread_id,
            core,
        }
    }

    pub fn create(thread_id: ThreadId, core: CoreId) -> KResult<KScopedAutoObject<KThread>> {
        create_in(
            object_slabs().map(|slabs| &slabs.thread),
            Self::new(thread_id, core),
        )
    }

    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    #[inline]
    pub fn core_id(&self) -> CoreId {
        self.core
    }
}

// =============================================================================
// KProcess
// =============================================================================

static NEXT_PROCESS_ID: AtomicU64 = AtomicU64::new(1);

/// Processo: dono de exatamente uma tabela de handles.
pub struct KProcess {
    base: KAutoObjectBase,
    process_id: u64,
    handle_table: KHandleTable,
}

impl_auto_object!(KProcess => Process, finalize);

impl KProcess {
    /// Cria um processo com tabela de `handle_table_size` slots (0 = teto).
    pub(crate) fn new(handle_table_size: usize) -> Self {
        let process_id = NEXT_PROCESS_ID.fetch_add(1, Ordering::Relaxed);
        crate::kdebug!("(Obj) Criando processo pid=", process_id);
        Self {
            base: KAutoObjectBase::new(),
            process_id,
            handle_table: KHandleTable::new(handle_table_size),
        }
    }

    pub fn create(handle_table_size: usize) -> KResult<KScopedAutoObject<KProcess>> {
        create_in(
            object_slabs().map(|slabs| &slabs.process),
            Self::new(handle_table_size),
        )
    }

    #[inline]
    pub fn process_id(&self) -> u64 {
        self.process_id
    }

    #[inline]
    pub fn handle_table(&self) -> &KHandleTable {
        &self.handle_table
    }

    fn on_finalize(&self) {
        crate::kdebug!("(Obj) Finalizando processo pid=", self.process_id);
        self.handle_table.destroy();
    }
}

// =============================================================================
// KEvent / KInterruptEvent
// =============================================================================

pub struct KEvent {
    base: KAutoObjectBase,
    signaled: AtomicBool,
}

impl_auto_object!(KEvent => Event);

impl KEvent {
    pub(crate) fn new() -> Self {
        Self {
            base: KAutoObjectBase::new(),
            signaled: AtomicBool::new(false),
        }
    }

    pub fn create() -> KResult<KScopedAutoObject<KEvent>> {
        create_in(object_slabs().map(|slabs| &slabs.event), Self::new())
    }

    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Limpa o sinal. Retorna se estava sinalizado.
    pub fn clear(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}

/// Evento ligado a uma linha de interrupção.
pub struct KInterruptEvent {
    base: KAutoObjectBase,
    irq: u32,
    signaled: AtomicBool,
}

impl_auto_object!(KInterruptEvent => InterruptEvent);

impl KInterruptEvent {
    pub(crate) fn new(irq: u32) -> Self {
        Self {
            base: KAutoObjectBase::new(),
            irq,
            signaled: AtomicBool::new(false),
        }
    }

    pub fn create(irq: u32) -> KResult<KScopedAutoObject<KInterruptEvent>> {
        create_in(
            object_slabs().map(|slabs| &slabs.interrupt_event),
            Self::new(irq),
        )
    }

    #[inline]
    pub fn irq(&self) -> u32 {
        self.irq
    }

    /// Chamado pelo handler da IRQ.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    pub fn clear(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }
}

// =============================================================================
// KSharedMemory
// =============================================================================

pub struct KSharedMemory {
    base: KAutoObjectBase,
    size: usize,
}

impl_auto_object!(KSharedMemory => SharedMemory);

impl KSharedMemory {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            base: KAutoObjectBase::new(),
            size,
        }
    }

    pub fn create(size: usize) -> KResult<KScopedAutoObject<KSharedMemory>> {
        create_in(
            object_slabs().map(|slabs| &slabs.shared_memory),
            Self::new(size),
        )
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}
