//! Contexto de escalonamento passado aos primitivos de sincronização.

use crate::core::object::types::{KProcess, KThread};
use crate::core::object::KScopedAutoObject;
use bitflags::bitflags;

/// Identidade de uma thread para fins de posse de locks.
///
/// `ThreadId(0)` é reservado: significa "nenhuma thread".
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

impl ThreadId {
    /// Nenhuma thread (lock livre).
    pub const NONE: ThreadId = ThreadId(0);

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

bitflags! {
    /// Conjunto de núcleos que precisam reescalonar.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CoreMask: u64 {
        const CORE_0 = 1 << 0;
        const CORE_1 = 1 << 1;
        const CORE_2 = 1 << 2;
        const CORE_3 = 1 << 3;
    }
}

impl CoreMask {
    /// Máscara com apenas o núcleo `core`.
    #[inline]
    pub const fn from_core(core: u32) -> Self {
        Self::from_bits_retain(1u64 << core)
    }
}

/// O que o scheduler lock precisa do scheduler.
pub trait SchedulerContext: Sync {
    /// Thread em execução no núcleo atual. Nunca `ThreadId::NONE`.
    fn current_thread_id(&self) -> ThreadId;

    /// Antes do scheduler subir, o scheduler lock vira um spinlock reentrante
    /// sem efeitos de escalonamento.
    fn is_scheduler_initialized(&self) -> bool {
        true
    }

    /// Desabilita a preempção no núcleo atual. Não pode bloquear.
    fn disable_scheduling(&self);

    /// Recalcula a thread de maior prioridade de cada núcleo.
    ///
    /// Chamado com o spinlock do scheduler lock ainda seguro; retorna os
    /// núcleos cuja decisão ficou obsoleta.
    fn update_highest_priority_threads(&self) -> CoreMask;

    /// Reabilita a preempção e pede reescalonamento apenas em `cores`.
    fn enable_scheduling(&self, cores: CoreMask);
}

/// Suspensão cooperativa usada pelo light lock.
pub trait ThreadScheduler: SchedulerContext {
    /// Suspende a thread atual até um `wake` para ela.
    ///
    /// Um `wake` que chega antes da suspensão não pode ser perdido, e
    /// retornos espúrios são permitidos (o chamador reavalia a condição).
    fn suspend_current(&self);

    /// Torna `thread` executável novamente.
    fn wake(&self, thread: ThreadId);
}

/// Resolução dos pseudo-handles (thread/processo atual).
pub trait CurrentContext {
    fn current_thread(&self) -> Option<KScopedAutoObject<KThread>>;
    fn current_process(&self) -> Option<KScopedAutoObject<KProcess>>;
}

// =============================================================================
// CONTEXTO DE BOOT
// =============================================================================

/// Contexto de boot: um núcleo, uma thread, scheduler ainda desligado.
///
/// Usado durante a inicialização e pelos self-tests. Não há com quem
/// disputar locks, então `suspend_current` indica um deadlock.
#[derive(Debug, Default)]
pub struct EarlyBootContext;

/// Thread implícita do boot.
pub const BOOT_THREAD: ThreadId = ThreadId(1);

impl SchedulerContext for EarlyBootContext {
    fn current_thread_id(&self) -> ThreadId {
        BOOT_THREAD
    }

    fn is_scheduler_initialized(&self) -> bool {
        false
    }

    fn disable_scheduling(&self) {}

    fn update_highest_priority_threads(&self) -> CoreMask {
        CoreMask::empty()
    }

    fn enable_scheduling(&self, _cores: CoreMask) {}
}

impl ThreadScheduler for EarlyBootContext {
    fn suspend_current(&self) {
        crate::core::panic::fatal("(Sched) Suspensao durante o boot: deadlock", BOOT_THREAD.0);
    }

    fn wake(&self, _thread: ThreadId) {}
}

impl CurrentContext for EarlyBootContext {
    fn current_thread(&self) -> Option<KScopedAutoObject<KThread>> {
        None
    }

    fn current_process(&self) -> Option<KScopedAutoObject<KProcess>> {
        None
    }
}
