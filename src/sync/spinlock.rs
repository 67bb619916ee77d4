//! Spinlock - bloqueio com busy-wait por tickets
//!
//! Duas variantes de lock cru, ambas justas (FIFO por ticket):
//!
//! - [`KTicketSpinLock`]: par de tickets 16+16 bits empacotado em 4 bytes.
//!   Usado onde existem muitas instâncias (uma por tabela de handles, por
//!   slab heap, ...).
//! - [`KAlignedTicketSpinLock`]: cada contador em sua própria linha de cache.
//!   Evita false sharing sob contenção pesada (scheduler lock).
//!
//! Nenhuma das duas suspende a thread: são seguras em contexto de interrupção
//! desde que as interrupções estejam desabilitadas durante a seção crítica.
//! [`Spinlock<T>`] cuida disso automaticamente.

use crate::arch::{Cpu, CpuOps, KScopedInterruptDisable};
use crate::mm::config::CACHE_LINE_SIZE;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

/// Interface comum dos locks crus.
///
/// # Safety
///
/// `lock`/`try_lock` bem-sucedido devem garantir exclusão mútua até o
/// `unlock` correspondente, com semântica Acquire/Release.
pub unsafe trait RawSpinLock: Sync {
    /// Valor inicial (destravado).
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self;

    fn lock(&self);

    fn try_lock(&self) -> bool;

    /// Libera o lock.
    ///
    /// # Safety
    /// Só pode ser chamado por quem detém o lock.
    unsafe fn unlock(&self);

    fn is_locked(&self) -> bool;
}

// =============================================================================
// TICKET LOCK EMPACOTADO (16 + 16 bits)
// =============================================================================

/// Ticket lock compacto: `next_ticket` e `now_serving` lado a lado.
///
/// Suporta até 65535 esperas simultâneas antes de dar a volta.
#[repr(C, align(4))]
pub struct KTicketSpinLock {
    next_ticket: AtomicU16,
    now_serving: AtomicU16,
}

impl KTicketSpinLock {
    pub const fn new() -> Self {
        Self {
            next_ticket: AtomicU16::new(0),
            now_serving: AtomicU16::new(0),
        }
    }
}

unsafe impl RawSpinLock for KTicketSpinLock {
    const INIT: Self = Self::new();

    #[inline]
    fn lock(&self) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        while self.now_serving.load(Ordering::Acquire) != ticket {
            Cpu::relax();
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        let serving = self.now_serving.load(Ordering::Acquire);
        self.next_ticket
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.now_serving.fetch_add(1, Ordering::Release);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.next_ticket.load(Ordering::Relaxed) != self.now_serving.load(Ordering::Relaxed)
    }
}

impl Default for KTicketSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TICKET LOCK ALINHADO (uma linha de cache por contador)
// =============================================================================

/// Wrapper que ocupa uma linha de cache inteira.
#[repr(C, align(64))]
pub struct CacheAligned<T>(pub T);

const _: () = assert!(core::mem::align_of::<CacheAligned<u8>>() == CACHE_LINE_SIZE);

/// Ticket lock com contadores em linhas de cache separadas.
///
/// Quem espera só lê `now_serving`; quem chega só escreve `next_ticket`.
#[repr(C)]
pub struct KAlignedTicketSpinLock {
    next_ticket: CacheAligned<AtomicU32>,
    now_serving: CacheAligned<AtomicU32>,
}

impl KAlignedTicketSpinLock {
    pub const fn new() -> Self {
        Self {
            next_ticket: CacheAligned(AtomicU32::new(0)),
            now_serving: CacheAligned(AtomicU32::new(0)),
        }
    }
}

unsafe impl RawSpinLock for KAlignedTicketSpinLock {
    const INIT: Self = Self::new();

    #[inline]
    fn lock(&self) {
        let ticket = self.next_ticket.0.fetch_add(1, Ordering::Relaxed);
        while self.now_serving.0.load(Ordering::Acquire) != ticket {
            Cpu::relax();
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        let serving = self.now_serving.0.load(Ordering::Acquire);
        self.next_ticket
            .0
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.now_serving.0.fetch_add(1, Ordering::Release);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.next_ticket.0.load(Ordering::Relaxed) != self.now_serving.0.load(Ordering::Relaxed)
    }
}

impl Default for KAlignedTicketSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// GUARD DE LOCK CRU
// =============================================================================

/// Segura um lock cru até sair do escopo (sem mexer em interrupções).
pub struct KScopedSpinLock<'a, R: RawSpinLock> {
    lock: &'a R,
}

impl<'a, R: RawSpinLock> KScopedSpinLock<'a, R> {
    #[inline]
    pub fn new(lock: &'a R) -> Self {
        lock.lock();
        Self { lock }
    }
}

impl<R: RawSpinLock> Drop for KScopedSpinLock<'_, R> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: Adquirido em `new`.
        unsafe { self.lock.unlock() };
    }
}

// =============================================================================
// SPINLOCK COM DADOS
// =============================================================================

/// Spinlock - usa busy-wait, NÃO pode dormir
///
/// # Quando usar
///
/// - Seções críticas MUITO curtas
/// - Dentro de handlers de interrupção
/// - Quando não pode chamar scheduler
///
/// As interrupções ficam desabilitadas enquanto o guard existir.
pub struct Spinlock<T, R: RawSpinLock = KTicketSpinLock> {
    raw: R,
    data: UnsafeCell<T>,
}

// SAFETY: Spinlock protege acesso com lock atômico
unsafe impl<T: Send, R: RawSpinLock> Send for Spinlock<T, R> {}
unsafe impl<T: Send, R: RawSpinLock> Sync for Spinlock<T, R> {}

impl<T, R: RawSpinLock> Spinlock<T, R> {
    /// Cria novo spinlock
    pub const fn new(data: T) -> Self {
        Self {
            raw: R::INIT,
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire o lock
    pub fn lock(&self) -> SpinlockGuard<'_, T, R> {
        // Desabilitar interrupções antes de adquirir
        let irq = KScopedInterruptDisable::new();
        self.raw.lock();
        SpinlockGuard { lock: self, _irq: irq }
    }

    /// Tenta adquirir sem bloquear
    pub fn try_lock(&self) -> Option<SpinlockGuard<'_, T, R>> {
        let irq = KScopedInterruptDisable::new();
        if self.raw.try_lock() {
            Some(SpinlockGuard { lock: self, _irq: irq })
        } else {
            // `irq` restaura as interrupções ao sair
            None
        }
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Acesso sem lock quando temos `&mut self`.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

/// Guard do spinlock - libera ao sair do escopo
pub struct SpinlockGuard<'a, T, R: RawSpinLock = KTicketSpinLock> {
    lock: &'a Spinlock<T, R>,
    // Dropado depois do `Drop` do guard: libera o lock antes de reabilitar IRQs.
    _irq: KScopedInterruptDisable,
}

impl<T, R: RawSpinLock> Deref for SpinlockGuard<'_, T, R> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock está adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, R: RawSpinLock> DerefMut for SpinlockGuard<'_, T, R> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock está adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T, R: RawSpinLock> Drop for SpinlockGuard<'_, T, R> {
    fn drop(&mut self) {
        // SAFETY: O guard só existe com o lock adquirido.
        unsafe { self.lock.raw.unlock() };
    }
}
