//! Scheduler Lock
//!
//! Lock global que serializa as decisões de escalonamento. É um spinlock
//! reentrante: a thread dona pode travá-lo de novo sem deadlock, e só o
//! desbloqueio mais externo tem efeito.
//!
//! # Protocolo
//!
//! ```text
//! lock (externo):   disable_scheduling → spin.lock → owner = atual
//! lock (aninhado):  lock_count += 1
//! unlock (aninhado): lock_count -= 1
//! unlock (externo): owner = 0 → update_highest_priority_threads
//!                   → spin.unlock → enable_scheduling(núcleos obsoletos)
//! ```
//!
//! O contexto do scheduler é passado por referência em cada chamada. Antes
//! do scheduler subir (`is_scheduler_initialized() == false`) o lock se
//! comporta como um spinlock reentrante puro.

use super::spinlock::{KAlignedTicketSpinLock, RawSpinLock};
use crate::core::panic::fatal;
use crate::sched::{CoreMask, SchedulerContext, ThreadId};
use core::sync::atomic::{AtomicI32, AtomicU64, Ordering};

/// Lock do scheduler. Criado uma vez e nunca destruído.
pub struct KSchedulerLock<R: RawSpinLock = KAlignedTicketSpinLock> {
    spin_lock: R,
    owner: AtomicU64,
    lock_count: AtomicI32,
}

impl<R: RawSpinLock> KSchedulerLock<R> {
    pub const fn new() -> Self {
        Self {
            spin_lock: R::INIT,
            owner: AtomicU64::new(0),
            lock_count: AtomicI32::new(0),
        }
    }

    /// A thread atual detém o lock?
    #[inline]
    pub fn is_locked_by_current_thread<C: SchedulerContext + ?Sized>(&self, ctx: &C) -> bool {
        self.owner.load(Ordering::Relaxed) == ctx.current_thread_id().raw()
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.owner.load(Ordering::Relaxed) != ThreadId::NONE.raw()
    }

    /// Profundidade de aninhamento atual (0 = livre).
    #[inline]
    pub fn lock_count(&self) -> i32 {
        self.lock_count.load(Ordering::Relaxed)
    }

    /// Acesso ao lock cru (diagnóstico).
    pub fn raw(&self) -> &R {
        &self.spin_lock
    }

    pub fn lock<C: SchedulerContext + ?Sized>(&self, ctx: &C) {
        let current = ctx.current_thread_id();

        if self.is_locked_by_current_thread(ctx) {
            // Reentrância: só o contador muda
            self.lock_count.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if ctx.is_scheduler_initialized() {
            ctx.disable_scheduling();
        }

        self.spin_lock.lock();

        if self.lock_count.load(Ordering::Relaxed) != 0 {
            fatal("(Sync) SchedulerLock adquirido com contador sujo", current.raw());
        }
        self.lock_count.store(1, Ordering::Relaxed);
        self.owner.store(current.raw(), Ordering::Relaxed);
    }

    pub fn unlock<C: SchedulerContext + ?Sized>(&self, ctx: &C) {
        let current = ctx.current_thread_id();

        if self.owner.load(Ordering::Relaxed) != current.raw() {
            fatal("(Sync) SchedulerLock liberado por nao-dono", current.raw());
        }

        let remaining = self.lock_count.fetch_sub(1, Ordering::Relaxed) - 1;
        if remaining > 0 {
            return;
        }

        self.owner.store(ThreadId::NONE.raw(), Ordering::Relaxed);

        if ctx.is_scheduler_initialized() {
            let cores: CoreMask = ctx.update_highest_priority_threads();

            // SAFETY: Somos o dono (verificado acima).
            unsafe { self.spin_lock.unlock() };

            ctx.enable_scheduling(cores);
        } else {
            // SAFETY: Somos o dono (verificado acima).
            unsafe { self.spin_lock.unlock() };
        }
    }
}

impl<R: RawSpinLock> Default for KSchedulerLock<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Segura o scheduler lock até o fim do escopo.
pub struct KScopedSchedulerLock<'a, C: SchedulerContext + ?Sized, R: RawSpinLock = KAlignedTicketSpinLock>
{
    lock: &'a KSchedulerLock<R>,
    ctx: &'a C,
}

impl<'a, C: SchedulerContext + ?Sized, R: RawSpinLock> KScopedSchedulerLock<'a, C, R> {
    pub fn new(lock: &'a KSchedulerLock<R>, ctx: &'a C) -> Self {
        lock.lock(ctx);
        Self { lock, ctx }
    }
}

impl<C: SchedulerContext + ?Sized, R: RawSpinLock> Drop for KScopedSchedulerLock<'_, C, R> {
    fn drop(&mut self) {
        self.lock.unlock(self.ctx);
    }
}
