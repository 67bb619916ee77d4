//! Light Lock - mutex bloqueante leve
//!
//! Diferente do [`Spinlock`](super::Spinlock), quem não consegue o lock é
//! **suspenso** pelo scheduler em vez de girar. Nunca usar em contexto de
//! interrupção.
//!
//! # Estado
//!
//! Um único `AtomicU64` (tag):
//!
//! ```text
//! tag = (thread_id << 1) | WAITER_BIT
//! 0   = livre
//! ```
//!
//! O caminho rápido (sem contenção) é um único CAS em cada direção. Com
//! contenção, a thread liga o WAITER_BIT, entra na fila de espera e dorme.
//! O unlock entrega a posse **diretamente** ao primeiro da fila antes de
//! acordá-lo: não há corrida para readquirir.

use super::spinlock::Spinlock;
use crate::core::panic::fatal;
use crate::sched::{ThreadId, ThreadScheduler};
use alloc::collections::VecDeque;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU64, Ordering};

const WAITER_BIT: u64 = 1;

#[inline]
const fn tag_of(thread: ThreadId) -> u64 {
    thread.raw() << 1
}

#[inline]
const fn owner_of(tag: u64) -> u64 {
    tag >> 1
}

pub struct KLightLock {
    tag: AtomicU64,
    waiters: Spinlock<VecDeque<ThreadId>>,
}

impl KLightLock {
    pub const fn new() -> Self {
        Self {
            tag: AtomicU64::new(0),
            waiters: Spinlock::new(VecDeque::new()),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.tag.load(Ordering::Relaxed) != 0
    }

    #[inline]
    pub fn is_locked_by_current_thread<S: ThreadScheduler + ?Sized>(&self, sched: &S) -> bool {
        owner_of(self.tag.load(Ordering::Relaxed)) == sched.current_thread_id().raw()
    }

    /// Threads suspensas esperando o lock.
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn lock<S: ThreadScheduler + ?Sized>(&self, sched: &S) {
        let current = tag_of(sched.current_thread_id());

        if self
            .tag
            .compare_exchange(0, current, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }

        self.lock_slow_path(current, sched);
    }

    /// Tenta adquirir sem suspender.
    pub fn try_lock<S: ThreadScheduler + ?Sized>(&self, sched: &S) -> bool {
        let current = tag_of(sched.current_thread_id());
        self.tag
            .compare_exchange(0, current, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_slow_path<S: ThreadScheduler + ?Sized>(&self, current: u64, sched: &S) {
        {
            let mut waiters = self.waiters.lock();

            let mut observed = self.tag.load(Ordering::Relaxed);
            loop {
                if observed == 0 {
                    // Liberado no meio do caminho: tentar pegar direto
                    match self.tag.compare_exchange(
                        0,
                        current,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return,
                        Err(actual) => {
                            observed = actual;
                            continue;
                        }
                    }
                }

                if observed & !WAITER_BIT == current {
                    fatal("(Sync) LightLock recursivo", owner_of(current));
                }

                match self.tag.compare_exchange(
                    observed,
                    observed | WAITER_BIT,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(actual) => observed = actual,
                }
            }

            waiters.push_back(ThreadId(owner_of(current)));
        }

        // A posse é entregue pelo unlock: dormir até o tag apontar para nós
        while self.tag.load(Ordering::Acquire) & !WAITER_BIT != current {
            sched.suspend_current();
        }
    }

    pub fn unlock<S: ThreadScheduler + ?Sized>(&self, sched: &S) {
        let current = tag_of(sched.current_thread_id());

        if self
            .tag
            .compare_exchange(current, 0, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }

        self.unlock_slow_path(current, sched);
    }

    #[cold]
    fn unlock_slow_path<S: ThreadScheduler + ?Sized>(&self, current: u64, sched: &S) {
        let next = {
            let mut waiters = self.waiters.lock();

            let tag = self.tag.load(Ordering::Relaxed);
            if tag & !WAITER_BIT != current {
                fatal("(Sync) LightLock liberado por nao-dono", owner_of(current));
            }

            match waiters.pop_front() {
                Some(next) => {
                    let mut handoff = tag_of(next);
                    if !waiters.is_empty() {
                        handoff |= WAITER_BIT;
                    }
                    self.tag.store(handoff, Ordering::Release);
                    Some(next)
                }
                None => {
                    self.tag.store(0, Ordering::Release);
                    None
                }
            }
        };

        // Acordar fora do spinlock da fila
        if let Some(next) = next {
            sched.wake(next);
        }
    }
}

impl Default for KLightLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Segura o light lock até o fim do escopo.
pub struct KScopedLightLock<'a, S: ThreadScheduler + ?Sized> {
    lock: &'a KLightLock,
    sched: &'a S,
}

impl<'a, S: ThreadScheduler + ?Sized> KScopedLightLock<'a, S> {
    pub fn new(lock: &'a KLightLock, sched: &'a S) -> Self {
        lock.lock(sched);
        Self { lock, sched }
    }
}

impl<S: ThreadScheduler + ?Sized> Drop for KScopedLightLock<'_, S> {
    fn drop(&mut self) {
        self.lock.unlock(self.sched);
    }
}

// =============================================================================
// LIGHT MUTEX (light lock + dados)
// =============================================================================

/// Dados protegidos por um [`KLightLock`].
pub struct KLightMutex<T> {
    lock: KLightLock,
    data: UnsafeCell<T>,
}

// SAFETY: O acesso aos dados é serializado pelo light lock
unsafe impl<T: Send> Send for KLightMutex<T> {}
unsafe impl<T: Send> Sync for KLightMutex<T> {}

impl<T> KLightMutex<T> {
    pub const fn new(data: T) -> Self {
        Self {
            lock: KLightLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock<'a, S: ThreadScheduler + ?Sized>(&'a self, sched: &'a S) -> KLightMutexGuard<'a, T, S> {
        self.lock.lock(sched);
        KLightMutexGuard { mutex: self, sched }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

pub struct KLightMutexGuard<'a, T, S: ThreadScheduler + ?Sized> {
    mutex: &'a KLightMutex<T>,
    sched: &'a S,
}

impl<T, S: ThreadScheduler + ?Sized> Deref for KLightMutexGuard<'_, T, S> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock adquirido
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T, S: ThreadScheduler + ?Sized> DerefMut for KLightMutexGuard<'_, T, S> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock adquirido
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T, S: ThreadScheduler + ?Sized> Drop for KLightMutexGuard<'_, T, S> {
    fn drop(&mut self) {
        self.mutex.lock.unlock(self.sched);
    }
}
