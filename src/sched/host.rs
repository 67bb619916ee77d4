//! Scheduler de host para os testes.
//!
//! Cada `std::thread` vira uma thread do kernel com um `ThreadId` próprio.
//! `suspend_current`/`wake` usam `park`/`unpark`, que têm exatamente a
//! semântica de permissão exigida por `ThreadScheduler`.

use super::context::{CoreMask, CurrentContext, SchedulerContext, ThreadId, ThreadScheduler};
use crate::core::object::types::{KProcess, KThread};
use crate::core::object::KScopedAutoObject;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::Thread;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(0x100);

std::thread_local! {
    static CURRENT_ID: Cell<u64> = const { Cell::new(0) };
}

/// Threads de host para testes concorrentes: até `max`, limitado pelos CPUs
/// disponíveis, mas nunca menos de duas.
pub fn host_threads(max: usize) -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(2, max.max(2))
}

/// Scheduler simulado com contadores de cada chamada.
#[derive(Default)]
pub struct HostScheduler {
    threads: Mutex<HashMap<u64, Thread>>,
    bound: Mutex<HashMap<u64, (KScopedAutoObject<KThread>, KScopedAutoObject<KProcess>)>>,
    pub disable_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub enable_calls: AtomicUsize,
    pub wake_calls: AtomicUsize,
    pub suspend_calls: AtomicUsize,
    next_mask: AtomicU64,
    last_enabled: AtomicU64,
}

impl HostScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Máscara devolvida pelo próximo `update_highest_priority_threads`.
    pub fn set_stale_cores(&self, mask: CoreMask) {
        self.next_mask.store(mask.bits(), Ordering::Relaxed);
    }

    /// Máscara recebida pelo último `enable_scheduling`.
    pub fn last_enabled_cores(&self) -> CoreMask {
        CoreMask::from_bits_retain(self.last_enabled.load(Ordering::Relaxed))
    }

    /// Associa os objetos KThread/KProcess à thread de host atual.
    pub fn bind_current(
        &self,
        thread: KScopedAutoObject<KThread>,
        process: KScopedAutoObject<KProcess>,
    ) {
        let id = self.current_thread_id().raw();
        self.bound.lock().unwrap().insert(id, (thread, process));
    }

    /// Remove os objetos associados (devolve as referências).
    pub fn unbind_current(&self) {
        let id = self.current_thread_id().raw();
        let removed = self.bound.lock().unwrap().remove(&id);
        drop(removed);
    }
}

impl SchedulerContext for HostScheduler {
    fn current_thread_id(&self) -> ThreadId {
        let id = CURRENT_ID.with(|cell| {
            if cell.get() == 0 {
                cell.set(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
            }
            cell.get()
        });
        self.threads
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(std::thread::current);
        ThreadId(id)
    }

    fn disable_scheduling(&self) {
        self.disable_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn update_highest_priority_threads(&self) -> CoreMask {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        CoreMask::from_bits_retain(self.next_mask.load(Ordering::Relaxed))
    }

    fn enable_scheduling(&self, cores: CoreMask) {
        self.last_enabled.store(cores.bits(), Ordering::Relaxed);
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl ThreadScheduler for HostScheduler {
    fn suspend_current(&self) {
        self.suspend_calls.fetch_add(1, Ordering::SeqCst);
        std::thread::park();
    }

    fn wake(&self, thread: ThreadId) {
        self.wake_calls.fetch_add(1, Ordering::SeqCst);
        let handle = self.threads.lock().unwrap().get(&thread.raw()).cloned();
        if let Some(handle) = handle {
            handle.unpark();
        }
    }
}

impl CurrentContext for HostScheduler {
    fn current_thread(&self) -> Option<KScopedAutoObject<KThread>> {
        let id = self.current_thread_id().raw();
        self.bound.lock().unwrap().get(&id).map(|(t, _)| t.clone())
    }

    fn current_process(&self) -> Option<KScopedAutoObject<KProcess>> {
        let id = self.current_thread_id().raw();
        self.bound.lock().unwrap().get(&id).map(|(_, p)| p.clone())
    }
}
