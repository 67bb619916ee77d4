//! # Object Tests
//!
//! Suite de boot do sistema de objetos: class tokens, ciclo de vida por
//! refcount, downcast e registro de nomes.

#[cfg(test)]
use super::kobject::impl_auto_object;
use super::types::{KEvent, KInterruptEvent, KThread};
use super::{IntoAutoObject, KObjectNameRegistry, KScopedAutoObject, ObjectKind};
#[cfg(test)]
use super::KAutoObjectBase;
use crate::klib::test_framework::{check, run_test_suite, TestCase, TestResult, TestSummary};
use crate::mm::alloc::KObjectSlab;
use crate::mm::test::scratch_arena;
use crate::sched::EarlyBootContext;
use crate::sys::error::KernelError;
use alloc::boxed::Box;
#[cfg(test)]
use core::sync::atomic::{AtomicUsize, Ordering};

const OBJECT_TESTS: &[TestCase] = &[
    TestCase {
        name: "(Obj) Class tokens finais disjuntos",
        func: test_final_tokens_disjoint,
    },
    TestCase {
        name: "(Obj) Destruicao na ultima referencia",
        func: test_destroy_on_last_close,
    },
    TestCase {
        name: "(Obj) Downcast por class token",
        func: test_downcast,
    },
    TestCase {
        name: "(Obj) InterruptEvent herda ReadableEvent",
        func: test_interrupt_event_readable,
    },
    TestCase {
        name: "(Obj) Registro de nomes",
        func: test_name_registry,
    },
];

/// Executa todos os testes de objetos
pub fn run_object_tests() -> TestSummary {
    run_test_suite("Objetos", OBJECT_TESTS)
}

// =============================================================================
// OBJETO RASTREADO (apenas testes de host)
// =============================================================================

/// Contadores de ciclo de vida observados pelos testes.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct LifeCounters {
    pub finalized: AtomicUsize,
    pub dropped: AtomicUsize,
}

#[cfg(test)]
impl LifeCounters {
    pub fn leak() -> &'static LifeCounters {
        Box::leak(Box::new(LifeCounters::default()))
    }

    pub fn finalized(&self) -> usize {
        self.finalized.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// Objeto que conta `finalize` e `drop`.
///
/// Toma emprestado o kind `IoPool`, que nenhum tipo do crate usa. Existe só
/// em `cfg(test)`: builds com `self_test` não carregam este tipo.
#[cfg(test)]
pub(crate) struct TrackedObject {
    base: KAutoObjectBase,
    counters: &'static LifeCounters,
}

#[cfg(test)]
impl_auto_object!(TrackedObject => IoPool, finalize);

#[cfg(test)]
impl TrackedObject {
    pub fn create(counters: &'static LifeCounters) -> KScopedAutoObject<TrackedObject> {
        KScopedAutoObject::new(Self {
            base: KAutoObjectBase::new(),
            counters,
        })
    }

    fn on_finalize(&self) {
        self.counters.finalized.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Drop for TrackedObject {
    fn drop(&mut self) {
        // finalize sempre acontece antes da memória ser devolvida
        assert_eq!(self.counters.finalized(), 1, "drop sem finalize");
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// CASOS
// =============================================================================

fn test_final_tokens_disjoint() -> TestResult {
    let mut ok = true;
    for a in ObjectKind::ALL.iter().copied().filter(|k| k.is_final()) {
        let token = a.class_token();
        ok &= token.is_final() && token.raw().count_ones() >= 4;
        for b in ObjectKind::ALL.iter().copied().filter(|k| k.is_final()) {
            ok &= a.is_derived_from(b) == (a == b);
        }
    }
    check(ok)
}

fn test_destroy_on_last_close() -> TestResult {
    // Slab próprio: o slot ocupado mostra se o objeto ainda existe
    let arena = scratch_arena(2);
    let slab: &'static KObjectSlab<KEvent> = match KObjectSlab::new(&arena, 1) {
        Ok(slab) => Box::leak(Box::new(slab)),
        Err(_) => return TestResult::Failed,
    };
    let Ok(event) = slab.create(KEvent::new()) else {
        return TestResult::Failed;
    };

    let second = event.clone();
    let third = second.clone();
    let shared = KScopedAutoObject::reference_count(&event) == 3;

    drop(event);
    drop(third);
    let alive = slab.used_size() == 1 && KScopedAutoObject::reference_count(&second) == 1;

    drop(second);
    check(shared && alive && slab.used_size() == 0)
}

fn test_downcast() -> TestResult {
    let Ok(event) = KEvent::create() else {
        return TestResult::Failed;
    };
    let erased = event.into_auto_object();

    let kinds_ok = erased.is_instance_of(ObjectKind::AutoObject)
        && erased.is_instance_of(ObjectKind::Event)
        && !erased.is_instance_of(ObjectKind::SynchronizationObject)
        && erased.type_name() == "KEvent";

    let erased = match erased.downcast::<KThread>() {
        Ok(_) => return TestResult::Failed,
        Err(original) => original,
    };
    let refs_kept = KScopedAutoObject::reference_count(&erased) == 1;

    let typed_ok = match erased.downcast::<KEvent>() {
        Ok(event) => {
            event.signal();
            event.is_signaled()
        }
        Err(_) => false,
    };

    check(kinds_ok && refs_kept && typed_ok)
}

fn test_interrupt_event_readable() -> TestResult {
    let Ok(event) = KInterruptEvent::create(7) else {
        return TestResult::Failed;
    };
    let irq_ok = event.irq() == 7;
    let erased = event.into_auto_object();

    check(
        irq_ok
            && erased.is_instance_of(ObjectKind::ReadableEvent)
            && erased.is_instance_of(ObjectKind::SynchronizationObject)
            && !erased.is_instance_of(ObjectKind::Event),
    )
}

fn test_name_registry() -> TestResult {
    let ctx = EarlyBootContext;
    let registry = KObjectNameRegistry::new();

    let Ok(event) = KEvent::create() else {
        return TestResult::Failed;
    };
    let erased = event.into_auto_object();

    let registered = registry.register(&ctx, &erased, "boot:event").is_ok();
    let duplicate =
        registry.register(&ctx, &erased, "boot:event") == Err(KernelError::InvalidState);
    let found = match registry.find(&ctx, "boot:event") {
        Ok(found) => KScopedAutoObject::ptr_eq(&found, &erased),
        Err(_) => false,
    };
    let typed = registry.find_object::<KEvent, _>(&ctx, "boot:event").is_ok();
    let wrong_type = registry.find_object::<KThread, _>(&ctx, "boot:event").is_err();

    let removed = registry.unregister(&ctx, &erased, "boot:event").is_ok();
    let gone = registry.find(&ctx, "boot:event").err() == Some(KernelError::NotFound);

    check(
        registered
            && duplicate
            && found
            && typed
            && wrong_type
            && removed
            && gone
            && registry.count(&ctx) == 0
            && KScopedAutoObject::reference_count(&erased) == 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{OBJECT_NAME_COUNT_MAX, OBJECT_NAME_LENGTH_MAX};
    use crate::core::object::types::{KProcess, KSharedMemory};
    use crate::core::object::KAutoObject;
    use crate::sched::host::{host_threads, HostScheduler};
    use crate::sched::ThreadId;
    use std::format;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::vec::Vec;

    #[test]
    fn boot_suite_passes() {
        assert!(run_object_tests().is_ok());
    }

    #[test]
    fn concurrent_open_close_destroys_exactly_once() {
        const ROUNDS: usize = 2_000;

        let threads = host_threads(8);
        let counters = LifeCounters::leak();
        let tracked = TrackedObject::create(counters);
        let start = Arc::new(Barrier::new(threads));

        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let mine = tracked.clone();
                let start = start.clone();
                thread::spawn(move || {
                    start.wait();
                    for _ in 0..ROUNDS {
                        let extra = mine.clone();
                        drop(extra);
                    }
                    // Cada thread solta a sua referência: a última destrói
                    drop(mine);
                })
            })
            .collect();

        drop(tracked);
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(counters.finalized(), 1);
        assert_eq!(counters.dropped(), 1);
    }

    #[test]
    fn raw_round_trip_keeps_reference() {
        let counters = LifeCounters::leak();
        let tracked = TrackedObject::create(counters);
        let keeper = tracked.clone();

        let raw = KScopedAutoObject::into_raw(tracked);
        assert_eq!(KScopedAutoObject::reference_count(&keeper), 2);
        let back = unsafe { KScopedAutoObject::from_raw(raw) };
        assert!(KScopedAutoObject::ptr_eq(&back, &keeper));

        drop(back);
        assert_eq!(counters.finalized(), 0);
        drop(keeper);
        assert_eq!(counters.finalized(), 1);
    }

    #[test]
    fn downcast_ref_leaves_refcount_alone() {
        let memory = KSharedMemory::create(0x4000).unwrap().into_auto_object();
        let before = KScopedAutoObject::reference_count(&memory);

        let typed = memory.downcast_ref::<KSharedMemory>().unwrap();
        assert_eq!(typed.size(), 0x4000);
        assert!(memory.downcast_ref::<KEvent>().is_none());
        assert_eq!(KScopedAutoObject::reference_count(&memory), before);
    }

    #[test]
    fn instances_answer_for_their_ancestors() {
        let thread = KThread::create(ThreadId(42), 0).unwrap().into_auto_object();
        assert!(thread.is_instance_of(ObjectKind::SynchronizationObject));
        assert!(thread.is_instance_of(ObjectKind::Thread));
        assert!(!thread.is_instance_of(ObjectKind::Process));
        assert!(!thread.is_instance_of(ObjectKind::ReadableEvent));

        let process = KProcess::create(4).unwrap().into_auto_object();
        assert!(process.is_instance_of(ObjectKind::SynchronizationObject));
        assert_eq!(process.kind(), ObjectKind::Process);
        assert!(process.downcast::<KThread>().is_err());
    }

    #[test]
    fn clone_through_erased_form_opens_a_new_reference() {
        let counters = LifeCounters::leak();
        let tracked = TrackedObject::create(counters);
        let erased = tracked.clone().into_auto_object();

        let copy = erased.clone();
        assert_eq!(KScopedAutoObject::reference_count(&copy), 3);
        drop((tracked, erased));
        assert_eq!(counters.finalized(), 0);
        assert_eq!(KScopedAutoObject::reference_count(&copy), 1);
        drop(copy);
        assert_eq!(counters.dropped(), 1);
    }

    #[test]
    fn created_objects_own_their_storage() {
        // Fora do crate só `create` produz objetos: cada dono foi aberto pelo
        // storage e sobrevive enquanto existir uma referência.
        let event = KEvent::create().unwrap();
        let borrowed: &KEvent = &event;
        borrowed.signal();

        let owner = event.clone();
        drop(event);
        assert_eq!(KScopedAutoObject::reference_count(&owner), 1);
        assert!(owner.is_signaled());

        // Churn de heap reutilizaria a memória se o objeto já tivesse sido liberado
        let churn: Vec<_> = (0..64).map(|_| KEvent::create().unwrap()).collect();
        assert!(churn.iter().all(|e| !KScopedAutoObject::ptr_eq(e, &owner)));
        assert!(owner.is_signaled());
    }

    #[test]
    fn name_validation() {
        let ctx = EarlyBootContext;
        let registry = KObjectNameRegistry::new();
        let event = KEvent::create().unwrap().into_auto_object();

        let too_long = "x".repeat(OBJECT_NAME_LENGTH_MAX + 1);
        let exact = "y".repeat(OBJECT_NAME_LENGTH_MAX);

        assert_eq!(
            registry.register(&ctx, &event, &too_long),
            Err(KernelError::OutOfRange)
        );
        assert_eq!(
            registry.register(&ctx, &event, ""),
            Err(KernelError::InvalidPointer)
        );
        assert_eq!(
            registry.register(&ctx, &event, "nul\0name"),
            Err(KernelError::InvalidPointer)
        );
        assert!(registry.register(&ctx, &event, &exact).is_ok());
        assert_eq!(registry.count(&ctx), 1);
    }

    #[test]
    fn unregister_requires_matching_object() {
        let ctx = EarlyBootContext;
        let registry = KObjectNameRegistry::new();
        let first = KEvent::create().unwrap().into_auto_object();
        let second = KEvent::create().unwrap().into_auto_object();

        registry.register(&ctx, &first, "svc").unwrap();
        assert_eq!(KScopedAutoObject::reference_count(&first), 2);
        assert_eq!(
            registry.unregister(&ctx, &second, "svc"),
            Err(KernelError::NotFound)
        );
        registry.unregister(&ctx, &first, "svc").unwrap();
        assert_eq!(KScopedAutoObject::reference_count(&first), 1);
    }

    #[test]
    fn registry_keeps_object_alive() {
        let ctx = EarlyBootContext;
        let registry = KObjectNameRegistry::new();
        let counters = LifeCounters::leak();

        let tracked = TrackedObject::create(counters).into_auto_object();
        registry.register(&ctx, &tracked, "tracked").unwrap();
        drop(tracked);
        assert_eq!(counters.finalized(), 0);

        let found = registry.find_object::<TrackedObject, _>(&ctx, "tracked").unwrap();
        let erased = found.clone().into_auto_object();
        registry.unregister(&ctx, &erased, "tracked").unwrap();
        drop((found, erased));
        assert_eq!(counters.finalized(), 1);
    }

    #[test]
    fn registry_capacity_is_bounded() {
        let ctx = EarlyBootContext;
        let registry = KObjectNameRegistry::new();
        let event = KEvent::create().unwrap().into_auto_object();

        for index in 0..OBJECT_NAME_COUNT_MAX {
            registry
                .register(&ctx, &event, &format!("n{}", index))
                .unwrap();
        }
        assert_eq!(
            registry.register(&ctx, &event, "overflow"),
            Err(KernelError::OutOfResource)
        );
        assert_eq!(
            KScopedAutoObject::reference_count(&event),
            1 + OBJECT_NAME_COUNT_MAX as u32
        );
    }

    #[test]
    fn concurrent_registration_under_light_lock() {
        const PER_THREAD: usize = 8;

        let sched = Arc::new(HostScheduler::new());
        let registry = Arc::new(KObjectNameRegistry::new());
        let event = KEvent::create().unwrap().into_auto_object();

        let threads = host_threads(6);
        let workers: Vec<_> = (0..threads)
            .map(|worker| {
                let sched = sched.clone();
                let registry = registry.clone();
                let event = event.clone();
                thread::spawn(move || {
                    for index in 0..PER_THREAD {
                        let name = format!("t{}:{}", worker, index);
                        registry.register(&*sched, &event, &name).unwrap();
                        assert!(registry.find(&*sched, &name).is_ok());
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(registry.count(&*sched), threads * PER_THREAD);
    }
}
