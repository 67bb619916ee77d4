//! # Memory Tests
//!
//! Suite de boot da arena de páginas e dos slab heaps. Cada teste cria sua
//! própria arena sobre um buffer do heap do kernel, então a suite não
//! consome a arena real.

use super::alloc::{KDynamicSlabHeap, KObjectSlab, KSlabHeapAtomic};
use super::arena::KPageArena;
use super::config::PAGE_SIZE;
use crate::core::object::types::KEvent;
use crate::core::object::KScopedAutoObject;
use crate::klib::test_framework::{check, run_test_suite, TestCase, TestResult, TestSummary};
use alloc::boxed::Box;
use core::alloc::Layout;

const MM_TESTS: &[TestCase] = &[
    TestCase {
        name: "(MM) Arena commit/decommit",
        func: test_arena_commit,
    },
    TestCase {
        name: "(MM) Slab atomico esgota e recicla",
        func: test_atomic_slab_exhaustion,
    },
    TestCase {
        name: "(MM) Slab com lock estatisticas",
        func: test_dynamic_slab_stats,
    },
    TestCase {
        name: "(MM) Slab de objetos devolve slot",
        func: test_object_slab_release,
    },
];

/// Executa todos os testes de memória
pub fn run_mm_tests() -> TestSummary {
    run_test_suite("Memoria", MM_TESTS)
}

/// Arena de `pages` páginas sobre um buffer vazado do heap.
pub fn scratch_arena(pages: usize) -> KPageArena {
    // Uma página extra para o alinhamento
    let region = Box::leak(alloc::vec![0u8; (pages + 1) * PAGE_SIZE].into_boxed_slice());
    KPageArena::from_static(region)
}

fn test_arena_commit() -> TestResult {
    let arena = scratch_arena(4);
    let before = arena.used_size();

    let block = match arena.commit(100, 8) {
        Ok(block) => block,
        Err(_) => return TestResult::Failed,
    };
    let aligned = block.as_ptr() as usize % PAGE_SIZE == 0;
    let grew = arena.used_size() >= before + PAGE_SIZE;

    // SAFETY: Mesmos parâmetros do commit
    unsafe { arena.decommit(block, 100, 8) };

    let too_big = arena.commit(64 * PAGE_SIZE, 8).is_err();
    check(aligned && grew && arena.used_size() == before && too_big)
}

fn test_atomic_slab_exhaustion() -> TestResult {
    let arena = scratch_arena(2);
    let heap = match KSlabHeapAtomic::new(&arena, Layout::new::<u64>(), 4) {
        Ok(heap) => heap,
        Err(_) => return TestResult::Failed,
    };

    let mut slots = [None; 4];
    for slot in slots.iter_mut() {
        *slot = heap.allocate();
    }
    let all_given = slots.iter().all(Option::is_some);
    let exhausted = heap.allocate().is_none();

    let Some(last) = slots[3] else {
        return TestResult::Failed;
    };
    // SAFETY: Slot entregue por este heap e não usado depois
    unsafe { heap.free(last) };
    let recycled = heap.allocate() == Some(last);

    check(all_given && exhausted && recycled && heap.free_size() == 0)
}

fn test_dynamic_slab_stats() -> TestResult {
    let arena = scratch_arena(2);
    let heap = match KDynamicSlabHeap::new(&arena, Layout::new::<[u64; 4]>(), 2) {
        Ok(heap) => heap,
        Err(_) => return TestResult::Failed,
    };

    let (Some(a), Some(_b)) = (heap.allocate(), heap.allocate()) else {
        return TestResult::Failed;
    };
    let empty = heap.allocate().is_none();
    // SAFETY: Slot entregue por este heap
    unsafe { heap.free(a) };

    check(
        empty
            && heap.total_size() == 2
            && heap.used_size() == 1
            && heap.free_size() == 1
            && heap.peak_size() == 2
            && heap.retried_count() == 1,
    )
}

fn test_object_slab_release() -> TestResult {
    let arena = scratch_arena(2);
    let slab: &'static KObjectSlab<KEvent> = match KObjectSlab::new(&arena, 2) {
        Ok(slab) => Box::leak(Box::new(slab)),
        Err(_) => return TestResult::Failed,
    };

    let Ok(event) = slab.create(KEvent::new()) else {
        return TestResult::Failed;
    };
    let inside = slab.contains(KScopedAutoObject::as_ptr(&event).cast());
    let used = slab.used_size() == 1;
    drop(event);

    check(inside && used && slab.used_size() == 0 && slab.free_size() == 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::TargetCapabilities;
    use crate::mm::alloc::{KSlabHeap, SlabBlock};
    use crate::sched::host::host_threads;
    use crate::sys::error::KernelError;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    /// Heap tipado com a estratégia forçada.
    fn typed_heap<T>(arena: &KPageArena, capacity: usize, lock_free: bool) -> KSlabHeap<T> {
        let caps = TargetCapabilities {
            lock_free_slab: lock_free,
        };
        KSlabHeap::with_capabilities(arena, capacity, caps).unwrap()
    }

    #[test]
    fn boot_suite_passes() {
        assert!(run_mm_tests().is_ok());
    }

    #[test]
    fn typed_heap_hands_out_distinct_aligned_slots() {
        for lock_free in [true, false] {
            let arena = scratch_arena(4);
            let heap: KSlabHeap<[u64; 3]> = typed_heap(&arena, 16, lock_free);
            assert_eq!(heap.is_lock_free(), lock_free);

            let slots: Vec<_> = (0..16).map(|_| heap.allocate().unwrap()).collect();
            assert!(heap.allocate().is_none());

            let unique: HashSet<usize> = slots.iter().map(|p| p.as_ptr() as usize).collect();
            assert_eq!(unique.len(), 16);
            assert!(slots
                .iter()
                .all(|p| p.as_ptr() as usize % core::mem::align_of::<[u64; 3]>() == 0));

            for slot in slots {
                unsafe { heap.free(slot) };
            }
            assert_eq!(heap.free_size(), 16);
        }
    }

    #[test]
    fn capacity_follows_region_size() {
        let arena = scratch_arena(4);
        let slot = SlabBlock::slot_layout(Layout::new::<[u64; 3]>()).size();
        assert_eq!(slot, 24);

        let heap: KSlabHeap<[u64; 3]> = KSlabHeap::with_region_size(&arena, PAGE_SIZE).unwrap();
        assert_eq!(heap.total_size(), PAGE_SIZE / slot);

        // Sobra menor que um slot é descartada
        let heap: KSlabHeap<[u64; 3]> = KSlabHeap::with_region_size(&arena, 5 * slot + 7).unwrap();
        assert_eq!(heap.total_size(), 5);
        let slots: Vec<_> = (0..5).map(|_| heap.allocate().unwrap()).collect();
        assert!(heap.allocate().is_none());
        assert_eq!(slots.len(), 5);

        // Slots pequenos sobem para o mínimo do link da free list
        assert_eq!(
            KSlabHeap::<u8>::capacity_for(64),
            64 / crate::mm::config::SLAB_MIN_SLOT_SIZE
        );
        assert_eq!(
            KSlabHeap::<[u64; 3]>::with_region_size(&arena, slot - 1).err(),
            Some(KernelError::OutOfRange)
        );
    }

    #[test]
    #[should_panic]
    fn atomic_double_free_is_fatal() {
        let arena = scratch_arena(1);
        let heap = KSlabHeapAtomic::new(&arena, Layout::new::<u64>(), 4).unwrap();
        let slot = heap.allocate().unwrap();
        unsafe {
            heap.free(slot);
            heap.free(slot);
        }
    }

    #[test]
    #[should_panic]
    fn locked_double_free_is_fatal() {
        let arena = scratch_arena(1);
        let heap = KDynamicSlabHeap::new(&arena, Layout::new::<u64>(), 4).unwrap();
        let slot = heap.allocate().unwrap();
        unsafe {
            heap.free(slot);
            heap.free(slot);
        }
    }

    #[test]
    #[should_panic]
    fn free_of_foreign_pointer_is_fatal() {
        let arena = scratch_arena(1);
        let heap = KSlabHeapAtomic::new(&arena, Layout::new::<u64>(), 4).unwrap();
        let mut outside = 0u64;
        unsafe { heap.free(core::ptr::NonNull::from(&mut outside).cast()) };
    }

    #[test]
    #[should_panic]
    fn free_of_misaligned_pointer_is_fatal() {
        let arena = scratch_arena(1);
        let heap = KDynamicSlabHeap::new(&arena, Layout::new::<u64>(), 4).unwrap();
        let slot = heap.allocate().unwrap();
        unsafe { heap.free(core::ptr::NonNull::new_unchecked(slot.as_ptr().add(1))) };
    }

    #[test]
    fn lock_free_slab_survives_concurrent_churn() {
        const ROUNDS: usize = 5_000;
        const CAPACITY: usize = 32;

        let arena = scratch_arena(4);
        let heap: Arc<KSlabHeap<u64>> = Arc::new(typed_heap(&arena, CAPACITY, true));

        let workers: Vec<_> = (0..host_threads(8))
            .map(|worker| {
                let heap = heap.clone();
                thread::spawn(move || {
                    let stamp = 0xA5A5_0000_0000_0000u64 | worker as u64;
                    let mut held = Vec::new();
                    for round in 0..ROUNDS {
                        if let Some(slot) = heap.allocate() {
                            // Um slot entregue a duas threads seria sobrescrito
                            unsafe { slot.as_ptr().write(stamp) };
                            held.push(slot);
                        }
                        if round % 3 == 0 || held.len() > 2 {
                            while let Some(slot) = held.pop() {
                                assert_eq!(unsafe { slot.as_ptr().read() }, stamp);
                                unsafe { heap.free(slot) };
                            }
                        }
                    }
                    for slot in held {
                        assert_eq!(unsafe { slot.as_ptr().read() }, stamp);
                        unsafe { heap.free(slot) };
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(heap.used_size(), 0);
        let drained: Vec<_> = (0..CAPACITY).map(|_| heap.allocate()).collect();
        assert!(drained.iter().all(Option::is_some));
        assert!(heap.allocate().is_none());
    }

    #[test]
    fn object_slab_exhaustion_reports_out_of_resource() {
        let arena = scratch_arena(2);
        let slab: &'static KObjectSlab<KEvent> =
            Box::leak(Box::new(KObjectSlab::new(&arena, 2).unwrap()));

        let first = slab.create(KEvent::new()).unwrap();
        let second = slab.create(KEvent::new()).unwrap();
        assert_eq!(
            slab.create(KEvent::new()).unwrap_err(),
            KernelError::OutOfResource
        );

        // Uma referência extra mantém o objeto vivo após o drop do original
        let extra = first.clone();
        drop(first);
        assert_eq!(slab.used_size(), 2);
        drop(extra);
        assert_eq!(slab.used_size(), 1);

        let third = slab.create(KEvent::new()).unwrap();
        assert_eq!(slab.used_size(), 2);
        drop((second, third));
        assert_eq!(slab.used_size(), 0);
    }
}
