//! Sistema de Inicialização por Fases
//!
//! Gerencia a ordem de inicialização do núcleo de objetos.
//!
//! # Ordem de Inicialização
//! 1. Tabela de class tokens (colisões derrubam o kernel aqui, não depois)
//! 2. Slab heaps dos tipos de objeto (commit na arena de páginas)
//! 3. Self-tests (feature `self_test`)
//!
//! O scheduler, o VMM e o resto do boot ficam fora daqui: quem chama já
//! entrega uma arena com memória mapeada.

use crate::core::object::class::class_table;
use crate::core::object::types::init_object_slabs;
use crate::mm::arena::KPageArena;
use crate::sys::error::KResult;
use core::sync::atomic::{AtomicU8, Ordering};

/// Fases de inicialização do núcleo
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum InitPhase {
    /// Nada inicializado ainda
    None = 0,
    /// Fase 1: Class tokens
    ClassTable = 1,
    /// Fase 2: Slab heaps de objetos
    ObjectSlabs = 2,
    /// Fase 3: Self-tests concluídos (ou pulados)
    Ready = 3,
}

static PHASE: AtomicU8 = AtomicU8::new(InitPhase::None as u8);

/// Última fase concluída.
pub fn current_phase() -> InitPhase {
    match PHASE.load(Ordering::Acquire) {
        1 => InitPhase::ClassTable,
        2 => InitPhase::ObjectSlabs,
        3 => InitPhase::Ready,
        _ => InitPhase::None,
    }
}

fn advance(phase: InitPhase) {
    PHASE.fetch_max(phase as u8, Ordering::AcqRel);
}

/// Inicializa o núcleo de objetos.
///
/// Idempotente: chamadas repetidas não recriam nada.
pub fn init(arena: &KPageArena) -> KResult<()> {
    crate::kinfo!("(Init) Inicializando nucleo de objetos...");

    class_table();
    advance(InitPhase::ClassTable);
    crate::kok!("(Init) Class tokens");

    if let Err(err) = init_object_slabs(arena) {
        crate::kerror!("(Init) Falha ao criar slabs de objetos, erro=", err.raw());
        return Err(err);
    }
    advance(InitPhase::ObjectSlabs);
    crate::kok!("(Init) Slabs de objetos");

    #[cfg(feature = "self_test")]
    {
        let summary = run_self_tests();
        if !summary.is_ok() {
            crate::kwarn!("(Init) Self-tests com falhas=", summary.failed);
        }
    }

    advance(InitPhase::Ready);
    crate::kinfo!("(Init) Nucleo de objetos pronto");
    Ok(())
}

/// Executa todas as suites de self-test.
#[cfg(any(test, feature = "self_test"))]
pub fn run_self_tests() -> crate::klib::test_framework::TestSummary {
    let mut summary = crate::sync::test::run_sync_tests();
    summary.merge(crate::mm::test::run_mm_tests());
    summary.merge(crate::core::object::test::run_object_tests());
    summary.merge(crate::core::test::run_handle_tests());
    summary
}
