// Arquivo: core/object/refcount.rs
//
// Propósito: Contagem de referências atômica dos KAutoObjects.
//
// Detalhes de Implementação:
// - Usa `AtomicU32` (o contador nunca fica negativo).
// - Semântica Acquire/Release: quem leva o contador a zero enxerga todas as
//   escritas feitas pelos donos anteriores antes de destruir o objeto.
// - Underflow e ressurreição (open em objeto morto) são defeitos fatais.

//! Reference Counting

use crate::core::panic::fatal;
use core::sync::atomic::{fence, AtomicU32, Ordering};

/// Contador de referências atômico
#[derive(Debug)]
pub struct RefCount {
    count: AtomicU32,
}

impl RefCount {
    /// Cria um novo contador com valor inicial
    pub const fn new(initial: u32) -> Self {
        Self {
            count: AtomicU32::new(initial),
        }
    }

    /// Incrementa o contador de referências.
    ///
    /// Quem chama já segura uma referência válida, então Relaxed basta.
    #[inline]
    pub fn open(&self) {
        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        if prev == 0 {
            fatal("(Obj) Open em objeto ja destruido", 0);
        }
        if prev == u32::MAX {
            fatal("(Obj) Overflow de refcount", prev as u64);
        }
    }

    /// Decrementa o contador de referências.
    /// Retorna `true` exatamente na transição 1 → 0 (o objeto deve ser destruído).
    #[inline]
    #[must_use]
    pub fn close(&self) -> bool {
        let prev = self.count.fetch_sub(1, Ordering::Release);

        if prev == 0 {
            fatal("(Obj) Underflow de refcount", 0);
        }

        if prev == 1 {
            fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }

    /// Retorna o valor atual (aproximado/relaxado).
    #[inline]
    pub fn get(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}
