//! # Memory Management (MM)
//!
//! Memória de apoio do núcleo de objetos. Não gerencia páginas físicas nem
//! tabelas de página: recebe uma região já mapeada e a reparte.
//!
//! ```text
//! região mapeada ──▶ KPageArena (commit por página)
//!                        │
//!                        ▼
//!                 Slab heaps (slots de tamanho fixo por tipo de objeto)
//! ```
//!
//! ## Regras
//! - Slab heaps nunca devolvem o bloco à arena (vivem até o desligamento).
//! - Double free e free de ponteiro estranho são defeitos fatais.

pub mod alloc;
pub mod arena;
pub mod config;

#[cfg(any(test, feature = "self_test"))]
pub mod test;

pub use self::alloc::{KDynamicSlabHeap, KObjectSlab, KSlabHeap, KSlabHeapAtomic};
pub use arena::KPageArena;
