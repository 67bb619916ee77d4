//! # Configuração do Módulo de Memória
//!
//! Define constantes e tamanhos padrão dos slab heaps do núcleo de objetos.

// =============================================================================
// CONSTANTES DE TAMANHO
// =============================================================================

/// Tamanho de uma página (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Tamanho de linha de cache (para evitar false sharing)
pub const CACHE_LINE_SIZE: usize = 64;

// =============================================================================
// CONFIGURAÇÃO DOS SLAB HEAPS
// =============================================================================

/// Menor slot de slab: precisa caber o link da free list.
pub const SLAB_MIN_SLOT_SIZE: usize = 8;

/// Índice reservado: fim da free list.
pub const SLAB_NIL_INDEX: u32 = u32::MAX;

/// Slots padrão por tipo de objeto (commit único no boot).
pub const SLAB_COUNT_THREAD: usize = 800;
pub const SLAB_COUNT_PROCESS: usize = 80;
pub const SLAB_COUNT_EVENT: usize = 900;
pub const SLAB_COUNT_INTERRUPT_EVENT: usize = 100;
pub const SLAB_COUNT_SHARED_MEMORY: usize = 80;
