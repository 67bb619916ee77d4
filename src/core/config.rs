//! # Configuração do Núcleo de Objetos
//!
//! Constantes compiladas que limitam as estruturas do núcleo.

// =============================================================================
// TABELA DE HANDLES
// =============================================================================

/// Teto da tabela de handles por processo.
///
/// Pedidos acima disso são truncados silenciosamente (com `kwarn!`).
pub const MAX_HANDLE_TABLE_SIZE: usize = 1024;

/// Menor ID de geração válido (0 marca slot livre).
pub const MIN_LINEAR_ID: u16 = 1;

/// Maior ID de geração (15 bits). Depois dele o contador volta a `MIN_LINEAR_ID`.
pub const MAX_LINEAR_ID: u16 = 0x7FFF;

// =============================================================================
// NOMES DE OBJETOS
// =============================================================================

/// Tamanho máximo de um nome registrado (sem terminador).
pub const OBJECT_NAME_LENGTH_MAX: usize = 12;

/// Quantidade máxima de nomes registrados simultaneamente.
pub const OBJECT_NAME_COUNT_MAX: usize = 64;
