//! Meso Kernel Object Core.
//!
//! Ponto central de exportação dos módulos do núcleo de objetos.
//! Define a hierarquia: locks → slab heaps → KAutoObject → tabela de handles.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (Box/Vec para tabelas e filas de espera)
extern crate alloc;

// --- Módulos de Baixo Nível (Hardware) ---
pub mod arch; // Máscara de interrupções e capacidades do alvo

// --- Módulos Centrais (Lógica do Kernel) ---
pub mod core; // Objetos, handles, logging, inicialização
pub mod klib; // Utilitários Internos (Bitmaps, Testes)
pub mod mm; // Arena de páginas e slab heaps
pub mod sched; // Contrato com o scheduler (contexto explícito)
pub mod sync; // Spinlocks, scheduler lock, light lock
pub mod sys; // Códigos de resultado do kernel

pub use crate::core::handle::KHandleTable;
pub use crate::core::object::{Handle, KAutoObject, KScopedAutoObject, ObjectKind};
pub use crate::sys::error::{KResult, KernelError};
