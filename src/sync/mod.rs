//! # Synchronization Primitives
//!
//! Disciplina de locks do núcleo de objetos.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! KTicketSpinLock / Spinlock → Seções críticas curtas (não pode dormir)
//! KSchedulerLock             → Decisões de escalonamento (reentrante)
//! KLightLock / KLightMutex   → Seções que podem bloquear (suspende a thread)
//! ```
//!
//! ## Regras
//!
//! - **Spinlock**: Usar quando NÃO pode dormir (IRQ handlers, tabela de handles)
//! - **LightLock**: Nunca em contexto de interrupção
//! - **Ordem de Lock**: Sempre adquirir na mesma ordem para evitar deadlock
//! - Nenhum destes primitivos tem timeout

// =============================================================================
// PRIMITIVAS BÁSICAS
// =============================================================================

/// Ticket spinlocks (busy-wait, não dorme)
pub mod spinlock;

/// Lock do scheduler (reentrante pelo dono)
pub mod scheduler_lock;

/// Mutex leve (suspende a thread)
pub mod light_lock;


// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use light_lock::{KLightLock, KLightMutex, KLightMutexGuard, KScopedLightLock};
pub use scheduler_lock::{KSchedulerLock, KScopedSchedulerLock};
pub use spinlock::{
    KAlignedTicketSpinLock, KScopedSpinLock, KTicketSpinLock, RawSpinLock, Spinlock,
    SpinlockGuard,
};
