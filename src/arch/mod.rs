//! # Hardware Abstraction Layer (HAL)
//!
//! O módulo `arch` é a ponte entre o núcleo de objetos (lógica agnóstica) e o
//! hardware. O núcleo só precisa de duas coisas da CPU: mascarar interrupções
//! em volta de spinlocks e saber se o slab lock-free é seguro no alvo.
//!
//! ## Seleção de Plataforma
//! - `x86_64` bare-metal (`target_os = "none"`): instruções `cli`/`sti`/`pause`.
//! - Qualquer outro alvo (ex: testes no host): emulação sem privilégios.

pub mod traits;

// Seleção de Arquitetura: x86_64 bare-metal
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod x86_64;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use x86_64 as platform;

// Host (testes, ferramentas): sem instruções privilegiadas
#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub mod host;

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub use host as platform;

// Re-exports globais para o kernel usar
pub use platform::Cpu;
pub use traits::*;

// =============================================================================
// CAPACIDADES DO ALVO
// =============================================================================

/// Capacidades do alvo relevantes para o núcleo de objetos.
///
/// Consultadas uma vez na inicialização dos slab heaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCapabilities {
    /// O slab heap lock-free é seguro neste alvo.
    ///
    /// Falso quando o cache de instruções é direct-mapped: nesse caso os
    /// slab heaps caem para a variante protegida por spinlock.
    pub lock_free_slab: bool,
}

impl TargetCapabilities {
    /// Capacidades do alvo atual.
    pub const fn current() -> Self {
        Self {
            lock_free_slab: !platform::ICACHE_DIRECT_MAPPED,
        }
    }
}

/// Desabilita interrupções enquanto vivo e restaura o estado anterior no drop.
pub struct KScopedInterruptDisable {
    were_enabled: bool,
}

impl KScopedInterruptDisable {
    #[inline]
    pub fn new() -> Self {
        let were_enabled = Cpu::are_interrupts_enabled();
        // SAFETY: Desabilitar interrupções nunca viola invariantes de memória.
        unsafe { Cpu::disable_interrupts() };
        Self { were_enabled }
    }
}

impl Drop for KScopedInterruptDisable {
    #[inline]
    fn drop(&mut self) {
        if self.were_enabled {
            // SAFETY: Restauramos exatamente o estado observado em `new`.
            unsafe { Cpu::enable_interrupts() };
        }
    }
}
