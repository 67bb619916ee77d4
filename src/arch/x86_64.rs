//! Implementação x86_64 (bare-metal) das operações de CPU.
//!
//! Usa Assembly inline para controle de interrupções. Assume Ring 0.

use crate::arch::traits::cpu::CpuOps;
use core::arch::asm;

/// Caches x86_64 nunca são direct-mapped.
pub const ICACHE_DIRECT_MAPPED: bool = false;

pub struct X64Cpu;

pub type Cpu = X64Cpu;

impl CpuOps for X64Cpu {
    #[inline]
    fn relax() {
        unsafe {
            asm!("pause", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    unsafe fn disable_interrupts() {
        asm!("cli", options(nomem, nostack, preserves_flags));
    }

    #[inline]
    unsafe fn enable_interrupts() {
        asm!("sti", options(nomem, nostack, preserves_flags));
    }

    /// Verifica se as interrupções estão habilitadas (RFLAGS.IF).
    #[inline]
    fn are_interrupts_enabled() -> bool {
        let rflags: u64;
        unsafe {
            asm!("pushfq; pop {}", out(reg) rflags, options(nomem, preserves_flags));
        }
        // Bit 9 é IF (Interrupt Flag)
        (rflags & (1 << 9)) != 0
    }
}
