//! Emulação de CPU para alvos hospedados (testes no host).
//!
//! Não há interrupções reais: o estado de "interrupções habilitadas" é
//! sempre falso, então `KScopedInterruptDisable` não faz nada.

use crate::arch::traits::cpu::CpuOps;

/// Assumimos cache associativo no host.
pub const ICACHE_DIRECT_MAPPED: bool = false;

pub struct HostCpu;

pub type Cpu = HostCpu;

impl CpuOps for HostCpu {
    #[inline]
    fn relax() {
        // Nos testes um spinner pode dividir o mesmo CPU com o dono do lock
        #[cfg(test)]
        std::thread::yield_now();
        #[cfg(not(test))]
        core::hint::spin_loop();
    }

    #[inline]
    unsafe fn disable_interrupts() {}

    #[inline]
    unsafe fn enable_interrupts() {}

    #[inline]
    fn are_interrupts_enabled() -> bool {
        false
    }
}
