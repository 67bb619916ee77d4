//! Interface Abstrata de CPU (HAL).
//! Define as operações que qualquer arquitetura deve implementar para o núcleo.

/// Identificador lógico de um núcleo.
pub type CoreId = u32;

pub trait CpuOps {
    /// Dica para a CPU que estamos em um spinloop (PAUSE/YIELD).
    fn relax();

    /// Desabilita interrupções globalmente.
    ///
    /// # Safety
    /// Requer privilégio de kernel no hardware real.
    unsafe fn disable_interrupts();

    /// Habilita interrupções globalmente.
    ///
    /// # Safety
    /// Pode causar preempção imediata.
    unsafe fn enable_interrupts();

    /// Verifica se as interrupções estão habilitadas.
    fn are_interrupts_enabled() -> bool;
}
