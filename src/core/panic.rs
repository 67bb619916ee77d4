//! Defeitos Fatais do Kernel.
//!
//! O "Airbag" do núcleo de objetos. Underflow de refcount, double free em
//! slab e colisão de class tokens indicam que um invariante interno já foi
//! quebrado: continuar executando é inseguro, então não devolvemos
//! `KernelError`, derrubamos o kernel.
//!
//! # Comportamento
//! 1. Loga o defeito via `kerror!` (serial é o mais confiável aqui).
//! 2. Entra no `panic!` (o binário do kernel define o `#[panic_handler]`).

/// Aborta o kernel por um defeito interno.
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(reason: &'static str, value: u64) -> ! {
    crate::kerror!("================ KERNEL DEFECT ================");
    crate::kerror!(reason, value);
    crate::kerror!("===============================================");
    panic!("{} ({:#x})", reason, value);
}
