//! Traits de abstração de hardware.

pub mod cpu;

pub use cpu::{CoreId, CpuOps};
