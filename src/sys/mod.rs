//! System Definitions (ABI).
//!
//! Códigos de resultado que o núcleo devolve à camada de dispatch de SVCs.

pub mod error;

pub use error::{KResult, KernelError};
