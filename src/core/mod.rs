//! Core Module
//!
//! Contém a lógica central do núcleo de objetos, independente de arquitetura:
//! objetos, tabela de handles, logging, defeitos fatais e inicialização.

pub mod config;
pub mod handle;
pub mod init;
pub mod logging;
pub mod object;
pub mod panic;
