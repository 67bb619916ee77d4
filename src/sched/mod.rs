//! # Contrato com o Scheduler
//!
//! O núcleo de objetos não contém um scheduler: ele consome um. Este módulo
//! define o que o núcleo precisa do scheduler (desabilitar/reabilitar o
//! escalonamento, recalcular quais núcleos precisam reescalonar, suspender e
//! acordar threads, identificar a thread/processo atual).
//!
//! O contexto é sempre passado **por referência** para quem precisa dele
//! (scheduler lock, light lock, tabela de handles). Não existe instância
//! global implícita.

pub mod context;

pub use context::{
    CoreMask, CurrentContext, EarlyBootContext, SchedulerContext, ThreadId, ThreadScheduler,
};

#[cfg(test)]
pub mod host;
