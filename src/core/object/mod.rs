//! # Object - Sistema de Objetos do Kernel
//!
//! Todo recurso endereçável por handle é um `KAutoObject`: refcount atômico
//! explícito + class token para testes de tipo sem RTTI.
//!
//! ```text
//! class     → tokens e hierarquia de tipos (ObjectKind)
//! refcount  → contador atômico (underflow é fatal)
//! kobject   → trait KAutoObject, KScopedAutoObject, storages
//! handle    → valor Handle (layout ABI)
//! name      → registro global de objetos nomeados
//! types     → KThread, KProcess, KEvent, KInterruptEvent, KSharedMemory
//! ```

pub mod class;
pub mod handle;
pub mod kobject;
pub mod name;
pub mod refcount;
pub mod types;

#[cfg(any(test, feature = "self_test"))]
pub mod test;

pub use class::{ClassToken, ObjectKind};
pub use handle::Handle;
pub use kobject::{
    AsAutoObject, HeapStorage, IntoAutoObject, KAutoObject, KAutoObjectBase, KObjectType,
    KScopedAutoObject, ObjectStorage,
};
pub use name::{KObjectNameRegistry, ObjectName, OBJECT_NAMES};
pub use refcount::RefCount;
