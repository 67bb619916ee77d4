// Arquivo: core/object/name.rs
//
// Propósito: Registro global de objetos nomeados (ex: portas de serviço
// registradas pelo kernel e encontradas pelo userspace por nome).
//
// Detalhes de Implementação:
// - Nomes de até 12 bytes, comparados byte a byte.
// - No máximo OBJECT_NAME_COUNT_MAX nomes simultâneos.
// - O registro guarda uma referência ao objeto: ele vive pelo menos até o
//   nome ser removido.
// - Protegido por KLightMutex (as operações podem suspender a thread).

//! Object Names

use super::{KAutoObject, KObjectType, KScopedAutoObject};
use crate::core::config::{OBJECT_NAME_COUNT_MAX, OBJECT_NAME_LENGTH_MAX};
use crate::sched::ThreadScheduler;
use crate::sync::KLightMutex;
use crate::sys::error::{KResult, KernelError};
use alloc::vec::Vec;

/// Nome de objeto validado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectName {
    bytes: [u8; OBJECT_NAME_LENGTH_MAX],
    len: u8,
}

impl ObjectName {
    /// Valida um nome: 1..=12 bytes, sem NUL.
    pub fn new(name: &str) -> KResult<Self> {
        let raw = name.as_bytes();
        if raw.is_empty() || raw.contains(&0) {
            return Err(KernelError::InvalidPointer);
        }
        if raw.len() > OBJECT_NAME_LENGTH_MAX {
            return Err(KernelError::OutOfRange);
        }
        let mut bytes = [0u8; OBJECT_NAME_LENGTH_MAX];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

struct KObjectName {
    name: ObjectName,
    object: KScopedAutoObject<dyn KAutoObject>,
}

pub struct KObjectNameRegistry {
    names: KLightMutex<Vec<KObjectName>>,
}

impl KObjectNameRegistry {
    pub const fn new() -> Self {
        Self {
            names: KLightMutex::new(Vec::new()),
        }
    }

    /// Registra `object` sob `name`.
    ///
    /// `InvalidState` se o nome já existe, `OutOfResource` se o registro
    /// está cheio.
    pub fn register<S: ThreadScheduler + ?Sized>(
        &self,
        sched: &S,
        object: &KScopedAutoObject<dyn KAutoObject>,
        name: &str,
    ) -> KResult<()> {
        let name = ObjectName::new(name)?;

        let mut names = self.names.lock(sched);
        if names.iter().any(|entry| entry.name == name) {
            return Err(KernelError::InvalidState);
        }
        if names.len() >= OBJECT_NAME_COUNT_MAX {
            crate::kwarn!("(Obj) Registro de nomes cheio, count=", names.len());
            return Err(KernelError::OutOfResource);
        }
        names.push(KObjectName {
            name,
            object: object.clone(),
        });

        crate::ktrace!("(Obj) Nome registrado, total=", names.len());
        Ok(())
    }

    /// Procura o objeto registrado sob `name` (com uma referência nova).
    pub fn find<S: ThreadScheduler + ?Sized>(
        &self,
        sched: &S,
        name: &str,
    ) -> KResult<KScopedAutoObject<dyn KAutoObject>> {
        let name = ObjectName::new(name)?;
        let names = self.names.lock(sched);
        names
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.object.clone())
            .ok_or(KernelError::NotFound)
    }

    /// Como [`find`](Self::find), exigindo o tipo `T`.
    pub fn find_object<T: KObjectType, S: ThreadScheduler + ?Sized>(
        &self,
        sched: &S,
        name: &str,
    ) -> KResult<KScopedAutoObject<T>> {
        self.find(sched, name)?
            .downcast::<T>()
            .map_err(|_| KernelError::NotFound)
    }

    /// Remove o nome se ele aponta para `object`.
    pub fn unregister<S: ThreadScheduler + ?Sized>(
        &self,
        sched: &S,
        object: &KScopedAutoObject<dyn KAutoObject>,
        name: &str,
    ) -> KResult<()> {
        let name = ObjectName::new(name)?;

        let removed = {
            let mut names = self.names.lock(sched);
            let position = names.iter().position(|entry| {
                entry.name == name && KScopedAutoObject::ptr_eq(&entry.object, object)
            });
            match position {
                Some(position) => names.swap_remove(position),
                None => return Err(KernelError::NotFound),
            }
        };

        // A referência do registro é solta fora do lock
        drop(removed);
        Ok(())
    }

    pub fn count<S: ThreadScheduler + ?Sized>(&self, sched: &S) -> usize {
        self.names.lock(sched).len()
    }
}

impl Default for KObjectNameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registro global do kernel.
pub static OBJECT_NAMES: KObjectNameRegistry = KObjectNameRegistry::new();
