//! Handle Table - Tabela de Handles por Processo
//!
//! Cada processo possui exatamente uma `KHandleTable`, que mapeia handles de
//! 32 bits para referências a objetos do kernel.
//!
//! # Modelo
//!
//! - Capacidade fixa na criação (teto [`MAX_HANDLE_TABLE_SIZE`])
//! - Slots livres formam uma lista encadeada **dentro** do próprio array:
//!   o campo `id` de um slot livre guarda `-(próximo + 1)` (0 = fim da lista)
//! - Slots ocupados recebem um id de geração `1..=0x7FFF` de um contador da
//!   tabela: um handle antigo nunca valida contra o ocupante seguinte
//! - Toda mutação acontece sob o spinlock da tabela; objetos removidos são
//!   fechados **depois** de soltar o lock
//!
//! # Pseudo-handles
//!
//! `CURRENT_THREAD` e `CURRENT_PROCESS` nunca ocupam slot. As consultas
//! `get_thread`/`get_process` os resolvem via [`CurrentContext`].

use crate::core::config::{MAX_HANDLE_TABLE_SIZE, MAX_LINEAR_ID, MIN_LINEAR_ID};
use crate::core::object::types::{KProcess, KThread};
use crate::core::object::{
    Handle, IntoAutoObject, KAutoObject, KObjectType, KScopedAutoObject, ObjectKind,
};
use crate::sched::CurrentContext;
use crate::sync::Spinlock;
use crate::sys::error::{KResult, KernelError};
use alloc::vec::Vec;

/// Entrada na tabela de handles.
struct HandleEntry {
    /// `> 0`: id de geração do ocupante. `<= 0`: slot livre (link codificado).
    id: i32,
    /// `None` em slots livres e em slots reservados ainda sem objeto.
    object: Option<KScopedAutoObject<dyn KAutoObject>>,
}

impl HandleEntry {
    #[inline]
    const fn free_link(next: Option<u16>) -> i32 {
        match next {
            Some(index) => -(index as i32 + 1),
            None => 0,
        }
    }

    #[inline]
    const fn decode_link(id: i32) -> Option<u16> {
        if id < 0 {
            Some((-id - 1) as u16)
        } else {
            None
        }
    }

    #[inline]
    const fn is_free(&self) -> bool {
        self.id <= 0
    }
}

struct TableState {
    entries: Vec<HandleEntry>,
    free_head: Option<u16>,
    table_size: u16,
    count: u16,
    max_count: u16,
    next_id: u16,
}

impl TableState {
    fn valid_index(&self, handle: Handle) -> Option<usize> {
        if handle.is_alias() || handle.id() == 0 {
            return None;
        }
        let index = handle.index();
        if index >= self.table_size {
            return None;
        }
        let entry = &self.entries[index as usize];
        if entry.is_free() || entry.id != handle.id() as i32 {
            return None;
        }
        Some(index as usize)
    }

    /// Próximo id de geração: 1..=0x7FFF e volta a 1, nunca 0.
    fn allocate_id(&mut self) -> u16 {
        let id = self.next_id;
        self.next_id = if id >= MAX_LINEAR_ID {
            MIN_LINEAR_ID
        } else {
            id + 1
        };
        id
    }

    /// Tira um slot da free list e carimba um id novo.
    fn allocate_entry(&mut self) -> KResult<Handle> {
        if self.count >= self.table_size {
            return Err(KernelError::OutOfHandles);
        }
        let index = match self.free_head {
            Some(index) => index,
            None => return Err(KernelError::OutOfHandles),
        };

        let id = self.allocate_id();
        let entry = &mut self.entries[index as usize];
        self.free_head = HandleEntry::decode_link(entry.id);
        entry.id = id as i32;

        self.count += 1;
        if self.count > self.max_count {
            self.max_count = self.count;
        }

        Ok(Handle::new(index, id))
    }

    /// Devolve o slot à free list. Retorna o objeto para ser fechado fora do lock.
    fn free_entry(&mut self, index: usize) -> Option<KScopedAutoObject<dyn KAutoObject>> {
        let link = HandleEntry::free_link(self.free_head);
        let entry = &mut self.entries[index];
        entry.id = link;
        let object = entry.object.take();
        self.free_head = Some(index as u16);
        self.count -= 1;
        object
    }

    fn lookup(&self, handle: Handle) -> Option<&KScopedAutoObject<dyn KAutoObject>> {
        let index = self.valid_index(handle)?;
        self.entries[index].object.as_ref()
    }

    fn lookup_kind(
        &self,
        handle: Handle,
        kind: ObjectKind,
    ) -> Option<&KScopedAutoObject<dyn KAutoObject>> {
        self.lookup(handle)
            .filter(|object| object.is_instance_of(kind))
    }
}

pub struct KHandleTable {
    state: Spinlock<TableState>,
}

impl KHandleTable {
    /// Cria a tabela com `capacity` slots.
    ///
    /// `0` significa "usar o teto". Pedidos acima de [`MAX_HANDLE_TABLE_SIZE`]
    /// são truncados para o teto.
    pub fn new(capacity: usize) -> Self {
        let size = if capacity == 0 {
            MAX_HANDLE_TABLE_SIZE
        } else if capacity > MAX_HANDLE_TABLE_SIZE {
            crate::kwarn!("(Handle) Capacidade truncada para o teto, pedido=", capacity);
            MAX_HANDLE_TABLE_SIZE
        } else {
            capacity
        };

        let mut entries = Vec::with_capacity(size);
        for index in 0..size {
            let next = if index + 1 < size {
                Some((index + 1) as u16)
            } else {
                None
            };
            entries.push(HandleEntry {
                id: HandleEntry::free_link(next),
                object: None,
            });
        }

        crate::kdebug!("(Handle) Tabela criada, slots=", size);

        Self {
            state: Spinlock::new(TableState {
                entries,
                free_head: Some(0),
                table_size: size as u16,
                count: 0,
                max_count: 0,
                next_id: MIN_LINEAR_ID,
            }),
        }
    }

    /// O handle aponta para um slot ocupado com o mesmo id?
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.state.lock().valid_index(handle).is_some()
    }

    /// Guarda `object` em um slot livre e devolve o handle.
    ///
    /// A tabela assume a referência recebida (sem `open` extra). Em caso de
    /// erro a tabela fica intacta e a referência é solta.
    pub fn generate<O: IntoAutoObject>(&self, object: O) -> KResult<Handle> {
        let object = object.into_auto_object();

        let mut state = self.state.lock();
        let handle = match state.allocate_entry() {
            Ok(handle) => handle,
            Err(err) => {
                drop(state);
                crate::kwarn!("(Handle) Tabela cheia, count=", self.count());
                return Err(err);
            }
        };
        state.entries[handle.index() as usize].object = Some(object);
        drop(state);

        crate::ktrace!("(Handle) Gerado handle=", handle.raw());
        Ok(handle)
    }

    /// Reserva um slot sem objeto (construção em duas fases).
    ///
    /// O slot conta como ocupado mas não resolve para nada até [`set`](Self::set).
    pub fn reserve(&self) -> KResult<Handle> {
        let handle = self.state.lock().allocate_entry()?;
        crate::ktrace!("(Handle) Reservado handle=", handle.raw());
        Ok(handle)
    }

    /// Desfaz uma reserva que nunca recebeu objeto.
    pub fn unreserve(&self, handle: Handle) -> bool {
        let mut state = self.state.lock();
        match state.valid_index(handle) {
            Some(index) if state.entries[index].object.is_none() => {
                let _ = state.free_entry(index);
                true
            }
            _ => false,
        }
    }

    /// Associa `object` a um slot já alocado.
    ///
    /// O objeto anterior do slot (se havia) é fechado fora do lock.
    pub fn set<O: IntoAutoObject>(&self, object: O, handle: Handle) -> KResult<()> {
        let object = object.into_auto_object();

        let mut state = self.state.lock();
        let index = state
            .valid_index(handle)
            .ok_or(KernelError::InvalidHandle)?;
        let previous = state.entries[index].object.replace(object);
        drop(state);

        drop(previous);
        Ok(())
    }

    /// Remove o handle. Retorna `false` para handles inválidos e pseudo-handles.
    pub fn close(&self, handle: Handle) -> bool {
        let object = {
            let mut state = self.state.lock();
            match state.valid_index(handle) {
                Some(index) => state.free_entry(index),
                None => return false,
            }
        };

        crate::ktrace!("(Handle) Fechado handle=", handle.raw());
        // A referência da tabela é solta aqui, fora do spinlock
        drop(object);
        true
    }

    /// Objeto do handle, com uma referência nova.
    pub fn get_auto_object(&self, handle: Handle) -> Option<KScopedAutoObject<dyn KAutoObject>> {
        self.state.lock().lookup(handle).cloned()
    }

    /// Objeto do handle se for do tipo `T`.
    pub fn get_object<T: KObjectType>(&self, handle: Handle) -> Option<KScopedAutoObject<T>> {
        let object = self.state.lock().lookup_kind(handle, T::KIND).cloned()?;
        object.downcast::<T>().ok()
    }

    /// Como [`get_object`](Self::get_object), mas resolve os pseudo-handles
    /// pela thread atual.
    pub fn get_object_with_alias<T: KObjectType, C: CurrentContext + ?Sized>(
        &self,
        handle: Handle,
        ctx: &C,
    ) -> Option<KScopedAutoObject<T>> {
        let alias = if handle == Handle::CURRENT_THREAD {
            ctx.current_thread()?.into_auto_object()
        } else if handle == Handle::CURRENT_PROCESS {
            ctx.current_process()?.into_auto_object()
        } else {
            return self.get_object::<T>(handle);
        };
        alias.downcast::<T>().ok()
    }

    pub fn get_thread<C: CurrentContext + ?Sized>(
        &self,
        handle: Handle,
        ctx: &C,
    ) -> Option<KScopedAutoObject<KThread>> {
        self.get_object_with_alias::<KThread, C>(handle, ctx)
    }

    pub fn get_process<C: CurrentContext + ?Sized>(
        &self,
        handle: Handle,
        ctx: &C,
    ) -> Option<KScopedAutoObject<KProcess>> {
        self.get_object_with_alias::<KProcess, C>(handle, ctx)
    }

    /// Resolve vários handles de uma vez: ou todos, ou nenhum.
    pub fn get_multiple_objects<T: KObjectType>(
        &self,
        handles: &[Handle],
    ) -> KResult<Vec<KScopedAutoObject<T>>> {
        let mut objects = Vec::with_capacity(handles.len());
        {
            let state = self.state.lock();
            for &handle in handles {
                match state.lookup_kind(handle, T::KIND) {
                    Some(object) => objects.push(object.clone()),
                    None => {
                        drop(state);
                        // `objects` fecha as referências já abertas fora do lock
                        return Err(KernelError::InvalidHandle);
                    }
                }
            }
        }

        Ok(objects
            .into_iter()
            .filter_map(|object| object.downcast::<T>().ok())
            .collect())
    }

    /// Fecha todos os handles e zera a capacidade.
    ///
    /// Usado na destruição do processo dono.
    pub fn destroy(&self) {
        let objects: Vec<_> = {
            let mut state = self.state.lock();
            state.table_size = 0;
            state.count = 0;
            state.free_head = None;
            state
                .entries
                .drain(..)
                .filter_map(|entry| entry.object)
                .collect()
        };

        crate::kdebug!("(Handle) Tabela destruida, objetos=", objects.len());
        drop(objects);
    }

    /// Handles em uso agora.
    pub fn count(&self) -> usize {
        self.state.lock().count as usize
    }

    /// Maior `count()` já observado.
    pub fn max_count(&self) -> usize {
        self.state.lock().max_count as usize
    }

    /// Capacidade da tabela.
    pub fn table_size(&self) -> usize {
        self.state.lock().table_size as usize
    }
}

impl Drop for KHandleTable {
    fn drop(&mut self) {
        self.destroy();
    }
}
