// Arquivo: core/object/handle.rs
//
// Propósito: Valor de 32 bits que o userspace usa para nomear objetos.
//
// Layout (ABI):
//
//   bit 31      alias (só os pseudo-handles)
//   bits 16..30 id de geração (0 = slot livre)
//   bits 0..15  índice na tabela
//
// Handles são opacos para o userspace e locais ao processo.

//! Kernel Handles

use core::fmt;

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

const INDEX_MASK: u32 = 0xFFFF;
const ID_SHIFT: u32 = 16;
const ID_MASK: u32 = 0x7FFF;
const ALIAS_BIT: u32 = 1 << 31;

impl Handle {
    /// Nunca referencia nada (id 0).
    pub const INVALID: Handle = Handle(0);

    /// Pseudo-handle da thread atual.
    pub const CURRENT_THREAD: Handle = Handle(0xFFFF_8000);

    /// Pseudo-handle do processo atual.
    pub const CURRENT_PROCESS: Handle = Handle(0xFFFF_8001);

    /// Monta um handle real a partir de índice e id de geração.
    #[inline]
    pub const fn new(index: u16, id: u16) -> Self {
        Self(((id as u32 & ID_MASK) << ID_SHIFT) | index as u32)
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> u16 {
        (self.0 & INDEX_MASK) as u16
    }

    #[inline]
    pub const fn id(self) -> u16 {
        ((self.0 >> ID_SHIFT) & ID_MASK) as u16
    }

    #[inline]
    pub const fn is_alias(self) -> bool {
        self.0 & ALIAS_BIT != 0
    }

    /// Um dos dois pseudo-handles.
    #[inline]
    pub const fn is_pseudo(self) -> bool {
        self.0 == Self::CURRENT_THREAD.0 || self.0 == Self::CURRENT_PROCESS.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::CURRENT_THREAD => f.write_str("Handle(CURRENT_THREAD)"),
            Self::CURRENT_PROCESS => f.write_str("Handle(CURRENT_PROCESS)"),
            _ => write!(f, "Handle(index={}, id={:#x})", self.index(), self.id()),
        }
    }
}

impl From<Handle> for u32 {
    fn from(handle: Handle) -> u32 {
        handle.0
    }
}
