//! # Kernel Result Codes
//!
//! Define os códigos de erro retornados pelo núcleo de objetos.
//!
//! Os valores seguem o layout de resultado do Horizon: módulo do kernel (1)
//! nos bits 0..9 e a descrição nos bits 9..22. A camada de dispatch de SVCs
//! traduz `KernelError` para o registrador de retorno via [`KernelError::raw`].
//!
//! Erros aqui são **recuperáveis**. Defeitos internos (underflow de refcount,
//! double free em slab, colisão de class tokens) não viram `KernelError`:
//! eles derrubam o kernel via [`crate::core::panic::fatal`].

use core::fmt;

/// Módulo do kernel no layout de resultado.
pub const KERNEL_MODULE: u32 = 1;

/// Resultado padrão das operações do núcleo.
pub type KResult<T> = Result<T, KernelError>;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "erros do kernel devem ser tratados"]
pub enum KernelError {
    /// Slab heap ou limite de recurso esgotado.
    OutOfResource = 103,
    /// Arena de páginas sem espaço para commit.
    OutOfMemory = 104,
    /// Tabela de handles cheia.
    OutOfHandles = 105,
    /// Handle inválido, livre, obsoleto ou de tipo errado.
    InvalidHandle = 114,
    /// Ponteiro/nome inválido vindo do chamador.
    InvalidPointer = 115,
    /// Valor fora do intervalo aceito (ex: nome longo demais).
    OutOfRange = 119,
    /// Entrada procurada não existe.
    NotFound = 121,
    /// Estado incompatível com a operação (ex: nome já registrado).
    InvalidState = 125,
}

impl KernelError {
    /// Descrição (bits 9..22 do resultado).
    #[inline]
    pub const fn description(self) -> u32 {
        self as u32
    }

    /// Valor bruto do resultado (módulo | descrição << 9).
    #[inline]
    pub const fn raw(self) -> u32 {
        KERNEL_MODULE | (self.description() << 9)
    }

    /// Reconstrói a partir do valor bruto. `None` para módulos/descrições desconhecidos.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw & 0x1FF != KERNEL_MODULE {
            return None;
        }
        match (raw >> 9) & 0x1FFF {
            103 => Some(Self::OutOfResource),
            104 => Some(Self::OutOfMemory),
            105 => Some(Self::OutOfHandles),
            114 => Some(Self::InvalidHandle),
            115 => Some(Self::InvalidPointer),
            119 => Some(Self::OutOfRange),
            121 => Some(Self::NotFound),
            125 => Some(Self::InvalidState),
            _ => None,
        }
    }

    /// Nome curto para logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutOfResource => "OutOfResource",
            Self::OutOfMemory => "OutOfMemory",
            Self::OutOfHandles => "OutOfHandles",
            Self::InvalidHandle => "InvalidHandle",
            Self::InvalidPointer => "InvalidPointer",
            Self::OutOfRange => "OutOfRange",
            Self::NotFound => "NotFound",
            Self::InvalidState => "InvalidState",
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (2{:03}-{:04})",
            self.as_str(),
            KERNEL_MODULE,
            self.description()
        )
    }
}
