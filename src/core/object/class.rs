//! # Class Tokens
//!
//! Cada tipo de objeto do kernel tem um *class token* de 32 bits. O teste de
//! herança é um único AND:
//!
//! ```text
//! obj.is_instance_of(T)  ⟺  (token(obj) & token(T)) == token(T)
//! ```
//!
//! ## Layout
//!
//! ```text
//! bit 16      FINAL (tipo concreto, sem filhos)
//! bits 8..15  padrão do tipo final (8 bits com exatamente 3 ligados)
//! bits 0..7   um bit por tipo intermediário
//! ```
//!
//! O token de um tipo é o token do pai OR os bits próprios. Dois tipos finais
//! distintos têm padrões distintos com o mesmo número de bits, então nunca um
//! é subconjunto do outro: irmãos não se confundem.
//!
//! A tabela é calculada uma única vez (primeiro uso ou `core::init`) e fica
//! em um `spin::Once`. Qualquer colisão derruba o kernel na construção.

use crate::core::panic::fatal;
use spin::Once;

/// Marcador de tipo final.
pub const FINAL_BIT: u32 = 1 << 16;

/// Bits disponíveis para tipos intermediários.
pub const INTERMEDIATE_BITS: u32 = 8;

/// Deslocamento do padrão dos tipos finais.
pub const FINAL_PATTERN_SHIFT: u32 = 8;

/// Quantidade de padrões de 8 bits com 3 bits ligados: C(8,3).
pub const FINAL_PATTERN_COUNT: usize = 56;

/// Tipos de objeto conhecidos pelo kernel.
///
/// A ordem de declaração é a ordem de atribuição dos tokens: um tipo sempre
/// aparece depois do seu pai.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    AutoObject,
    SynchronizationObject,
    ReadableEvent,
    Thread,
    Process,
    ServerPort,
    ServerSession,
    ClientPort,
    Debug,
    InterruptEvent,
    Event,
    ClientSession,
    Session,
    Port,
    SharedMemory,
    TransferMemory,
    CodeMemory,
    DeviceAddressSpace,
    ResourceLimit,
    LightSession,
    LightClientSession,
    LightServerSession,
    SessionRequest,
    IoPool,
    IoRegion,
}

impl ObjectKind {
    pub const COUNT: usize = 25;

    /// Todos os tipos, em ordem de declaração.
    pub const ALL: [ObjectKind; Self::COUNT] = [
        Self::AutoObject,
        Self::SynchronizationObject,
        Self::ReadableEvent,
        Self::Thread,
        Self::Process,
        Self::ServerPort,
        Self::ServerSession,
        Self::ClientPort,
        Self::Debug,
        Self::InterruptEvent,
        Self::Event,
        Self::ClientSession,
        Self::Session,
        Self::Port,
        Self::SharedMemory,
        Self::TransferMemory,
        Self::CodeMemory,
        Self::DeviceAddressSpace,
        Self::ResourceLimit,
        Self::LightSession,
        Self::LightClientSession,
        Self::LightServerSession,
        Self::SessionRequest,
        Self::IoPool,
        Self::IoRegion,
    ];

    /// Tipo pai (`None` só para a raiz).
    pub const fn parent(self) -> Option<ObjectKind> {
        match self {
            Self::AutoObject => None,
            Self::SynchronizationObject => Some(Self::AutoObject),
            Self::ReadableEvent => Some(Self::SynchronizationObject),
            Self::Thread
            | Self::Process
            | Self::ServerPort
            | Self::ServerSession
            | Self::ClientPort
            | Self::Debug => Some(Self::SynchronizationObject),
            Self::InterruptEvent => Some(Self::ReadableEvent),
            Self::Event
            | Self::ClientSession
            | Self::Session
            | Self::Port
            | Self::SharedMemory
            | Self::TransferMemory
            | Self::CodeMemory
            | Self::DeviceAddressSpace
            | Self::ResourceLimit
            | Self::LightSession
            | Self::LightClientSession
            | Self::LightServerSession
            | Self::SessionRequest
            | Self::IoPool
            | Self::IoRegion => Some(Self::AutoObject),
        }
    }

    /// Tipos finais podem ter instâncias; os demais só existem como pais.
    pub const fn is_final(self) -> bool {
        !matches!(
            self,
            Self::AutoObject | Self::SynchronizationObject | Self::ReadableEvent
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::AutoObject => "KAutoObject",
            Self::SynchronizationObject => "KSynchronizationObject",
            Self::ReadableEvent => "KReadableEvent",
            Self::Thread => "KThread",
            Self::Process => "KProcess",
            Self::ServerPort => "KServerPort",
            Self::ServerSession => "KServerSession",
            Self::ClientPort => "KClientPort",
            Self::Debug => "KDebug",
            Self::InterruptEvent => "KInterruptEvent",
            Self::Event => "KEvent",
            Self::ClientSession => "KClientSession",
            Self::Session => "KSession",
            Self::Port => "KPort",
            Self::SharedMemory => "KSharedMemory",
            Self::TransferMemory => "KTransferMemory",
            Self::CodeMemory => "KCodeMemory",
            Self::DeviceAddressSpace => "KDeviceAddressSpace",
            Self::ResourceLimit => "KResourceLimit",
            Self::LightSession => "KLightSession",
            Self::LightClientSession => "KLightClientSession",
            Self::LightServerSession => "KLightServerSession",
            Self::SessionRequest => "KSessionRequest",
            Self::IoPool => "KIoPool",
            Self::IoRegion => "KIoRegion",
        }
    }

    /// Token deste tipo (constrói a tabela no primeiro uso).
    #[inline]
    pub fn class_token(self) -> ClassToken {
        class_table().token(self)
    }

    /// `self` é `ancestor` ou descende dele?
    #[inline]
    pub fn is_derived_from(self, ancestor: ObjectKind) -> bool {
        self.class_token().contains(ancestor.class_token())
    }
}

/// Máscara de bits que identifica um tipo e todos os seus ancestrais.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassToken(u32);

impl ClassToken {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Teste de herança: `(self & other) == other`.
    #[inline]
    pub const fn contains(self, other: ClassToken) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_final(self) -> bool {
        self.0 & FINAL_BIT != 0
    }
}

// =============================================================================
// TABELA DE TOKENS
// =============================================================================

pub struct ClassTable {
    tokens: [u32; ObjectKind::COUNT],
}

impl ClassTable {
    #[inline]
    pub fn token(&self, kind: ObjectKind) -> ClassToken {
        ClassToken(self.tokens[kind as usize])
    }
}

static CLASS_TABLE: Once<ClassTable> = Once::new();

/// Tabela de tokens, construída uma única vez.
pub fn class_table() -> &'static ClassTable {
    CLASS_TABLE.call_once(build_class_table)
}

/// Padrões de 8 bits com exatamente 3 bits ligados, em ordem crescente.
pub const fn final_patterns() -> [u8; FINAL_PATTERN_COUNT] {
    let mut patterns = [0u8; FINAL_PATTERN_COUNT];
    let mut count = 0;
    let mut value: u32 = 0;
    while value < 256 {
        if value.count_ones() == 3 {
            patterns[count] = value as u8;
            count += 1;
        }
        value += 1;
    }
    patterns
}

fn build_class_table() -> ClassTable {
    let patterns = final_patterns();
    let mut tokens = [0u32; ObjectKind::COUNT];
    let mut assigned = [false; ObjectKind::COUNT];
    let mut next_bit = 0u32;
    let mut next_pattern = 0usize;

    for kind in ObjectKind::ALL {
        let token = match kind.parent() {
            None => 0,
            Some(parent) => {
                if !assigned[parent as usize] {
                    fatal("(Obj) Classe declarada antes do pai", kind as u64);
                }
                let parent_token = tokens[parent as usize];

                if kind.is_final() {
                    if next_pattern >= FINAL_PATTERN_COUNT {
                        fatal("(Obj) Padroes de classe final esgotados", kind as u64);
                    }
                    let pattern = patterns[next_pattern] as u32;
                    next_pattern += 1;
                    parent_token | (pattern << FINAL_PATTERN_SHIFT) | FINAL_BIT
                } else {
                    if next_bit >= INTERMEDIATE_BITS {
                        fatal("(Obj) Bits de classe intermediaria esgotados", kind as u64);
                    }
                    let bit = 1u32 << next_bit;
                    next_bit += 1;
                    parent_token | bit
                }
            }
        };

        for other in ObjectKind::ALL {
            if assigned[other as usize] && tokens[other as usize] == token {
                fatal("(Obj) Colisao de class token", token as u64);
            }
        }

        tokens[kind as usize] = token;
        assigned[kind as usize] = true;
    }

    // Finais distintos nunca podem satisfazer o teste um do outro
    for a in ObjectKind::ALL {
        for b in ObjectKind::ALL {
            if a != b && a.is_final() && b.is_final() {
                let (ta, tb) = (tokens[a as usize], tokens[b as usize]);
                if ta & tb == tb {
                    fatal("(Obj) Class token final contido em outro", ta as u64);
                }
            }
        }
    }

    crate::kdebug!("(Obj) Tabela de class tokens pronta, tipos=", ObjectKind::COUNT);
    ClassTable { tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_pattern_enumeration() {
        let patterns = final_patterns();
        assert_eq!(patterns[0], 0b0000_0111);
        assert_eq!(patterns[1], 0b0000_1011);
        assert_eq!(patterns[FINAL_PATTERN_COUNT - 1], 0b1110_0000);
        assert!(patterns.iter().all(|p| p.count_ones() == 3));
        assert!(patterns.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn tokens_follow_layout() {
        assert_eq!(ObjectKind::AutoObject.class_token().raw(), 0);
        assert_eq!(ObjectKind::SynchronizationObject.class_token().raw(), 0b01);
        assert_eq!(ObjectKind::ReadableEvent.class_token().raw(), 0b11);

        let thread = ObjectKind::Thread.class_token();
        assert!(thread.is_final());
        assert_eq!(thread.raw(), FINAL_BIT | (0b0000_0111 << 8) | 0b01);
    }

    #[test]
    fn inheritance_matches_lattice() {
        for kind in ObjectKind::ALL {
            assert!(kind.is_derived_from(ObjectKind::AutoObject));
            assert!(kind.is_derived_from(kind));
            if let Some(parent) = kind.parent() {
                assert!(kind.is_derived_from(parent));
                assert!(!parent.is_derived_from(kind));
            }
        }

        assert!(ObjectKind::InterruptEvent.is_derived_from(ObjectKind::ReadableEvent));
        assert!(ObjectKind::InterruptEvent.is_derived_from(ObjectKind::SynchronizationObject));
        assert!(ObjectKind::Thread.is_derived_from(ObjectKind::SynchronizationObject));
        assert!(!ObjectKind::Thread.is_derived_from(ObjectKind::ReadableEvent));
        assert!(!ObjectKind::Event.is_derived_from(ObjectKind::SynchronizationObject));
    }

    #[test]
    fn final_siblings_are_unrelated() {
        for a in ObjectKind::ALL.iter().copied().filter(|k| k.is_final()) {
            for b in ObjectKind::ALL.iter().copied().filter(|k| k.is_final()) {
                assert_eq!(a.is_derived_from(b), a == b);
            }
        }
    }
}
