// Arquivo: core/object/kobject.rs
//
// Propósito: Base polimórfica dos objetos do kernel (KAutoObject).
// Todo recurso endereçável por handle (Thread, Process, Event, ...) implementa
// o trait `KAutoObject` e embute um `KAutoObjectBase`.
//
// Detalhes de Implementação:
// - Refcount explícito: nasce em 1, `open` incrementa, `close` decrementa.
// - Destruição exatamente na transição 1 → 0: `finalize` e depois a memória
//   volta para o storage de origem (slab do tipo ou heap).
// - `KScopedAutoObject<T>` é o dono de UMA referência (clone = open,
//   drop = close). É a única forma de carregar objetos entre subsistemas.

//! Kernel Object Base

use super::class::{ClassToken, ObjectKind};
use super::refcount::RefCount;
use crate::core::panic::fatal;
use alloc::boxed::Box;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;
use spin::Once;

// =============================================================================
// STORAGE
// =============================================================================

/// De onde veio a memória de um objeto.
pub trait ObjectStorage: Sync {
    /// Destrói o objeto e devolve sua memória.
    ///
    /// # Safety
    /// `object` veio deste storage, o refcount chegou a zero e não existe
    /// mais nenhuma referência ao objeto.
    unsafe fn release(&self, object: NonNull<dyn KAutoObject>);
}

/// Objetos alocados com `Box` (sem slab dedicado).
pub struct HeapStorage;

impl ObjectStorage for HeapStorage {
    unsafe fn release(&self, object: NonNull<dyn KAutoObject>) {
        drop(Box::from_raw(object.as_ptr()));
    }
}

static HEAP_STORAGE: HeapStorage = HeapStorage;

// =============================================================================
// BASE
// =============================================================================

/// Estado comum embutido em todo objeto do kernel.
pub struct KAutoObjectBase {
    ref_count: RefCount,
    storage: Once<&'static dyn ObjectStorage>,
}

impl KAutoObjectBase {
    /// Refcount inicial 1: a referência do criador.
    pub const fn new() -> Self {
        Self {
            ref_count: RefCount::new(1),
            storage: Once::new(),
        }
    }

    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.ref_count.get()
    }

    /// Associa o objeto ao storage que o criou. Só pode acontecer uma vez.
    pub(crate) fn bind_storage(&self, storage: &'static dyn ObjectStorage) {
        let mut bound = false;
        self.storage.call_once(|| {
            bound = true;
            storage
        });
        if !bound {
            fatal("(Obj) Storage associado duas vezes", 0);
        }
    }
}

impl Default for KAutoObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Trait base que todos os objetos do kernel implementam.
pub trait KAutoObject: Send + Sync + 'static {
    fn base(&self) -> &KAutoObjectBase;

    /// Tipo dinâmico do objeto.
    fn kind(&self) -> ObjectKind;

    /// Chamado uma única vez quando a última referência é solta, antes da
    /// memória voltar ao storage.
    fn finalize(&self) {}
}

impl dyn KAutoObject {
    #[inline]
    pub fn class_token(&self) -> ClassToken {
        self.kind().class_token()
    }

    /// `(token(self) & token(kind)) == token(kind)`
    #[inline]
    pub fn is_instance_of(&self, kind: ObjectKind) -> bool {
        self.class_token().contains(kind.class_token())
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Adquire uma referência extra.
    #[inline]
    pub fn open(&self) {
        self.base().ref_count.open();
    }

    /// Solta uma referência; destrói o objeto se era a última.
    ///
    /// # Safety
    /// O chamador possui uma referência aberta e não a usa mais depois.
    #[inline]
    pub unsafe fn close(&self) {
        if self.base().ref_count.close() {
            destroy(NonNull::from(self));
        }
    }

    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.base().reference_count()
    }
}

#[cold]
unsafe fn destroy(object: NonNull<dyn KAutoObject>) {
    let storage = {
        let obj = object.as_ref();
        crate::ktrace!("(Obj) Destruindo objeto, tipo=", obj.kind() as u8);
        obj.finalize();
        match obj.base().storage.get() {
            Some(storage) => *storage,
            None => fatal("(Obj) Objeto sem storage", obj.kind() as u64),
        }
    };
    storage.release(object);
}

/// Tipo concreto de objeto com um tipo final fixo.
///
/// # Safety
/// `KIND` é final e nenhum outro tipo Rust usa o mesmo `KIND`: o downcast
/// confia nisso para reinterpretar o ponteiro.
pub unsafe trait KObjectType: KAutoObject + Sized {
    const KIND: ObjectKind;
}

/// Implementa `KAutoObject` + `KObjectType` para uma struct com campo `base`.
///
/// ```ignore
/// impl_auto_object!(KEvent => Event);
/// impl_auto_object!(KProcess => Process, finalize); // chama Self::on_finalize
/// ```
macro_rules! impl_auto_object {
    ($ty:ty => $kind:ident) => {
        $crate::core::object::kobject::impl_auto_object!(@impl $ty, $kind, {});
    };
    ($ty:ty => $kind:ident, finalize) => {
        $crate::core::object::kobject::impl_auto_object!(@impl $ty, $kind, {
            fn finalize(&self) {
                <$ty>::on_finalize(self)
            }
        });
    };
    (@impl $ty:ty, $kind:ident, { $($extra:tt)* }) => {
        const _: () = assert!($crate::core::object::ObjectKind::$kind.is_final());

        impl $crate::core::object::KAutoObject for $ty {
            #[inline]
            fn base(&self) -> &$crate::core::object::KAutoObjectBase {
                &self.base
            }

            #[inline]
            fn kind(&self) -> $crate::core::object::ObjectKind {
                $crate::core::object::ObjectKind::$kind
            }

            $($extra)*
        }

        unsafe impl $crate::core::object::KObjectType for $ty {
            const KIND: $crate::core::object::ObjectKind = $crate::core::object::ObjectKind::$kind;
        }
    };
}

pub(crate) use impl_auto_object;

// =============================================================================
// APAGAMENTO DE TIPO
// =============================================================================

/// Visão `dyn KAutoObject` de qualquer objeto (concreto ou já apagado).
pub trait AsAutoObject: KAutoObject {
    fn as_auto_object(&self) -> &dyn KAutoObject;
}

impl<T: KAutoObject> AsAutoObject for T {
    #[inline]
    fn as_auto_object(&self) -> &dyn KAutoObject {
        self
    }
}

impl AsAutoObject for dyn KAutoObject {
    #[inline]
    fn as_auto_object(&self) -> &dyn KAutoObject {
        self
    }
}

// =============================================================================
// REFERÊNCIA COM ESCOPO
// =============================================================================

/// Dono de uma referência aberta a um objeto do kernel.
///
/// - `clone()` abre uma nova referência
/// - `drop()` fecha a referência (e destrói o objeto se era a última)
pub struct KScopedAutoObject<T: ?Sized + AsAutoObject> {
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
}

// SAFETY: KAutoObject exige Send + Sync e o refcount é atômico
unsafe impl<T: ?Sized + AsAutoObject> Send for KScopedAutoObject<T> {}
unsafe impl<T: ?Sized + AsAutoObject> Sync for KScopedAutoObject<T> {}

impl<T: KObjectType> KScopedAutoObject<T> {
    /// Cria o objeto no heap do kernel (tipos sem slab dedicado).
    pub fn new(value: T) -> Self {
        let ptr = NonNull::from(Box::leak(Box::new(value)));
        // SAFETY: Acabamos de criar o objeto, refcount = 1
        let object = unsafe { ptr.as_ref() };
        object.base().bind_storage(&HEAP_STORAGE);
        Self {
            ptr,
            _owns: PhantomData,
        }
    }
}

impl<T: ?Sized + AsAutoObject> KScopedAutoObject<T> {
    /// Adota uma referência já aberta.
    ///
    /// # Safety
    /// `ptr` aponta para um objeto vivo e o chamador transfere uma referência
    /// aberta para o novo `KScopedAutoObject`.
    #[inline]
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    /// Entrega a referência sem fechá-la.
    #[inline]
    pub fn into_raw(this: Self) -> NonNull<T> {
        let ptr = this.ptr;
        core::mem::forget(this);
        ptr
    }

    #[inline]
    pub fn as_ptr(this: &Self) -> NonNull<T> {
        this.ptr
    }

    /// Mesmo objeto (comparação de endereço).
    #[inline]
    pub fn ptr_eq<U: ?Sized + AsAutoObject>(this: &Self, other: &KScopedAutoObject<U>) -> bool {
        this.ptr.cast::<u8>() == other.ptr.cast::<u8>()
    }

    #[inline]
    pub fn reference_count(this: &Self) -> u32 {
        this.as_auto_object().reference_count()
    }
}

impl KScopedAutoObject<dyn KAutoObject> {
    /// Recupera o tipo concreto se o class token bater.
    pub fn downcast<T: KObjectType>(self) -> Result<KScopedAutoObject<T>, Self> {
        if self.is_instance_of(T::KIND) {
            let raw = Self::into_raw(self);
            // SAFETY: `T::KIND` é final e exclusivo de `T` (contrato de KObjectType)
            Ok(unsafe { KScopedAutoObject::from_raw(raw.cast::<T>()) })
        } else {
            Err(self)
        }
    }

    /// Empréstimo tipado sem mexer no refcount.
    pub fn downcast_ref<T: KObjectType>(&self) -> Option<&T> {
        if self.is_instance_of(T::KIND) {
            // SAFETY: Idem `downcast`
            Some(unsafe { self.ptr.cast::<T>().as_ref() })
        } else {
            None
        }
    }
}

/// Conversão para a forma apagada `KScopedAutoObject<dyn KAutoObject>`.
pub trait IntoAutoObject {
    fn into_auto_object(self) -> KScopedAutoObject<dyn KAutoObject>;
}

impl<T: KObjectType> IntoAutoObject for KScopedAutoObject<T> {
    fn into_auto_object(self) -> KScopedAutoObject<dyn KAutoObject> {
        let raw = Self::into_raw(self);
        let erased: NonNull<dyn KAutoObject> = raw;
        // SAFETY: A referência de `self` passa para o novo dono
        unsafe { KScopedAutoObject::from_raw(erased) }
    }
}

impl IntoAutoObject for KScopedAutoObject<dyn KAutoObject> {
    #[inline]
    fn into_auto_object(self) -> KScopedAutoObject<dyn KAutoObject> {
        self
    }
}

impl<T: ?Sized + AsAutoObject> Deref for KScopedAutoObject<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: Seguramos uma referência aberta, o objeto está vivo
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized + AsAutoObject> Clone for KScopedAutoObject<T> {
    fn clone(&self) -> Self {
        self.as_auto_object().open();
        // SAFETY: `self` mantém o objeto vivo e a referência aberta acima
        // passa para o clone
        unsafe { Self::from_raw(self.ptr) }
    }
}

impl<T: ?Sized + AsAutoObject> Drop for KScopedAutoObject<T> {
    fn drop(&mut self) {
        // SAFETY: Esta é a referência que `self` possuía
        unsafe { self.as_auto_object().close() };
    }
}

impl<T: ?Sized + AsAutoObject> fmt::Debug for KScopedAutoObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.as_auto_object();
        f.debug_struct("KScopedAutoObject")
            .field("type", &object.type_name())
            .field("ptr", &self.ptr)
            .field("refs", &object.reference_count())
            .finish()
    }
}
