//! Bitmap atômico
//!
//! Usado pelos slab heaps para saber quais slots estão ocupados. Cada bit
//! pode ser ligado/desligado de forma atômica, então o bitmap funciona tanto
//! sob spinlock quanto no caminho lock-free.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

/// Bitmap de tamanho fixo com operações atômicas por bit.
pub struct AtomicBitmap {
    words: Box<[AtomicU64]>,
    len: usize,
}

impl AtomicBitmap {
    /// Cria bitmap com `bits` bits, todos zerados.
    pub fn new(bits: usize) -> Self {
        let words = (bits + 63) / 64;
        let mut data = Vec::with_capacity(words);
        data.resize_with(words, || AtomicU64::new(0));
        Self {
            words: data.into_boxed_slice(),
            len: bits,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u64) {
        debug_assert!(index < self.len);
        (index / 64, 1u64 << (index % 64))
    }

    /// Liga um bit. Retorna o valor anterior.
    pub fn test_and_set(&self, index: usize) -> bool {
        let (word, mask) = self.locate(index);
        self.words[word].fetch_or(mask, Ordering::AcqRel) & mask != 0
    }

    /// Desliga um bit. Retorna o valor anterior.
    pub fn test_and_clear(&self, index: usize) -> bool {
        let (word, mask) = self.locate(index);
        self.words[word].fetch_and(!mask, Ordering::AcqRel) & mask != 0
    }

    /// Testa um bit
    pub fn test(&self, index: usize) -> bool {
        let (word, mask) = self.locate(index);
        self.words[word].load(Ordering::Acquire) & mask != 0
    }

    /// Quantidade de bits ligados.
    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_report_previous_state() {
        let bitmap = AtomicBitmap::new(130);
        assert!(!bitmap.test_and_set(129));
        assert!(bitmap.test_and_set(129));
        assert!(bitmap.test(129));
        assert_eq!(bitmap.count_ones(), 1);
        assert!(bitmap.test_and_clear(129));
        assert!(!bitmap.test_and_clear(129));
        assert_eq!(bitmap.count_ones(), 0);
    }
}
