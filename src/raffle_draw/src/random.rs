//! Randomness sources the engine draws winning slots from.
//!
//! The engine never owns an RNG; callers hand in anything that implements
//! [`RandomSource`]. Every value a source returns is range-checked by the
//! selector, so a misbehaving source surfaces as an error instead of being clamped.

use crate::error::RandomFault;
use crate::types::Salt;
use rand::Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Largest relative bias a [`ModuloSource`] accepts by default.
pub const DEFAULT_MAX_BIAS: f64 = 1e-6;

/// A uniform integer generator: `draw(n)` returns a value in `[0, n)`.
pub trait RandomSource {
    fn draw(&mut self, n: u64) -> Result<u64, RandomFault>;
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn draw(&mut self, n: u64) -> Result<u64, RandomFault> {
        (**self).draw(n)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn draw(&mut self, n: u64) -> Result<u64, RandomFault> {
        (**self).draw(n)
    }
}

/// Adapts any `rand` generator. `gen_range` rejects out-of-zone samples, so
/// the result carries no modulo bias for any `n`.
#[derive(Clone, Debug)]
pub struct RngSource<R> {
    rng: R,
}

pub type ChaChaSource = RngSource<ChaCha20Rng>;

impl<R: RngCore> RngSource<R> {
    pub fn new(rng: R) -> Self {
        RngSource { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl ChaChaSource {
    pub fn from_salt(salt: Salt) -> Self {
        RngSource::new(ChaCha20Rng::from_seed(salt))
    }

    pub fn from_seed_u64(seed: u64) -> Self {
        RngSource::new(ChaCha20Rng::seed_from_u64(seed))
    }

    /// Seeds a fresh generator from the thread-local entropy pool.
    pub fn from_entropy() -> Result<Self, RandomFault> {
        let rng = ChaCha20Rng::from_rng(rand::thread_rng())
            .map_err(|e| RandomFault::Failed(format!("failed to seed generator: {}", e)))?;
        Ok(RngSource::new(rng))
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn draw(&mut self, n: u64) -> Result<u64, RandomFault> {
        if n == 0 {
            return Err(RandomFault::OutOfRange { value: 0, bound: 0 });
        }
        Ok(self.rng.gen_range(0..n))
    }
}

/// Reduces externally supplied raw words (beacon output, VRF bytes) with `word % n`.
///
/// Modulo reduction favours low values whenever `n` does not divide the word
/// range. The bias is computed for every draw and the draw is refused when it
/// exceeds `max_bias`, or when `n` is larger than the word range itself.
#[derive(Clone, Debug)]
pub struct ModuloSource {
    words: VecDeque<u64>,
    bits: u32,
    max_bias: f64,
}

impl ModuloSource {
    /// `bits` is the width of each word and must be between 1 and 64.
    pub fn new(words: impl IntoIterator<Item = u64>, bits: u32) -> Result<Self, RandomFault> {
        if !(1..=64).contains(&bits) {
            return Err(RandomFault::InvalidWordWidth(bits));
        }
        Ok(ModuloSource {
            words: words.into_iter().collect(),
            bits,
            max_bias: DEFAULT_MAX_BIAS,
        })
    }

    /// Splits a 32-byte salt into four little-endian 64-bit words.
    pub fn from_salt(salt: Salt) -> Self {
        let words = salt.chunks_exact(8).map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            u64::from_le_bytes(bytes)
        });
        ModuloSource {
            words: words.collect(),
            bits: 64,
            max_bias: DEFAULT_MAX_BIAS,
        }
    }

    pub fn with_max_bias(mut self, max_bias: f64) -> Self {
        self.max_bias = max_bias;
        self
    }

    pub fn remaining(&self) -> usize {
        self.words.len()
    }

    /// Share of the word range that lands in the uneven tail when reducing mod `n`.
    pub fn bias(&self, n: u64) -> Result<f64, RandomFault> {
        let range = 1u128 << self.bits;
        if n == 0 || n as u128 > range {
            return Err(RandomFault::RangeTooLarge {
                bound: n,
                bits: self.bits,
            });
        }
        let tail = range % n as u128;
        Ok(tail as f64 / range as f64)
    }
}

impl RandomSource for ModuloSource {
    fn draw(&mut self, n: u64) -> Result<u64, RandomFault> {
        let bias = self.bias(n)?;
        if bias > self.max_bias {
            return Err(RandomFault::BiasTooHigh {
                bound: n,
                bias,
                ceiling: self.max_bias,
            });
        }
        let word = self.words.pop_front().ok_or(RandomFault::Exhausted)?;
        let mask = if self.bits == 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        };
        Ok((word & mask) % n)
    }
}

/// A source shared between worker threads behind a mutex.
pub struct SharedSource<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> SharedSource<S> {
    pub fn new(source: S) -> Self {
        SharedSource {
            inner: Arc::new(Mutex::new(source)),
        }
    }
}

impl<S> Clone for SharedSource<S> {
    fn clone(&self) -> Self {
        SharedSource {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RandomSource> RandomSource for SharedSource<S> {
    fn draw(&mut self, n: u64) -> Result<u64, RandomFault> {
        let mut source = self
            .inner
            .lock()
            .map_err(|_| RandomFault::Failed("randomness source lock poisoned".to_string()))?;
        source.draw(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chacha_stays_in_range() {
        let mut source = ChaChaSource::from_seed_u64(7);
        for n in [1u64, 2, 3, 10, 1_000_003] {
            for _ in 0..200 {
                assert!(source.draw(n).unwrap() < n);
            }
        }
    }

    #[test]
    fn chacha_seed_is_reproducible() {
        let mut a = ChaChaSource::from_salt([9u8; 32]);
        let mut b = ChaChaSource::from_salt([9u8; 32]);
        let xs: Vec<u64> = (0..16).map(|_| a.draw(1000).unwrap()).collect();
        let ys: Vec<u64> = (0..16).map(|_| b.draw(1000).unwrap()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn zero_range_is_refused() {
        let mut source = ChaChaSource::from_seed_u64(1);
        assert!(source.draw(0).is_err());
    }

    #[test]
    fn modulo_reduces_words_in_order() {
        let mut source = ModuloSource::new(vec![10, 11, 12], 64).unwrap();
        assert_eq!(source.draw(4).unwrap(), 2);
        assert_eq!(source.draw(4).unwrap(), 3);
        assert_eq!(source.draw(4).unwrap(), 0);
        assert_eq!(source.draw(4), Err(RandomFault::Exhausted));
    }

    #[test]
    fn modulo_flags_bias_on_narrow_words() {
        // 256 % 3 == 1, so one value in 256 is over-represented
        let mut source = ModuloSource::new(vec![5], 8).unwrap();
        match source.draw(3) {
            Err(RandomFault::BiasTooHigh { bound, .. }) => assert_eq!(bound, 3),
            other => panic!("expected BiasTooHigh, got {:?}", other),
        }
        // powers of two divide the range evenly
        assert_eq!(source.draw(4).unwrap(), 1);
    }

    #[test]
    fn modulo_accepts_bias_under_a_looser_ceiling() {
        let mut source = ModuloSource::new(vec![200], 8).unwrap().with_max_bias(0.01);
        assert_eq!(source.draw(3).unwrap(), 200 % 3);
    }

    #[test]
    fn modulo_refuses_range_wider_than_word() {
        let mut source = ModuloSource::new(vec![1], 8).unwrap();
        assert_eq!(
            source.draw(300),
            Err(RandomFault::RangeTooLarge { bound: 300, bits: 8 })
        );
        // the word is not consumed by a refused draw
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn salt_splits_into_four_words() {
        let mut salt = [0u8; 32];
        salt[0] = 7;
        salt[8] = 9;
        let mut source = ModuloSource::from_salt(salt);
        assert_eq!(source.remaining(), 4);
        assert_eq!(source.draw(1000).unwrap(), 7);
        assert_eq!(source.draw(1000).unwrap(), 9);
    }

    #[test]
    fn shared_source_clones_draw_from_one_stream() {
        let shared = SharedSource::new(ModuloSource::new(vec![1, 2], 64).unwrap());
        let mut a = shared.clone();
        let mut b = shared;
        assert_eq!(a.draw(10).unwrap(), 1);
        assert_eq!(b.draw(10).unwrap(), 2);
        assert_eq!(a.draw(10), Err(RandomFault::Exhausted));
    }

    #[test]
    fn word_width_outside_one_to_sixty_four_is_rejected() {
        assert_eq!(
            ModuloSource::new(vec![1], 0).unwrap_err(),
            RandomFault::InvalidWordWidth(0)
        );
        assert_eq!(
            ModuloSource::new(vec![1], 65).unwrap_err(),
            RandomFault::InvalidWordWidth(65)
        );
        assert!(ModuloSource::new(vec![1], 1).is_ok());
    }

    #[test]
    fn poisoned_lock_is_a_source_error() {
        let mut shared = SharedSource::new(ModuloSource::new(vec![1, 2], 64).unwrap());
        let inner = Arc::clone(&shared.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("worker died holding the source");
        })
        .join();
        assert_eq!(
            shared.draw(10),
            Err(RandomFault::Failed(
                "randomness source lock poisoned".to_string()
            ))
        );
    }
}
