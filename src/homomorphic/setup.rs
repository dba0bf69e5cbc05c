use std::fmt;

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

/// Default number of triples in a secret key.
pub const DEFAULT_M: usize = 3;

/// Smallest usable number of triples.
pub const MIN_M: usize = 3;

/// Draws allowed per triple before key generation gives up.
pub const MAX_TRIPLE_ATTEMPTS: usize = 64;

/// One `(k, s, t)` component of the secret key.
#[derive(Clone, Copy, Debug, PartialEq, Zeroize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyTriple {
    pub k: f64,
    pub s: f64,
    pub t: f64,
}

impl KeyTriple {
    pub fn new(k: f64, s: f64, t: f64) -> Self {
        KeyTriple { k, s, t }
    }

    /// Draws a triple with every component in `(0, 1)`, redrawing on exact zeros.
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Result<Self> {
        for _ in 0..MAX_TRIPLE_ATTEMPTS {
            let triple = KeyTriple {
                k: rng.random(),
                s: rng.random(),
                t: rng.random(),
            };
            if triple.k != 0.0 && triple.s != 0.0 && triple.t != 0.0 {
                return Ok(triple);
            }
        }
        Err(CryptoError::KeyGeneration(format!(
            "drew a zero key component {} times in a row",
            MAX_TRIPLE_ATTEMPTS
        )))
    }

    pub fn sum(&self) -> f64 {
        self.k + self.s + self.t
    }
}

/// Secret key of the homomorphic scheme: `m` triples `(k_i, s_i, t_i)`.
///
/// Zeroized on drop; `Debug` output never shows the triples.
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "Vec<KeyTriple>", into = "Vec<KeyTriple>")
)]
pub struct SecretKey {
    triples: Vec<KeyTriple>,
}

impl SecretKey {
    /// Generates a secret key with `m` uniformly random triples.
    ///
    /// Components are never exactly zero, so every `k_i` and the final
    /// triple's sum are usable divisors on decryption.
    ///
    /// # Errors
    /// Returns an error if `m < 3`, or if a triple still has a zero component
    /// after [`MAX_TRIPLE_ATTEMPTS`] draws.
    pub fn generate<R: Rng + ?Sized>(m: usize, rng: &mut R) -> Result<Self> {
        if m < MIN_M {
            return Err(CryptoError::InvalidParameter(format!(
                "m must be at least {}, got {}",
                MIN_M, m
            )));
        }

        let triples = (0..m)
            .map(|_| KeyTriple::random(rng))
            .collect::<Result<Vec<KeyTriple>>>()?;

        debug!(m, "generated homomorphic secret key");
        Ok(SecretKey { triples })
    }

    /// Rebuilds a key from explicit triples.
    ///
    /// # Errors
    /// Returns an error if fewer than three triples are given or any component
    /// is not finite.
    pub fn from_triples(triples: Vec<KeyTriple>) -> Result<Self> {
        if triples.len() < MIN_M {
            return Err(CryptoError::InvalidParameter(format!(
                "m must be at least {}, got {}",
                MIN_M,
                triples.len()
            )));
        }
        if triples
            .iter()
            .any(|tp| !(tp.k.is_finite() && tp.s.is_finite() && tp.t.is_finite()))
        {
            return Err(CryptoError::InvalidParameter(
                "key triples must be finite".to_string(),
            ));
        }
        Ok(SecretKey { triples })
    }

    /// Number of triples, which is also the ciphertext length.
    pub fn m(&self) -> usize {
        self.triples.len()
    }

    pub fn triples(&self) -> &[KeyTriple] {
        &self.triples
    }

    /// `k_m + s_m + t_m`.
    pub fn final_sum(&self) -> f64 {
        self.triples[self.triples.len() - 1].sum()
    }
}

impl TryFrom<Vec<KeyTriple>> for SecretKey {
    type Error = CryptoError;

    fn try_from(triples: Vec<KeyTriple>) -> Result<Self> {
        SecretKey::from_triples(triples)
    }
}

impl From<SecretKey> for Vec<KeyTriple> {
    fn from(key: SecretKey) -> Self {
        key.triples.clone()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("m", &self.triples.len())
            .field("triples", &"[REDACTED]")
            .finish()
    }
}
