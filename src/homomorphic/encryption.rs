use std::fmt;

use rand::Rng;
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::homomorphic::SecretKey;

/// Largest integer magnitude that survives encryption exactly.
///
/// Integer plaintexts are carried as `f64`, which represents every integer up
/// to 2^53. Beyond that, nearby integers share a representation and decrypt to
/// the nearest representable value instead.
pub const MAX_EXACT_INTEGER: i64 = 1 << 53;

/// A plaintext scalar. The variant decides whether decryption restores an integer.
///
/// `Integer` values round-trip exactly only while `|v| <= MAX_EXACT_INTEGER`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Plaintext {
    Integer(i64),
    Real(f64),
}

impl Plaintext {
    pub fn is_integer(&self) -> bool {
        matches!(self, Plaintext::Integer(_))
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Plaintext::Integer(v) => v as f64,
            Plaintext::Real(v) => v,
        }
    }
}

impl From<i64> for Plaintext {
    fn from(v: i64) -> Self {
        Plaintext::Integer(v)
    }
}

impl From<i32> for Plaintext {
    fn from(v: i32) -> Self {
        Plaintext::Integer(v.into())
    }
}

impl From<u32> for Plaintext {
    fn from(v: u32) -> Self {
        Plaintext::Integer(v.into())
    }
}

impl From<f64> for Plaintext {
    fn from(v: f64) -> Self {
        Plaintext::Real(v)
    }
}

impl From<f32> for Plaintext {
    fn from(v: f32) -> Self {
        Plaintext::Real(v.into())
    }
}

impl fmt::Display for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plaintext::Integer(v) => write!(f, "{}", v),
            Plaintext::Real(v) => write!(f, "{}", v),
        }
    }
}

/// An m-component ciphertext together with its rounding flag.
///
/// The flag is set when the plaintext was an integer, and tells decryption to
/// round to two decimals and return an integer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ciphertext {
    components: Vec<f64>,
    rounded: bool,
}

impl Ciphertext {
    pub fn new(components: Vec<f64>, rounded: bool) -> Self {
        Ciphertext { components, rounded }
    }

    pub fn components(&self) -> &[f64] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn rounded(&self) -> bool {
        self.rounded
    }
}

/// Encrypts one scalar.
///
/// With `R` a fresh vector of `m` uniform draws (0-based indices below):
///
/// ```text
/// E[0]   = k0·t0·v + s0·R[m-1] + k0·(R[0] - R[m-2])
/// E[i]   = ki·ti·v + si·R[m-1] + ki·(R[i] - R[i-1])      for 0 < i < m-1
/// E[m-1] = (k[m-1] + s[m-1] + t[m-1])·R[m-1]
/// ```
///
/// The `R` differences telescope to zero over the first `m - 1` components,
/// which is what decryption relies on.
///
/// The plaintext enters the arithmetic as `f64`, so an integer beyond
/// [`MAX_EXACT_INTEGER`] in magnitude is already rounded before encryption.
pub fn encrypt_scalar<P: Into<Plaintext>, R: Rng + ?Sized>(
    plaintext: P,
    sk: &SecretKey,
    rng: &mut R,
) -> Ciphertext {
    let plaintext = plaintext.into();
    let v = plaintext.as_f64();
    let triples = sk.triples();
    let m = triples.len();

    let record: Zeroizing<Vec<f64>> = Zeroizing::new((0..m).map(|_| rng.random()).collect());
    let r_last = record[m - 1];

    let mut components = Vec::with_capacity(m);
    for (i, tp) in triples[..m - 1].iter().enumerate() {
        let diff = if i == 0 {
            record[0] - record[m - 2]
        } else {
            record[i] - record[i - 1]
        };
        components.push(tp.k * tp.t * v + tp.s * r_last + tp.k * diff);
    }
    components.push(sk.final_sum() * r_last);

    Ciphertext::new(components, plaintext.is_integer())
}

/// Encrypts every element of `values`.
pub fn encrypt_vector<P: Into<Plaintext> + Copy, R: Rng + ?Sized>(
    values: &[P],
    sk: &SecretKey,
    rng: &mut R,
) -> Vec<Ciphertext> {
    values.iter().map(|v| encrypt_scalar(*v, sk, rng)).collect()
}

/// Encrypts a matrix row by row, preserving its shape.
pub fn encrypt_matrix<P, Row, R>(rows: &[Row], sk: &SecretKey, rng: &mut R) -> Vec<Vec<Ciphertext>>
where
    P: Into<Plaintext> + Copy,
    Row: AsRef<[P]>,
    R: Rng + ?Sized,
{
    rows.iter().map(|row| encrypt_vector(row.as_ref(), sk, rng)).collect()
}

/// Parallel [`encrypt_matrix`]; each worker draws its random records from its
/// thread-local generator.
pub fn par_encrypt_matrix<P, Row>(rows: &[Row], sk: &SecretKey) -> Vec<Vec<Ciphertext>>
where
    P: Into<Plaintext> + Copy + Sync,
    Row: AsRef<[P]> + Sync,
{
    rows.par_iter()
        .map(|row| encrypt_vector(row.as_ref(), sk, &mut rand::rng()))
        .collect()
}
