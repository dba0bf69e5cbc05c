//! Ciphertext-space arithmetic.
//!
//! Decryption is linear in the ciphertext components, so component-wise sums
//! and scalings carry over to the plaintexts. The outer product of two
//! ciphertexts decrypts in two stages: each row `E1[i]·E2` decrypts to
//! `E1[i]·b`, which together form `b·E1`, and that decrypts to `a·b`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};
use crate::homomorphic::decryption::{decrypt_components, restore};
use crate::homomorphic::{Ciphertext, Plaintext, SecretKey};

/// The m²-component result of [`multiply`], row-major over `E1 ⊗ E2`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductCiphertext {
    components: Vec<f64>,
    m: usize,
    rounded: bool,
}

impl ProductCiphertext {
    pub fn components(&self) -> &[f64] {
        &self.components
    }

    /// Length of the factors this product was built from.
    pub fn m(&self) -> usize {
        self.m
    }

    pub fn rounded(&self) -> bool {
        self.rounded
    }
}

fn check_lengths(a: &Ciphertext, b: &Ciphertext) -> Result<()> {
    if a.len() != b.len() {
        return Err(CryptoError::Validation(format!(
            "ciphertext lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Component-wise sum; decrypts to the sum of the plaintexts.
pub fn add(a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
    check_lengths(a, b)?;
    let components = a
        .components()
        .iter()
        .zip(b.components())
        .map(|(x, y)| x + y)
        .collect();
    Ok(Ciphertext::new(components, a.rounded() && b.rounded()))
}

/// Scales every component by a plaintext; decrypts to `scalar × plaintext`.
pub fn multiply_c<P: Into<Plaintext>>(scalar: P, ct: &Ciphertext) -> Ciphertext {
    let scalar = scalar.into();
    let c = scalar.as_f64();
    let components = ct.components().iter().map(|x| c * x).collect();
    Ciphertext::new(components, ct.rounded() && scalar.is_integer())
}

/// `add(a, multiply_c(-1, b))`.
pub fn subtract(a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
    add(a, &multiply_c(-1, b))
}

/// Full outer product of two ciphertexts, to be opened with [`decrypt_product`].
pub fn multiply(a: &Ciphertext, b: &Ciphertext) -> Result<ProductCiphertext> {
    check_lengths(a, b)?;
    let m = a.len();
    let mut components = Vec::with_capacity(m * m);
    for x in a.components() {
        for y in b.components() {
            components.push(x * y);
        }
    }
    Ok(ProductCiphertext {
        components,
        m,
        rounded: a.rounded() && b.rounded(),
    })
}

/// Opens a product ciphertext.
///
/// The m² components are split into m chunks of length m. Each chunk is
/// decrypted as an ordinary ciphertext (as a real, without rounding), the m
/// results are decrypted once more as a ciphertext, and the rounding flag of
/// the product is applied to that final value only.
///
/// # Errors
/// Returns a validation error if the product was not built for this key's
/// `m`, and propagates decryption errors.
pub fn decrypt_product(product: &ProductCiphertext, sk: &SecretKey) -> Result<Plaintext> {
    let m = sk.m();
    if product.m != m || product.components.len() != m * m {
        return Err(CryptoError::Validation(format!(
            "product has {} components, key expects {}",
            product.components.len(),
            m * m
        )));
    }

    let intermediate = product
        .components
        .chunks(m)
        .map(|chunk| decrypt_components(chunk, sk))
        .collect::<Result<Vec<f64>>>()?;
    let value = decrypt_components(&intermediate, sk)?;
    Ok(restore(value, product.rounded))
}

/// Element-wise [`add`] over two encrypted vectors of the same shape.
pub fn add_vector(a: &[Ciphertext], b: &[Ciphertext]) -> Result<Vec<Ciphertext>> {
    if a.len() != b.len() {
        return Err(CryptoError::Validation(format!(
            "vector lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    a.iter().zip(b).map(|(x, y)| add(x, y)).collect()
}
