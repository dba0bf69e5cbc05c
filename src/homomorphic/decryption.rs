use crate::error::{CryptoError, Result};
use crate::homomorphic::{Ciphertext, Plaintext, SecretKey};
use crate::utils::round_to_decimals;

/// Decrypts one scalar ciphertext.
///
/// `s = E[m-1] / (k_m + s_m + t_m)` recovers the shared random record, and
/// `v = Σ_{i<m-1} (E[i] - s·s_i) / k_i  /  Σ_{i<m-1} t_i`. A ciphertext with
/// the rounding flag set comes back as an integer (rounded to two decimals,
/// then truncated).
///
/// # Errors
/// Returns [`CryptoError::Arithmetic`] when a divisor of the key is zero or
/// the result is not finite, and a validation error when the ciphertext
/// length differs from `m`.
pub fn decrypt_scalar(ct: &Ciphertext, sk: &SecretKey) -> Result<Plaintext> {
    let value = decrypt_components(ct.components(), sk)?;
    Ok(restore(value, ct.rounded()))
}

/// Decrypts every ciphertext of a vector.
pub fn decrypt_vector(cts: &[Ciphertext], sk: &SecretKey) -> Result<Vec<Plaintext>> {
    cts.iter().map(|ct| decrypt_scalar(ct, sk)).collect()
}

/// Decrypts a matrix row by row, preserving its shape.
pub fn decrypt_matrix<Row: AsRef<[Ciphertext]>>(rows: &[Row], sk: &SecretKey) -> Result<Vec<Vec<Plaintext>>> {
    rows.iter().map(|row| decrypt_vector(row.as_ref(), sk)).collect()
}

/// Raw decryption of `m` components to a real value, without rounding.
pub(crate) fn decrypt_components(components: &[f64], sk: &SecretKey) -> Result<f64> {
    let m = sk.m();
    if components.len() != m {
        return Err(CryptoError::Validation(format!(
            "ciphertext has {} components, key expects {}",
            components.len(),
            m
        )));
    }

    let triples = sk.triples();
    let final_sum = sk.final_sum();
    if final_sum == 0.0 {
        return Err(CryptoError::Arithmetic(
            "final key triple sums to zero".to_string(),
        ));
    }
    let t: f64 = triples[..m - 1].iter().map(|tp| tp.t).sum();
    if t == 0.0 {
        return Err(CryptoError::Arithmetic(
            "key t components sum to zero".to_string(),
        ));
    }

    let s = components[m - 1] / final_sum;
    let mut e = 0.0;
    for (i, (tp, component)) in triples.iter().zip(components).take(m - 1).enumerate() {
        if tp.k == 0.0 {
            return Err(CryptoError::Arithmetic(format!("key component k_{} is zero", i + 1)));
        }
        e += (component - s * tp.s) / tp.k;
    }

    let v = e / t;
    if !v.is_finite() {
        return Err(CryptoError::Arithmetic(format!(
            "decryption produced a non-finite value ({})",
            v
        )));
    }
    Ok(v)
}

/// Applies the rounding flag to a decrypted value.
pub(crate) fn restore(value: f64, rounded: bool) -> Plaintext {
    if rounded {
        Plaintext::Integer(round_to_decimals(value, 2).trunc() as i64)
    } else {
        Plaintext::Real(value)
    }
}
