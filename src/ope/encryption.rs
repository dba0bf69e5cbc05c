use rand::Rng;
use rayon::prelude::*;

use crate::error::{CryptoError, Result};
use crate::ope::OpeKey;
use crate::utils::uniform_below;

/// Default noise sensitivity.
pub const DEFAULT_SENSITIVITY: f64 = 0.01;

/// Encrypts a scalar under an FDH-OPE key.
///
/// The magnitude is rescaled linearly from its message-space range onto the
/// paired cipher-space range, a noise term `delta ∈ [0, sensitivity × scale)`
/// is added, and the sign of the plaintext is restored. `delta` is capped so
/// that the result stays strictly below the upper end of its cipher range,
/// hence plaintexts of equal sign in different ranges always keep their order.
///
/// # Arguments
/// * `plaintext` - The value to encrypt
/// * `key` - The OPE key
/// * `sensitivity` - Noise magnitude relative to the range scale (non-negative)
/// * `rng` - A random number generator
///
/// # Errors
/// Returns [`CryptoError::Domain`] if `|plaintext|` is outside the key's
/// message space.
pub fn encrypt<R: Rng + ?Sized>(
    plaintext: f64,
    key: &OpeKey,
    sensitivity: f64,
    rng: &mut R,
) -> Result<f64> {
    if !sensitivity.is_finite() || sensitivity < 0.0 {
        return Err(CryptoError::InvalidParameter(format!(
            "sensitivity must be non-negative, got {}",
            sensitivity
        )));
    }
    if !plaintext.is_finite() {
        return Err(CryptoError::Domain { value: plaintext });
    }

    let id = key.message_space().interval_of(plaintext)?;
    let message = key.message_space().boundary(id)?;
    let cipher = key.cipher_space().boundary(id)?;

    let scale = (cipher.low - cipher.high) / (message.low - message.high);
    let base = cipher.low + scale * (plaintext.abs() - message.low);
    let delta = uniform_below(rng, (sensitivity * scale).min(cipher.high - base));
    let ciphertext = base + delta;

    Ok(if plaintext < 0.0 { -ciphertext } else { ciphertext })
}

/// Encrypts every element of `values`.
pub fn encrypt_vector<R: Rng + ?Sized>(
    values: &[f64],
    key: &OpeKey,
    sensitivity: f64,
    rng: &mut R,
) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|value| encrypt(*value, key, sensitivity, rng))
        .collect()
}

/// Encrypts a matrix row by row, preserving its shape.
pub fn encrypt_matrix<R: Rng + ?Sized, Row: AsRef<[f64]>>(
    rows: &[Row],
    key: &OpeKey,
    sensitivity: f64,
    rng: &mut R,
) -> Result<Vec<Vec<f64>>> {
    rows.iter()
        .map(|row| encrypt_vector(row.as_ref(), key, sensitivity, rng))
        .collect()
}

/// Parallel [`encrypt_matrix`]; each worker draws noise from its thread-local generator.
pub fn par_encrypt_matrix<Row: AsRef<[f64]> + Sync>(
    rows: &[Row],
    key: &OpeKey,
    sensitivity: f64,
) -> Result<Vec<Vec<f64>>> {
    rows.par_iter()
        .map(|row| encrypt_vector(row.as_ref(), key, sensitivity, &mut rand::rng()))
        .collect()
}
