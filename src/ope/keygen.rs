use std::fmt;

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};
use crate::ope::partition::{DensityMap, Interval, Partition, RangeId};
use crate::ope::Dataset;
use crate::utils::round_half_even;

/// Parameters for FDH-OPE key generation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OpeParams {
    /// Lower bound of the message space
    pub min_value: f64,
    /// Upper bound on the number of message-space ranges to draw (at least 2)
    pub max_range: usize,
    /// Expansion factor of the cipher domain relative to the message domain
    pub proportion: f64,
}

impl Default for OpeParams {
    fn default() -> Self {
        OpeParams {
            min_value: 0.0,
            max_range: 5,
            proportion: 5.0,
        }
    }
}

impl OpeParams {
    fn validate(&self) -> Result<()> {
        if self.max_range < 2 {
            return Err(CryptoError::InvalidParameter(format!(
                "max_range must be at least 2, got {}",
                self.max_range
            )));
        }
        if !self.proportion.is_finite() || self.proportion <= 0.0 {
            return Err(CryptoError::InvalidParameter(format!(
                "proportion must be positive, got {}",
                self.proportion
            )));
        }
        if !self.min_value.is_finite() {
            return Err(CryptoError::InvalidParameter("min_value must be finite".to_string()));
        }
        Ok(())
    }
}

/// FDH-OPE key: index-paired message-space and cipher-space partitions.
///
/// Deserialization goes through [`OpeKey::new`].
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "OpeKeyRepr", into = "OpeKeyRepr")
)]
pub struct OpeKey {
    message_space: Partition,
    cipher_space: Partition,
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct OpeKeyRepr {
    message_space: Partition,
    cipher_space: Partition,
}

#[cfg(feature = "serde")]
impl TryFrom<OpeKeyRepr> for OpeKey {
    type Error = CryptoError;

    fn try_from(repr: OpeKeyRepr) -> Result<Self> {
        OpeKey::new(repr.message_space, repr.cipher_space)
    }
}

#[cfg(feature = "serde")]
impl From<OpeKey> for OpeKeyRepr {
    fn from(key: OpeKey) -> Self {
        OpeKeyRepr {
            message_space: key.message_space.clone(),
            cipher_space: key.cipher_space.clone(),
        }
    }
}

impl OpeKey {
    /// Pairs two partitions into a key.
    ///
    /// # Errors
    /// Returns a validation error unless both partitions hold the same ids in
    /// the same order.
    pub fn new(message_space: Partition, cipher_space: Partition) -> Result<Self> {
        if message_space.is_empty() || message_space.ids() != cipher_space.ids() {
            return Err(CryptoError::Validation(
                "message space and cipher space must be index-paired".to_string(),
            ));
        }
        Ok(OpeKey {
            message_space,
            cipher_space,
        })
    }

    pub fn message_space(&self) -> &Partition {
        &self.message_space
    }

    pub fn cipher_space(&self) -> &Partition {
        &self.cipher_space
    }
}

impl fmt::Debug for OpeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpeKey")
            .field("ranges", &self.message_space.len())
            .field("intervals", &"[REDACTED]")
            .finish()
    }
}

/// Generates an FDH-OPE key calibrated on `dataset`.
///
/// The message space is split at random, ranges holding no data are dropped,
/// and the survivors are renumbered and stitched back together. Each surviving
/// range then gets a cipher-space range whose width is proportional to the
/// share of the dataset it holds.
///
/// A sparse range can round to a zero-width cipher range. Every value in it
/// encrypts to the range's lower bound, which ties with the smallest
/// ciphertexts of the next range, so order across that boundary is
/// non-strict.
///
/// # Errors
/// Returns [`CryptoError::KeyGeneration`] when no range keeps any data or the
/// cipher boundaries overrun `maxCipher + 1`, and
/// [`CryptoError::InvalidParameter`] for unusable parameters.
pub fn keygen<R: Rng + ?Sized>(dataset: &Dataset, params: &OpeParams, rng: &mut R) -> Result<OpeKey> {
    params.validate()?;

    let max_message = round_half_even(dataset.max_abs()) + 1.0;
    let max_cipher = max_message * params.proportion;
    let total = dataset.len();
    if params.min_value >= max_message {
        return Err(CryptoError::InvalidParameter(format!(
            "min_value ({}) must be below the message-space maximum ({})",
            params.min_value, max_message
        )));
    }

    let n_range = rng.random_range(2..=params.max_range);
    debug!(n_range, max_message, max_cipher, total, "drawing message space");

    let raw = Partition::generate(params.min_value, max_message, n_range, rng)?;
    let raw_density = raw.density(dataset)?;

    let (message_space, density) = coalesce(&raw, &raw_density)?;
    debug!(
        drawn = raw.len(),
        kept = message_space.len(),
        "dropped empty message-space ranges"
    );

    let mut boundaries = Vec::with_capacity(message_space.len() + 1);
    boundaries.push(0.0);
    for id in message_space.ids() {
        let count = density.get(id).copied().unwrap_or(0);
        let width = round_half_even(max_cipher * count as f64 / total as f64);
        if width == 0.0 {
            debug!(range = %id, count, total, "cipher range rounded to zero width");
        }
        let last = boundaries.last().copied().unwrap_or(0.0);
        boundaries.push(last + width);
    }

    let cipher_space = Partition::from_boundaries(message_space.ids().to_vec(), &boundaries, max_cipher)
        .map_err(|e| CryptoError::KeyGeneration(format!("cipher space is inconsistent: {}", e)))?;

    info!(ranges = message_space.len(), max_message, max_cipher, "generated OPE key");
    OpeKey::new(message_space, cipher_space)
}

/// Drops empty ranges, renumbers the rest and closes the gaps they leave.
///
/// A surviving range whose lower bound lies above everything covered so far
/// is stretched down to the running maximum.
fn coalesce(raw: &Partition, raw_density: &DensityMap) -> Result<(Partition, DensityMap)> {
    let mut entries = Vec::new();
    let mut density = DensityMap::new();
    let mut global_max = f64::NEG_INFINITY;

    let survivors = raw
        .iter()
        .filter(|(id, _)| raw_density.get(id).copied().unwrap_or(0) > 0);

    for (index, (old_id, interval)) in survivors.enumerate() {
        let new_id = RangeId(index);
        let low = if index == 0 || interval.low <= global_max {
            interval.low
        } else {
            global_max
        };
        global_max = interval.high;

        entries.push((new_id, Interval::new(low, interval.high)));
        density.insert(new_id, raw_density[&old_id]);
    }

    if entries.is_empty() {
        return Err(CryptoError::KeyGeneration(
            "every message-space range is empty after density filtering".to_string(),
        ));
    }

    Ok((Partition::from_entries(entries)?, density))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn sample_dataset() -> Dataset {
        Dataset::from_rows(&[
            [0.73, 8.84],
            [49.93, 34.44],
            [0.57, 65.04],
            [62.15, 32.29],
            [59.47, 36.04],
        ])
        .unwrap()
    }

    #[test]
    fn test_keygen_covers_dataset() {
        let dataset = sample_dataset();
        let params = OpeParams {
            proportion: 3.0,
            ..OpeParams::default()
        };

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let key = keygen(&dataset, &params, &mut rng).unwrap();
            let ms = key.message_space();
            let cs = key.cipher_space();

            assert!(ms.len() >= 1 && ms.len() <= params.max_range);
            assert_eq!(ms.ids(), cs.ids());
            assert!(ms.is_contiguous());
            assert!(cs.is_contiguous());

            // every element maps somewhere and every range holds data
            let density = ms.density(&dataset).unwrap();
            assert_eq!(density.len(), ms.len());
            assert_eq!(density.values().sum::<usize>(), dataset.len());

            let (_, first) = cs.iter().next().unwrap();
            let (_, last) = cs.iter().last().unwrap();
            assert_eq!(first.low, 0.0);
            assert_eq!(last.high, 66.0 * 3.0 + 1.0);
        }
    }

    #[test]
    fn test_cipher_widths_follow_density() {
        let dataset = sample_dataset();
        let params = OpeParams {
            proportion: 3.0,
            ..OpeParams::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let key = keygen(&dataset, &params, &mut rng).unwrap();
        let density = key.message_space().density(&dataset).unwrap();

        let max_cipher = 66.0 * 3.0;
        let ids = key.cipher_space().ids().to_vec();
        for id in &ids[..ids.len() - 1] {
            let width = key.cipher_space().get(*id).unwrap().width();
            let expected = (max_cipher * density[id] as f64 / dataset.len() as f64).round_ties_even();
            assert_eq!(width, expected);
        }
    }

    #[test]
    fn test_coalesce_closes_gaps() {
        let raw = Partition::from_boundaries(
            (0..4).map(RangeId).collect(),
            &[0.0, 10.0, 20.0, 30.0],
            40.0,
        )
        .unwrap();
        let mut raw_density = DensityMap::new();
        raw_density.insert(RangeId(1), 2);
        raw_density.insert(RangeId(3), 5);

        let (ms, density) = coalesce(&raw, &raw_density).unwrap();
        assert_eq!(ms.len(), 2);
        assert_eq!(ms.get(RangeId(0)), Some(Interval::new(10.0, 20.0)));
        assert_eq!(ms.get(RangeId(1)), Some(Interval::new(20.0, 41.0)));
        assert_eq!(density[&RangeId(0)], 2);
        assert_eq!(density[&RangeId(1)], 5);
    }

    #[test]
    fn test_coalesce_all_empty_fails() {
        let raw = Partition::from_boundaries(vec![RangeId(0)], &[0.0], 10.0).unwrap();
        assert!(matches!(
            coalesce(&raw, &DensityMap::new()),
            Err(CryptoError::KeyGeneration(_))
        ));
    }

    #[test]
    fn test_keygen_rejects_bad_params() {
        let dataset = sample_dataset();
        let mut rng = StdRng::seed_from_u64(5);
        let bad_range = OpeParams {
            max_range: 1,
            ..OpeParams::default()
        };
        assert!(matches!(
            keygen(&dataset, &bad_range, &mut rng),
            Err(CryptoError::InvalidParameter(_))
        ));
        let bad_proportion = OpeParams {
            proportion: 0.0,
            ..OpeParams::default()
        };
        assert!(keygen(&dataset, &bad_proportion, &mut rng).is_err());
        let bad_min = OpeParams {
            min_value: 100.0,
            ..OpeParams::default()
        };
        assert!(keygen(&dataset, &bad_min, &mut rng).is_err());
    }

    fn skewed_dataset(outlier: f64) -> Dataset {
        let mut rows = vec![vec![5.0]; 99];
        rows.push(vec![outlier]);
        Dataset::try_from(rows).unwrap()
    }

    #[test]
    fn test_sparse_range_rounds_to_zero_width() {
        // one element in a range is 0.3 or 0.5 of a cipher unit, which rounds to 0
        for outlier in [1.0, 9.0] {
            let dataset = skewed_dataset(outlier);
            let mut zero_width_seen = false;
            for seed in 0..100 {
                let mut rng = StdRng::seed_from_u64(seed);
                let key = keygen(&dataset, &OpeParams::default(), &mut rng).unwrap();
                let cs = key.cipher_space();
                assert!(cs.is_contiguous());

                let (_, last) = cs.iter().last().unwrap();
                assert!(last.width() > 0.0);

                let outlier_range = key.message_space().interval_of(outlier).unwrap();
                if key.message_space().interval_of(5.0).unwrap() != outlier_range {
                    assert!(cs.get(outlier_range).is_some());
                    zero_width_seen |= cs.get(outlier_range).unwrap().width() == 0.0;
                }
            }
            if outlier < 5.0 {
                assert!(zero_width_seen);
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_key_deserialization_is_validated() {
        let mut rng = StdRng::seed_from_u64(3);
        let key = keygen(&sample_dataset(), &OpeParams::default(), &mut rng).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert!(serde_json::from_str::<OpeKey>(&json).unwrap() == key);

        // cipher ids not paired with the message ids
        let unpaired = r#"{
            "message_space": {"ids": [0, 1], "intervals": [{"low": 0.0, "high": 5.0}, {"low": 5.0, "high": 10.0}]},
            "cipher_space": {"ids": [1, 0], "intervals": [{"low": 0.0, "high": 20.0}, {"low": 20.0, "high": 51.0}]}
        }"#;
        assert!(serde_json::from_str::<OpeKey>(unpaired).is_err());

        // more ids than intervals
        let short = r#"{
            "message_space": {"ids": [0, 1], "intervals": [{"low": 0.0, "high": 10.0}]},
            "cipher_space": {"ids": [1, 0], "intervals": [{"low": 0.0, "high": 51.0}]}
        }"#;
        assert!(serde_json::from_str::<OpeKey>(short).is_err());
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let mut rng = StdRng::seed_from_u64(1);
        let key = keygen(&sample_dataset(), &OpeParams::default(), &mut rng).unwrap();
        let debug_str = format!("{:?}", key);
        assert!(debug_str.contains("[REDACTED]"));
    }
}
