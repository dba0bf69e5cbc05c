//! Contiguous range partitions of the message and cipher spaces.

use std::collections::BTreeMap;
use std::fmt;

use rand::{seq::index, Rng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};
use crate::ope::Dataset;

/// Stable, order-significant identifier of a partition interval.
///
/// Displays as `RANGE_{index}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RangeId(pub usize);

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RANGE_{}", self.0)
    }
}

/// Half-open real range `[low, high)`.
#[derive(Clone, Copy, Debug, PartialEq, Zeroize)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    pub fn new(low: f64, high: f64) -> Self {
        Interval { low, high }
    }

    pub fn contains(&self, x: f64) -> bool {
        self.low <= x && x < self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Count of dataset elements per interval. Intervals holding no element are absent.
pub type DensityMap = BTreeMap<RangeId, usize>;

/// Ordered mapping from [`RangeId`] to [`Interval`].
///
/// Deserialization goes through the same checks as [`Partition::from_entries`].
#[derive(Clone, Debug, Default, PartialEq, Zeroize)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "PartitionRepr", into = "PartitionRepr")
)]
pub struct Partition {
    ids: Vec<RangeId>,
    intervals: Vec<Interval>,
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct PartitionRepr {
    ids: Vec<RangeId>,
    intervals: Vec<Interval>,
}

#[cfg(feature = "serde")]
impl TryFrom<PartitionRepr> for Partition {
    type Error = CryptoError;

    fn try_from(repr: PartitionRepr) -> Result<Self> {
        Partition::checked(repr.ids, repr.intervals)
    }
}

#[cfg(feature = "serde")]
impl From<Partition> for PartitionRepr {
    fn from(partition: Partition) -> Self {
        PartitionRepr {
            ids: partition.ids,
            intervals: partition.intervals,
        }
    }
}

impl Partition {
    /// Splits `[min, max]` into `n` intervals at random integer boundaries.
    ///
    /// The `n - 1` interior boundaries are distinct integers drawn from
    /// `[max(2, floor(min) + 1), floor(max)]`. Intervals are keyed
    /// `RANGE_0 … RANGE_{n-1}` in ascending order and the last one ends at
    /// `max + 1` so that `max` itself is covered. When the draw range holds
    /// fewer than `n - 1` integers, `n` shrinks to what fits.
    ///
    /// # Errors
    /// Returns an error if `n` is zero or the bounds are not finite with `min < max`.
    pub fn generate<R: Rng + ?Sized>(min: f64, max: f64, n: usize, rng: &mut R) -> Result<Self> {
        if n == 0 {
            return Err(CryptoError::InvalidParameter(
                "number of ranges must be at least 1".to_string(),
            ));
        }
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(CryptoError::InvalidParameter(format!(
                "range bounds must be finite with min < max, got [{}, {}]",
                min, max
            )));
        }

        let lower = (min.floor() + 1.0).max(2.0) as i64;
        let upper = max.floor() as i64;
        let available = if upper >= lower { (upper - lower + 1) as usize } else { 0 };
        let interior = (n - 1).min(available);
        if interior < n - 1 {
            debug!(requested = n, granted = interior + 1, "not enough integer boundaries, shrinking range count");
        }

        let mut cuts: Vec<f64> = index::sample(rng, available, interior)
            .into_iter()
            .map(|offset| (lower + offset as i64) as f64)
            .collect();
        cuts.sort_by(f64::total_cmp);

        let mut boundaries = Vec::with_capacity(interior + 1);
        boundaries.push(min);
        boundaries.extend(cuts);

        let ids = (0..boundaries.len()).map(RangeId).collect();
        Partition::from_boundaries(ids, &boundaries, max)
    }

    /// Builds a partition from explicit lower boundaries.
    ///
    /// Interval `i` is `[boundaries[i], boundaries[i + 1])`, except the last,
    /// which is `[boundaries[k - 1], max + 1)`. Extra trailing boundaries are
    /// ignored. Repeated boundaries give zero-width intervals, which hold no
    /// value.
    ///
    /// # Errors
    /// Returns a validation error if there are fewer boundaries than ids, or if
    /// any resulting interval is inverted.
    pub fn from_boundaries(ids: Vec<RangeId>, boundaries: &[f64], max: f64) -> Result<Self> {
        let k = ids.len();
        if k == 0 {
            return Err(CryptoError::Validation("partition needs at least one range".to_string()));
        }
        if boundaries.len() < k {
            return Err(CryptoError::Validation(format!(
                "{} boundaries supplied for {} ranges",
                boundaries.len(),
                k
            )));
        }

        let intervals = (0..k)
            .map(|i| {
                let high = if i == k - 1 { max + 1.0 } else { boundaries[i + 1] };
                Interval::new(boundaries[i], high)
            })
            .collect();
        Partition::checked(ids, intervals)
    }

    /// Pairs ids with intervals as given.
    ///
    /// # Errors
    /// Returns a validation error for duplicate ids, non-finite bounds or an
    /// inverted interval.
    pub fn from_entries(entries: Vec<(RangeId, Interval)>) -> Result<Self> {
        let (ids, intervals) = entries.into_iter().unzip();
        Partition::checked(ids, intervals)
    }

    fn checked(ids: Vec<RangeId>, intervals: Vec<Interval>) -> Result<Self> {
        if ids.len() != intervals.len() {
            return Err(CryptoError::Validation(format!(
                "{} range ids for {} intervals",
                ids.len(),
                intervals.len()
            )));
        }
        let mut seen = ids.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != ids.len() {
            return Err(CryptoError::Validation("duplicate range id in partition".to_string()));
        }
        for (id, interval) in ids.iter().zip(&intervals) {
            if !interval.low.is_finite() || !interval.high.is_finite() || interval.high < interval.low {
                return Err(CryptoError::Validation(format!(
                    "{} is not a valid interval: [{}, {})",
                    id, interval.low, interval.high
                )));
            }
        }
        Ok(Partition { ids, intervals })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[RangeId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (RangeId, Interval)> + '_ {
        self.ids.iter().copied().zip(self.intervals.iter().copied())
    }

    pub fn get(&self, id: RangeId) -> Option<Interval> {
        self.ids
            .iter()
            .position(|candidate| *candidate == id)
            .and_then(|i| self.intervals.get(i).copied())
    }

    /// Like [`Partition::get`], but a missing id is an error.
    pub fn boundary(&self, id: RangeId) -> Result<Interval> {
        self.get(id)
            .ok_or_else(|| CryptoError::Validation(format!("{} is not part of this partition", id)))
    }

    /// Returns the first interval with `low ≤ |value| < high`.
    ///
    /// # Errors
    /// Returns [`CryptoError::Domain`] when no interval contains `|value|`.
    pub fn interval_of(&self, value: f64) -> Result<RangeId> {
        let magnitude = value.abs();
        self.iter()
            .find(|(_, interval)| interval.contains(magnitude))
            .map(|(id, _)| id)
            .ok_or(CryptoError::Domain { value })
    }

    /// Counts how many dataset elements fall in each interval.
    ///
    /// # Errors
    /// Fails on the first element whose magnitude is outside every interval.
    pub fn density(&self, dataset: &Dataset) -> Result<DensityMap> {
        let mut density = DensityMap::new();
        for value in dataset.iter() {
            *density.entry(self.interval_of(value)?).or_insert(0) += 1;
        }
        Ok(density)
    }

    /// True when every interval starts where the previous one ended.
    pub fn is_contiguous(&self) -> bool {
        self.intervals.windows(2).all(|pair| pair[0].high == pair[1].low)
    }
}
