use crate::error::{CryptoError, Result};

/// A rectangular matrix of finite reals used to calibrate an OPE key.
///
/// Element count (`rows × cols`) is the density normalizer during key
/// generation, so irregular row lengths are rejected up front.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Dataset {
    /// Builds a dataset from row slices.
    ///
    /// # Errors
    /// Returns a validation error if there are no rows, no columns, rows of
    /// differing length, or non-finite values.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| CryptoError::Validation("dataset must have at least one row".to_string()))?;
        let cols = first.as_ref().len();
        if cols == 0 {
            return Err(CryptoError::Validation(
                "dataset rows must have at least one column".to_string(),
            ));
        }

        let mut values = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(CryptoError::Validation(format!(
                    "dataset is not rectangular: row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            if let Some(bad) = row.iter().find(|x| !x.is_finite()) {
                return Err(CryptoError::Validation(format!(
                    "dataset row {} contains non-finite value {}",
                    i, bad
                )));
            }
            values.extend_from_slice(row);
        }

        Ok(Dataset {
            rows: rows.len(),
            cols,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of elements (`rows × cols`).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest absolute value in the dataset.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
    }

    /// Iterates over every element in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i < self.rows {
            Some(&self.values[i * self.cols..(i + 1) * self.cols])
        } else {
            None
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for Dataset {
    type Error = CryptoError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Dataset::from_rows(&rows)
    }
}
