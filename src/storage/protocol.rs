//! Wire format of the object storage service.
//!
//! ```text
//! request:  [cmd: u8][params_len: u64 BE][params: JSON][payload (PUT only)]
//! response: [resp_len: u64 BE][resp: JSON][payload (GET only)]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{CryptoError, Result};

/// Maximum frame or payload size accepted from the wire (256MB)
pub const MAX_FRAME_SIZE: u64 = 256 * 1024 * 1024;

/// Element type tag of matrices written by [`matrix_to_bytes`].
pub const MATRIX_DTYPE: &str = "float64";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Put = 1,
    Get = 2,
}

impl Command {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(Command::Put),
            2 => Ok(Command::Get),
            other => Err(CryptoError::Protocol(format!("unknown command byte {}", other))),
        }
    }
}

/// Parameter block of a PUT request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PutParameters {
    pub id: String,
    pub size: u64,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Parameter block of a GET request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetParameters {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl GetParameters {
    pub fn new(id: impl Into<String>) -> Self {
        GetParameters {
            id: id.into(),
            from: None,
        }
    }
}

/// Metadata the store keeps for every object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub id: String,
    pub size: u64,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub metadata: ObjectMetadata,
}

fn check_size(len: u64) -> Result<usize> {
    if len > MAX_FRAME_SIZE {
        return Err(CryptoError::Protocol(format!(
            "frame too large: {} bytes (max {})",
            len, MAX_FRAME_SIZE
        )));
    }
    usize::try_from(len).map_err(|_| CryptoError::Protocol(format!("frame size {} does not fit in memory", len)))
}

/// Writes a length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<()> {
    let len = data.len() as u64;
    check_size(len)?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    Ok(())
}

/// Reads a length-prefixed frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 8];
    reader.read_exact(&mut len_bytes).await?;
    read_payload(reader, u64::from_be_bytes(len_bytes)).await
}

/// Reads exactly `size` payload bytes.
pub async fn read_payload<R: AsyncRead + Unpin>(reader: &mut R, size: u64) -> Result<Vec<u8>> {
    let len = check_size(size)?;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Fails with [`CryptoError::Integrity`] when `bytes` do not hash to `expected`.
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<()> {
    let actual = checksum(bytes);
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(CryptoError::Integrity {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Row-major little-endian `f64` bytes of a rectangular matrix, with its shape.
pub fn matrix_to_bytes<Row: AsRef<[f64]>>(rows: &[Row]) -> Result<(Vec<u8>, (usize, usize))> {
    let cols = rows.first().map_or(0, |row| row.as_ref().len());
    let mut bytes = Vec::with_capacity(rows.len() * cols * 8);
    for (i, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != cols {
            return Err(CryptoError::Validation(format!(
                "matrix is not rectangular: row {} has {} columns, expected {}",
                i,
                row.len(),
                cols
            )));
        }
        for value in row {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    Ok((bytes, (rows.len(), cols)))
}

/// Inverse of [`matrix_to_bytes`].
pub fn matrix_from_bytes(bytes: &[u8], shape: (usize, usize)) -> Result<Vec<Vec<f64>>> {
    let (rows, cols) = shape;
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(8))
        .ok_or_else(|| CryptoError::Validation(format!("shape ({}, {}) overflows", rows, cols)))?;
    if bytes.len() != expected {
        return Err(CryptoError::Validation(format!(
            "payload of {} bytes does not match shape ({}, {})",
            bytes.len(),
            rows,
            cols
        )));
    }
    if cols == 0 {
        return Ok(vec![Vec::new(); rows]);
    }

    let values: Vec<f64> = bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect();
    Ok(values.chunks(cols).map(<[f64]>::to_vec).collect())
}

/// `"(rows, cols)"`.
pub fn format_shape(shape: (usize, usize)) -> String {
    format!("({}, {})", shape.0, shape.1)
}

/// Parses a two-dimensional shape tag such as `"(3, 4)"`.
pub fn parse_shape(tag: &str) -> Result<(usize, usize)> {
    let invalid = || CryptoError::Validation(format!("invalid matrix shape tag {:?}", tag));
    let inner = tag
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(invalid)?;
    let dims = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| invalid()))
        .collect::<Result<Vec<usize>>>()?;
    match dims.as_slice() {
        [rows, cols] => Ok((*rows, *cols)),
        _ => Err(invalid()),
    }
}
