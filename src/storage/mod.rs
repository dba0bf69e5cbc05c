//! Client for the binary-socket object store used to persist encrypted matrices.
//!
//! Objects are opaque byte blobs addressed by id. Matrices are stored as
//! row-major little-endian `f64` bytes tagged with their dtype and shape, and
//! every retrieved payload is checked against the SHA-256 digest kept in its
//! metadata.

pub mod client;
pub mod protocol;

pub use client::{StorageClient, StorageConfig};
pub use protocol::{Command, GetParameters, GetResponse, ObjectMetadata, PutParameters, MAX_FRAME_SIZE};
