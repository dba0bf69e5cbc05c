//! Frequency-concealing, distribution-aware order-preserving encryption (FDH-OPE).
//!
//! Key generation partitions the message space into ranges drawn at random,
//! keeps the ranges that actually hold data, and gives each one a cipher-space
//! range whose width grows with the amount of data it holds. Encryption is a
//! per-range affine map plus bounded noise. The scheme is one-directional:
//! ciphertexts are compared, never decrypted.

pub mod dataset;
pub mod encryption;
pub mod keygen;
pub mod partition;

pub use dataset::Dataset;
pub use encryption::{encrypt, encrypt_matrix, encrypt_vector, par_encrypt_matrix, DEFAULT_SENSITIVITY};
pub use keygen::{keygen, OpeKey, OpeParams};
pub use partition::{DensityMap, Interval, Partition, RangeId};
