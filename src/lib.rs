//! Secure Clustering Crypto
//!
//! Client-side cryptography for outsourced clustering of sensitive datasets.
//!
//! ## Overview
//!
//! Two independent schemes are provided:
//!
//! - **FDH-OPE** ([`ope`]): a frequency-hiding, order-preserving scheme. The
//!   message space is partitioned into ranges, each range is mapped to a cipher
//!   range whose width follows the data density, and values are encrypted by
//!   linear interpolation plus bounded noise. Ciphertexts keep the order of
//!   plaintexts across ranges, so a server can cluster them directly.
//! - **Liu's scheme** ([`homomorphic`]): a symmetric scheme over the reals that
//!   supports addition, subtraction, multiplication by a plaintext and the
//!   product of two ciphertexts.
//!
//! With the `distributed` feature the crate also ships a client for the
//! object storage service and the worker specifications used to dispatch
//! clustering jobs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use secure_clustering_crypto::homomorphic::{self, SecretKey, DEFAULT_M};
//! use secure_clustering_crypto::ope::{self, Dataset, OpeParams};
//!
//! let mut rng = rand::rng();
//!
//! // Order-preserving encryption of a dataset
//! let rows = vec![vec![1.0, 10.0], vec![25.0, 66.0]];
//! let dataset = Dataset::from_rows(&rows).unwrap();
//! let key = ope::keygen(&dataset, &OpeParams::default(), &mut rng).unwrap();
//! let encrypted = ope::encrypt_matrix(&rows, &key, ope::DEFAULT_SENSITIVITY, &mut rng).unwrap();
//! assert_eq!(encrypted.len(), 2);
//!
//! // Homomorphic product of two integers
//! let sk = SecretKey::generate(DEFAULT_M, &mut rng).unwrap();
//! let a = homomorphic::encrypt_scalar(6, &sk, &mut rng);
//! let b = homomorphic::encrypt_scalar(7, &sk, &mut rng);
//! let product = homomorphic::multiply(&a, &b).unwrap();
//! let value = homomorphic::decrypt_product(&product, &sk).unwrap();
//! println!("6 x 7 = {}", value);
//! ```

pub mod error;
pub mod homomorphic;
pub mod ope;
pub mod utils;

#[cfg(feature = "distributed")]
pub mod storage;
#[cfg(feature = "distributed")]
pub mod worker;

pub use error::{CryptoError, Result};
