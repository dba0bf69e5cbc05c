//! Symmetric homomorphic scheme over the reals (Liu's scheme).
//!
//! A scalar is encrypted into `m ≥ 3` reals under a key of `m` triples. Sums,
//! differences and plaintext multiples of ciphertexts decrypt to the matching
//! plaintext results; the product of two ciphertexts is an `m²`-component
//! value opened with [`decrypt_product`].

pub mod algebra;
pub mod decryption;
pub mod encryption;
pub mod setup;

pub use algebra::{add, add_vector, decrypt_product, multiply, multiply_c, subtract, ProductCiphertext};
pub use decryption::{decrypt_matrix, decrypt_scalar, decrypt_vector};
pub use encryption::{encrypt_matrix, encrypt_scalar, encrypt_vector, par_encrypt_matrix, Ciphertext, Plaintext, MAX_EXACT_INTEGER};
pub use setup::{KeyTriple, SecretKey, DEFAULT_M, MAX_TRIPLE_ATTEMPTS, MIN_M};
