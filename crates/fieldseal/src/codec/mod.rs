//! RSA envelope codec for individual field values.
//!
//! This module has no storage dependencies. It provides the encrypt/decrypt
//! operations used by attribute declarations and the migration processor.
//!
//! # Ciphertext format
//!
//! ```text
//! Fieldseal <semver>: <base64(rsa(plaintext))>
//! ```
//!
//! The version lets readers detect future format changes without breaking old
//! data; see [`common::envelope`].

pub mod cipher;

pub use cipher::{Codec, Padding, ParsePaddingError};
