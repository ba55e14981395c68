//! Envelope wire format and shared errors for `fieldseal` crates.
//!
//! Nothing in this crate performs cryptography: it only knows how an encrypted
//! field value is laid out as text and how to tell it apart from plaintext.

pub mod envelope;
pub mod error;

pub use envelope::{is_envelope, Envelope, ENVELOPE_VERSION, HEADER};
pub use error::EnvelopeError;
