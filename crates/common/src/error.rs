//! Errors raised while recognising or opening an envelope string.

use semver::Version;
use thiserror::Error;

/// Envelope grammar and version errors.
///
/// None of the variants carry the inspected value: it may be plaintext.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The value does not match the anchored envelope pattern.
    #[error("value is not an envelope")]
    NotAnEnvelope,

    /// The embedded version matched the grammar but is not a valid semantic version.
    #[error("envelope version is not a valid semantic version: {0}")]
    InvalidVersion(String),

    /// The envelope was written by an incompatible format version.
    #[error("envelope version {found} is not compatible with {current}")]
    IncompatibleVersion {
        /// Version embedded in the envelope.
        found: Version,
        /// Version of the reader.
        current: Version,
    },

    /// The payload could not be base64-decoded.
    #[error("envelope payload is not valid base64")]
    InvalidPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_versions() {
        let e = EnvelopeError::IncompatibleVersion {
            found: Version::new(2, 0, 0),
            current: Version::new(1, 4, 0),
        };
        let msg = e.to_string();
        assert!(msg.contains("2.0.0"));
        assert!(msg.contains("1.4.0"));
    }

    #[test]
    fn display_never_echoes_input() {
        assert_eq!(EnvelopeError::NotAnEnvelope.to_string(), "value is not an envelope");
    }
}
