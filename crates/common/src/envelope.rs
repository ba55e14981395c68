//! Textual envelope stored in place of an encrypted field value.
//!
//! # Wire format
//!
//! ```text
//! Fieldseal <semver>: <base64(ciphertext)>
//! ```
//!
//! The base64 alphabet is the standard one with `=` padding and no line
//! wrapping. The whole string must match; a value with anything before the
//! header or after the payload is plaintext.

use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use semver::Version;

use crate::error::EnvelopeError;

/// Literal that opens every envelope.
pub const HEADER: &str = "Fieldseal";

/// Format version written into new envelopes.
///
/// Bump the minor version for changes old readers can still decode and the
/// major version for anything else.
pub const ENVELOPE_VERSION: Version = Version::new(1, 0, 0);

const SEMVER_PATTERN: &str = r"v?(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?";

const BASE64_PATTERN: &str =
    r"(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{4}|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{2}==)";

static ENVELOPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{HEADER} (?P<version>{SEMVER_PATTERN}): (?P<payload>{BASE64_PATTERN})$"
    ))
    .expect("envelope pattern is a valid regex")
});

/// Returns `true` if `value` is shaped like an envelope, whatever its version.
pub fn is_envelope(value: &str) -> bool {
    ENVELOPE_RE.is_match(value)
}

/// A parsed envelope borrowing its payload from the source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    version: Version,
    payload: &'a str,
}

impl<'a> Envelope<'a> {
    /// Parse `value` without checking version compatibility.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::NotAnEnvelope`] if the anchored pattern does not
    /// match and [`EnvelopeError::InvalidVersion`] if the embedded version is
    /// rejected by the semantic-version parser.
    pub fn parse(value: &'a str) -> Result<Self, EnvelopeError> {
        let caps = ENVELOPE_RE
            .captures(value)
            .ok_or(EnvelopeError::NotAnEnvelope)?;
        let (Some(version), Some(payload)) = (caps.name("version"), caps.name("payload")) else {
            return Err(EnvelopeError::NotAnEnvelope);
        };

        let raw = version.as_str();
        let version = Version::parse(raw.strip_prefix('v').unwrap_or(raw))
            .map_err(|_| EnvelopeError::InvalidVersion(raw.to_owned()))?;

        Ok(Self {
            version,
            payload: payload.as_str(),
        })
    }

    /// Parse `value` and require its version to be readable by `current`.
    ///
    /// # Errors
    ///
    /// Everything [`Envelope::parse`] returns, plus
    /// [`EnvelopeError::IncompatibleVersion`].
    pub fn open(value: &'a str, current: &Version) -> Result<Self, EnvelopeError> {
        let envelope = Self::parse(value)?;
        if !envelope.is_compatible_with(current) {
            return Err(EnvelopeError::IncompatibleVersion {
                found: envelope.version,
                current: current.clone(),
            });
        }
        Ok(envelope)
    }

    /// Format an envelope around `ciphertext`.
    pub fn seal(version: &Version, ciphertext: &[u8]) -> String {
        format!("{HEADER} {version}: {}", STANDARD.encode(ciphertext))
    }

    /// Version the envelope was written with.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Decode the base64 payload.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidPayload`] if decoding fails.
    pub fn ciphertext(&self) -> Result<Vec<u8>, EnvelopeError> {
        STANDARD
            .decode(self.payload)
            .map_err(|_| EnvelopeError::InvalidPayload)
    }

    /// Caret compatibility: same major for `1.x` and later, same major and
    /// minor below `1.0`. Pre-release and build metadata are ignored.
    pub fn is_compatible_with(&self, current: &Version) -> bool {
        if current.major == 0 {
            self.version.major == 0 && self.version.minor == current.minor
        } else {
            self.version.major == current.major
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_parse() {
        let s = Envelope::seal(&ENVELOPE_VERSION, b"\x00\x01ciphertext\xff");
        assert!(s.starts_with("Fieldseal 1.0.0: "));
        let envelope = Envelope::parse(&s).unwrap();
        assert_eq!(envelope.version(), &ENVELOPE_VERSION);
        assert_eq!(envelope.ciphertext().unwrap(), b"\x00\x01ciphertext\xff");
    }

    #[test]
    fn plaintext_is_not_an_envelope() {
        for value in ["abc123", "", "Fieldseal", "Fieldseal 1.0.0:", "Fieldseal 1.0.0: "] {
            assert!(!is_envelope(value), "{value:?}");
            assert_eq!(Envelope::parse(value), Err(EnvelopeError::NotAnEnvelope));
        }
    }

    #[test]
    fn pattern_is_anchored() {
        let s = Envelope::seal(&ENVELOPE_VERSION, b"payload");
        assert!(is_envelope(&s));
        assert!(!is_envelope(&format!(" {s}")));
        assert!(!is_envelope(&format!("{s}\n")));
        assert!(!is_envelope(&format!("prefix\n{s}")));
    }

    #[test]
    fn unpadded_or_wrapped_base64_rejected() {
        assert!(!is_envelope("Fieldseal 1.0.0: YWJj ZA=="));
        assert!(!is_envelope("Fieldseal 1.0.0: YWJjZA"));
        assert!(is_envelope("Fieldseal 1.0.0: YWJjZA=="));
    }

    #[test]
    fn header_must_match_exactly() {
        assert!(!is_envelope("fieldseal 1.0.0: YWJjZA=="));
        assert!(!is_envelope("Cryptonite 1.0.0: YWJjZA=="));
    }

    #[test]
    fn accepts_prerelease_build_and_v_prefix() {
        let e = Envelope::parse("Fieldseal v1.2.3-rc.1+build.5: YWJjZA==").unwrap();
        assert_eq!(e.version().major, 1);
        assert_eq!(e.version().minor, 2);
        assert!(e.is_compatible_with(&ENVELOPE_VERSION));
    }

    #[test]
    fn minor_bump_is_compatible() {
        let old = Envelope::seal(&Version::new(1, 0, 0), b"x");
        let current = Version::new(1, 1, 0);
        assert!(Envelope::open(&old, &current).is_ok());
    }

    #[test]
    fn major_bump_is_incompatible() {
        let future = Envelope::seal(&Version::new(2, 0, 0), b"x");
        let err = Envelope::open(&future, &ENVELOPE_VERSION).unwrap_err();
        assert!(matches!(err, EnvelopeError::IncompatibleVersion { .. }));
    }

    #[test]
    fn pre_one_versions_compare_minor() {
        let current = Version::new(0, 3, 1);
        let same_minor = Envelope::parse("Fieldseal 0.3.0: YWJjZA==").unwrap();
        let other_minor = Envelope::parse("Fieldseal 0.2.9: YWJjZA==").unwrap();
        assert!(same_minor.is_compatible_with(&current));
        assert!(!other_minor.is_compatible_with(&current));
    }

    #[test]
    fn leading_zero_prerelease_is_invalid_version() {
        let err = Envelope::parse("Fieldseal 1.0.0-01: YWJjZA==").unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidVersion(_)));
    }
}
