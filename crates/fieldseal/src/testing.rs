//! Shared test fixtures.

pub(crate) mod fixtures {
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::RsaPrivateKey;

    use crate::keys::{KeyHandle, KeyMaterial};

    pub const PRIVATE_PEM: &str = include_str!("../tests/fixtures/private.pem");
    pub const PRIVATE_PKCS1_PEM: &str = include_str!("../tests/fixtures/private_pkcs1.pem");
    pub const PRIVATE_ENCRYPTED_PEM: &str = include_str!("../tests/fixtures/private_encrypted.pem");
    pub const PUBLIC_PEM: &str = include_str!("../tests/fixtures/public.pem");
    pub const PUBLIC_DER: &[u8] = include_bytes!("../tests/fixtures/public.der");
    pub const OTHER_PRIVATE_PEM: &str = include_str!("../tests/fixtures/other_private.pem");

    /// Password of [`PRIVATE_ENCRYPTED_PEM`].
    pub const PASSWORD: &str = "open-sesame";

    pub fn key_pair() -> KeyHandle {
        KeyHandle::from_private(RsaPrivateKey::from_pkcs8_pem(PRIVATE_PEM).unwrap())
    }

    pub fn other_key_pair() -> KeyHandle {
        KeyHandle::from_private(RsaPrivateKey::from_pkcs8_pem(OTHER_PRIVATE_PEM).unwrap())
    }

    pub fn public_handle() -> KeyHandle {
        KeyHandle::from(KeyMaterial::from_pem(PUBLIC_PEM, None).unwrap())
    }
}
