use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

pub const PUBLIC_KEY_BYTES_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq)]
pub enum PublicKeyBytesError {
    InvalidLength { expected: usize, got: usize },
    InvalidHex(hex::FromHexError),
}

impl fmt::Display for PublicKeyBytesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A compressed BLS public key in serialized form.
///
/// The monitor never verifies signatures, so the bytes are not decompressed or checked to lie
/// on the curve. Two keys are equal iff their serializations are equal, which is exactly the
/// identity the validator registry uses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_BYTES_LEN]);

impl PublicKeyBytes {
    pub fn empty() -> Self {
        Self([0; PUBLIC_KEY_BYTES_LEN])
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, PublicKeyBytesError> {
        let array: [u8; PUBLIC_KEY_BYTES_LEN] =
            bytes
                .try_into()
                .map_err(|_| PublicKeyBytesError::InvalidLength {
                    expected: PUBLIC_KEY_BYTES_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(array))
    }

    pub fn serialize(&self) -> [u8; PUBLIC_KEY_BYTES_LEN] {
        self.0
    }

    pub fn as_serialized(&self) -> &[u8] {
        &self.0
    }

    pub fn as_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; PUBLIC_KEY_BYTES_LEN]> for PublicKeyBytes {
    fn from(bytes: [u8; PUBLIC_KEY_BYTES_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for PublicKeyBytes {
    type Err = PublicKeyBytesError;

    /// Parse a hex string, with or without the `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped).map_err(PublicKeyBytesError::InvalidHex)?;
        Self::deserialize(&bytes)
    }
}

impl fmt::Display for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex_string())
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex_string())
    }
}

impl Serialize for PublicKeyBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_hex_string())
    }
}

impl<'de> Deserialize<'de> for PublicKeyBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        PublicKeyBytes::from_str(&s)
            .map_err(|e| de::Error::custom(format!("invalid public key {}: {}", s, e)))
    }
}
