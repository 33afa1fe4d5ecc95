//! Field Element Encoding
//!
//! Every value handled by the mixer (secrets, nullifier hashes, commitments,
//! tree nodes) is an element of the BN254 scalar field. Outside the process
//! they travel as 32 big-endian bytes, and decoding only accepts canonical
//! encodings (strictly below the field modulus).

pub use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use thiserror::Error;

/// Size of a serialized field element
pub const FIELD_BYTES: usize = 32;

/// Errors raised while decoding field elements
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("encoding is not a canonical field element (>= modulus)")]
    OutOfRange,

    #[error("field element must be {expected} bytes, got {0}", expected = FIELD_BYTES)]
    InvalidLength(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Convert a field element to 32 bytes (big-endian)
pub fn field_to_bytes(f: &Fr) -> [u8; FIELD_BYTES] {
    let bytes = f.into_bigint().to_bytes_be();
    let mut arr = [0u8; FIELD_BYTES];
    let len = bytes.len().min(FIELD_BYTES);
    arr[FIELD_BYTES - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    arr
}

/// Decode 32 big-endian bytes, rejecting values outside the field
pub fn field_from_bytes(bytes: &[u8; FIELD_BYTES]) -> Result<Fr, FieldError> {
    let f = Fr::from_be_bytes_mod_order(bytes);
    if field_to_bytes(&f) != *bytes {
        return Err(FieldError::OutOfRange);
    }
    Ok(f)
}

/// Decode a byte slice of unknown length
pub fn field_from_slice(bytes: &[u8]) -> Result<Fr, FieldError> {
    let arr: [u8; FIELD_BYTES] = bytes
        .try_into()
        .map_err(|_| FieldError::InvalidLength(bytes.len()))?;
    field_from_bytes(&arr)
}

/// `0x`-prefixed hex of the big-endian encoding
pub fn field_to_hex(f: &Fr) -> String {
    format!("0x{}", hex::encode(field_to_bytes(f)))
}

/// Parse hex (with or without `0x`) into a canonical field element
pub fn field_from_hex(s: &str) -> Result<Fr, FieldError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| FieldError::InvalidHex(e.to_string()))?;
    field_from_slice(&bytes)
}

/// Serde adapter: a single field element as a hex string
pub mod serde_hex {
    use super::{Fr, field_from_hex, field_to_hex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(f: &Fr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&field_to_hex(f))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        field_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: a list of field elements as hex strings
pub mod serde_hex_vec {
    use super::{Fr, field_from_hex, field_to_hex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(v: &[Fr], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(v.iter().map(field_to_hex))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Fr>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| field_from_hex(s))
            .collect::<Result<_, _>>()
            .map_err(serde::de::Error::custom)
    }
}

/// Declares a public newtype over `Fr` with byte, hex and serde conversions.
macro_rules! field_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $crate::field::Fr);

        impl $name {
            /// Wrap a field element
            pub fn from_field(f: $crate::field::Fr) -> Self {
                Self(f)
            }

            /// Get the underlying field element
            pub fn to_field(&self) -> $crate::field::Fr {
                self.0
            }

            /// Canonical big-endian encoding
            pub fn to_bytes(&self) -> [u8; $crate::field::FIELD_BYTES] {
                $crate::field::field_to_bytes(&self.0)
            }

            /// Decode, rejecting non-canonical encodings
            pub fn from_bytes(
                bytes: &[u8; $crate::field::FIELD_BYTES],
            ) -> Result<Self, $crate::field::FieldError> {
                $crate::field::field_from_bytes(bytes).map(Self)
            }
        }

        impl From<$crate::field::Fr> for $name {
            fn from(f: $crate::field::Fr) -> Self {
                Self(f)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&$crate::field::field_to_hex(&self.0))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                $crate::field::serde_hex::serialize(&self.0, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                $crate::field::serde_hex::deserialize(deserializer).map(Self)
            }
        }
    };
}

pub(crate) use field_newtype;
