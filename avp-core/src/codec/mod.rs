//! Wire codec for the line-delimited JSON protocol.
//!
//! The decoder is a tolerant reader: it extracts the fields it knows about,
//! ignores everything else, and enforces per-field type and length
//! constraints so handlers never see malformed input. The encoder is a
//! strict writer: each operation has one response shape with a fixed field
//! order, so output is byte-stable across calls.

mod decode;
mod encode;

pub use decode::{Command, CodecError, Opcode, decode_command};
pub use encode::{INTERNAL_FAILURE_LINE, Response, encode_response};

use alloc::borrow::ToOwned;
use alloc::string::String;
use core::ops::Deref;
use zeroize::Zeroizing;

/// Wrapper around sensitive strings that zeroize their memory on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

impl Deref for SecretString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl serde::Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}
