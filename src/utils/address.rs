//! Account and contract identifiers.
//!
//! An [`Address`] is a 20-byte identifier for users, the engine's custody
//! account and token contracts. [`AssetId`] and [`FeedId`] wrap an address so
//! collateral assets and price feeds cannot be mixed up with accounts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::ADDRESS_LENGTH;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 20-byte account or contract identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null address
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    /// Create an address from bytes
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create an address from a slice (must be exactly 20 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != ADDRESS_LENGTH {
            return Err(Error::InvalidParameter {
                name: "address".into(),
                reason: format!("expected {} bytes, got {}", ADDRESS_LENGTH, slice.len()),
            });
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Parse from hex, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| Error::InvalidParameter {
            name: "address".into(),
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes)
    }

    /// Derive a deterministic address from a human-readable label
    ///
    /// Takes the last 20 bytes of `sha256(label)`.
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Get the address as bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Check if this is the null address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Lowercase hex with `0x` prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short form for logs (`0x1234…abcd`)
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPED IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! address_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Address);

        impl $name {
            /// The null identifier
            pub const ZERO: Self = Self(Address::ZERO);

            /// Derive a deterministic identifier from a label
            pub fn from_label(label: &str) -> Self {
                Self(Address::from_label(label))
            }

            /// Underlying address
            pub fn address(&self) -> Address {
                self.0
            }

            /// Check if this is the null identifier
            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }
        }

        impl From<Address> for $name {
            fn from(address: Address) -> Self {
                Self(address)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Address::from_hex(s).map(Self)
            }
        }
    };
}

address_newtype!(
    /// Identifier of a collateral asset (its token contract address)
    AssetId
);

address_newtype!(
    /// Identifier of a USD price feed (its aggregator address)
    FeedId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let address = Address::from_label("alice");
        let parsed = Address::from_hex(&address.to_hex()).unwrap();
        assert_eq!(address, parsed);
        assert!(address.to_hex().starts_with("0x"));
        assert_eq!(address.to_hex().len(), 2 + 2 * ADDRESS_LENGTH);
    }

    #[test]
    fn test_from_label_deterministic() {
        assert_eq!(Address::from_label("bob"), Address::from_label("bob"));
        assert_ne!(Address::from_label("bob"), Address::from_label("carol"));
        assert!(!Address::from_label("bob").is_zero());
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Address::from_hex("0x1234").is_err());
        assert!(Address::from_hex("zz").is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let asset = AssetId::from_label("weth");
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(json, format!("\"{}\"", asset.address().to_hex()));
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }

    #[test]
    fn test_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(AssetId::ZERO.is_zero());
        assert!(FeedId::default().is_zero());
    }
}
