//! # Asset Model
//!
//! Every value stream the vault accounts for is an [`Asset`]: either the
//! host chain's native currency or a specific fungible token identified by
//! a stable [`TokenId`]. The accounting algorithm is identical for both --
//! the tagged variant exists so that per-asset ledger state can live in a
//! single map keyed by the tag, instead of duplicating the engine per kind.
//!
//! Token IDs are deterministic BLAKE3 hashes of the token's canonical
//! properties (name, symbol, issuer). The same token always gets the same
//! ID regardless of when or where it's registered -- no registry needed,
//! no coordination required.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// A unique, content-addressed identifier for a fungible token.
///
/// Computed as `BLAKE3(name || symbol || issuer)` with separator bytes.
/// Two tokens with identical properties always produce the same ID, making
/// this a natural deduplication key across vaults.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId([u8; 32]);

impl TokenId {
    /// Creates a `TokenId` from a raw 32-byte hash.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded token ID.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded token ID.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Derives a `TokenId` from the canonical token properties.
    ///
    /// The hash input is `name`, `symbol`, and `issuer` (UTF-8 bytes),
    /// joined by `0x00` separators so one field's suffix can never be
    /// confused with another field's prefix.
    pub fn derive(name: &str, symbol: &str, issuer: &str) -> Self {
        let mut preimage = Vec::with_capacity(name.len() + symbol.len() + issuer.len() + 2);
        preimage.extend_from_slice(name.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(symbol.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(issuer.as_bytes());

        Self(*blake3::hash(&preimage).as_bytes())
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// An asset the vault can hold and distribute.
///
/// Each asset has fully independent accounting: no value or entitlement is
/// ever shared across assets. `Asset` is `Copy` and hashable so it can key
/// the per-asset ledger maps directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The host chain's native currency.
    Native,

    /// A specific fungible token, identified by its content-addressed ID.
    Token(TokenId),
}

impl Asset {
    /// Returns the canonical string key for this asset.
    ///
    /// `"native"` for the native currency, `"token:<hex>"` for tokens.
    /// Used as the map key in serialized ledger state and accepted back
    /// by [`Asset::from_key`].
    pub fn to_key(&self) -> String {
        match self {
            Asset::Native => "native".to_string(),
            Asset::Token(id) => format!("token:{}", id.to_hex()),
        }
    }

    /// Parses the canonical string key produced by [`Asset::to_key`].
    pub fn from_key(key: &str) -> Result<Self, AssetKeyError> {
        if key == "native" {
            return Ok(Asset::Native);
        }
        match key.strip_prefix("token:") {
            Some(hex_id) => TokenId::from_hex(hex_id)
                .map(Asset::Token)
                .map_err(|_| AssetKeyError::new(key)),
            None => Err(AssetKeyError::new(key)),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(id) => write!(f, "token:{}", id),
        }
    }
}

/// A string key that is neither `"native"` nor a valid `"token:<hex>"`.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized asset key: {key}")]
pub struct AssetKeyError {
    key: String,
}

impl AssetKeyError {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helper: serialize HashMap<Asset, V> with string keys
// ---------------------------------------------------------------------------

/// Serde helper module for serializing/deserializing `HashMap<Asset, V>`
/// as a JSON object with string keys.
///
/// JSON requires map keys to be strings, but `Asset` is an enum that serde
/// would serialize as a nested structure. This module converts keys to/from
/// the canonical [`Asset::to_key`] form so ledger state serializes as a
/// flat, readable object.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct MyStruct {
///     #[serde(with = "crate::asset::asset_map")]
///     totals: HashMap<Asset, SomeValue>,
/// }
/// ```
pub mod asset_map {
    use super::Asset;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<V, S>(map: &HashMap<Asset, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        V: Serialize,
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut ser_map = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            ser_map.serialize_entry(&key.to_key(), value)?;
        }
        ser_map.end()
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<HashMap<Asset, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let string_map: HashMap<String, V> = HashMap::deserialize(deserializer)?;
        string_map
            .into_iter()
            .map(|(key, value)| {
                Asset::from_key(&key)
                    .map(|asset| (asset, value))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Well-known assets
// ---------------------------------------------------------------------------

/// Issuer address used for vault-internal demo tokens.
const DEMO_ISSUER: &str = "vault:0000000000000000000000000000000000000000";

/// The demo fungible token used by the CLI harness and the scenario tests.
///
/// Stands in for "the one ERC-20-like token" the vault is configured with.
pub fn demo_token() -> Asset {
    Asset::Token(TokenId::derive("Vault Demo Token", "VDT", DEMO_ISSUER))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn token_id_derivation_is_deterministic() {
        let id1 = TokenId::derive("Test", "TST", "vault:issuer");
        let id2 = TokenId::derive("Test", "TST", "vault:issuer");
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_properties_produce_different_ids() {
        let base = TokenId::derive("Token", "TKN", "vault:alice");
        assert_ne!(base, TokenId::derive("Other", "TKN", "vault:alice"));
        assert_ne!(base, TokenId::derive("Token", "OTH", "vault:alice"));
        assert_ne!(base, TokenId::derive("Token", "TKN", "vault:bob"));
    }

    #[test]
    fn separator_prevents_field_ambiguity() {
        // "ab" + "c" must not collide with "a" + "bc".
        let id1 = TokenId::derive("ab", "c", "issuer");
        let id2 = TokenId::derive("a", "bc", "issuer");
        assert_ne!(id1, id2);
    }

    #[test]
    fn token_id_hex_roundtrip() {
        let id = TokenId::derive("Test", "TST", "vault:issuer");
        let recovered = TokenId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(TokenId::from_hex("abcd").is_err());
    }

    #[test]
    fn asset_key_roundtrip() {
        let native = Asset::Native;
        let token = demo_token();

        assert_eq!(Asset::from_key(&native.to_key()).unwrap(), native);
        assert_eq!(Asset::from_key(&token.to_key()).unwrap(), token);
    }

    #[test]
    fn asset_key_rejects_garbage() {
        assert!(Asset::from_key("ether").is_err());
        assert!(Asset::from_key("token:nothex").is_err());
        assert!(Asset::from_key("").is_err());
    }

    #[test]
    fn native_and_token_are_distinct_keys() {
        let mut map: HashMap<Asset, u64> = HashMap::new();
        map.insert(Asset::Native, 1);
        map.insert(demo_token(), 2);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn asset_map_serde_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "crate::asset::asset_map")]
            totals: HashMap<Asset, u64>,
        }

        let mut totals = HashMap::new();
        totals.insert(Asset::Native, 100);
        totals.insert(demo_token(), 250);

        let json = serde_json::to_string(&Wrapper { totals }).expect("serialize");
        let recovered: Wrapper = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.totals.get(&Asset::Native), Some(&100));
        assert_eq!(recovered.totals.get(&demo_token()), Some(&250));
    }

    #[test]
    fn demo_token_is_stable() {
        assert_eq!(demo_token(), demo_token());
        assert_ne!(demo_token(), Asset::Native);
    }
}
