//! Core chain types
//!
//! This module defines the values that cross the wallet boundary:
//! - `Address`: 20-byte account or contract address (EIP-55 aware)
//! - `ChainId`: network identifier
//! - `TxHash`: transaction hash
//! - `Proposal` and `ProposalCreated`: governance registry records
//! - `Log` and `TransactionReceipt`: decoded JSON-RPC results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Keccak-256 digest as used by the EVM
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Errors produced when parsing hex wire values
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing 0x prefix")]
    MissingPrefix,

    #[error("expected {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("address checksum mismatch")]
    BadChecksum,

    #[error("quantity out of range: {0}")]
    Overflow(String),
}

fn strip_prefix(s: &str) -> Result<&str, ParseError> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(ParseError::MissingPrefix)
}

/// Parse a JSON-RPC hex quantity (`0x1a`)
pub fn parse_quantity(s: &str) -> Result<u64, ParseError> {
    let digits = strip_prefix(s)?;
    if digits.is_empty() {
        return Err(ParseError::InvalidHex(s.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|e| {
        if digits.chars().all(|c| c.is_ascii_hexdigit()) {
            ParseError::Overflow(s.to_string())
        } else {
            ParseError::InvalidHex(e.to_string())
        }
    })
}

/// Format a value as a JSON-RPC hex quantity
pub fn to_quantity(value: u64) -> String {
    format!("{:#x}", value)
}

/// Parse JSON-RPC unformatted data (`0x` + even number of hex digits)
pub fn parse_data(s: &str) -> Result<Vec<u8>, ParseError> {
    let digits = strip_prefix(s)?;
    hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))
}

/// Format bytes as JSON-RPC unformatted data
pub fn to_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a 32-byte word (topics, hashes)
pub fn parse_word(s: &str) -> Result<[u8; 32], ParseError> {
    let digits = strip_prefix(s)?;
    if digits.len() != 64 {
        return Err(ParseError::InvalidLength {
            expected: 64,
            actual: digits.len(),
        });
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    Ok(out)
}

// ============================================
// Address
// ============================================

/// A 20-byte EVM address
///
/// Parsing accepts all-lowercase or all-uppercase hex; mixed case must
/// match the EIP-55 checksum. Display always uses the checksum form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Build from a 20-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| ParseError::InvalidLength {
            expected: 40,
            actual: bytes.len() * 2,
        })?;
        Ok(Self(array))
    }

    /// Lowercase hex form used on the wire
    pub fn to_lower_hex(&self) -> String {
        to_data(&self.0)
    }

    /// EIP-55 mixed-case checksum form
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Shortened display form: `0x1234…abcd`
    pub fn short(&self) -> String {
        let full = self.to_checksum();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_prefix(s)?;
        if digits.len() != 40 {
            return Err(ParseError::InvalidLength {
                expected: 40,
                actual: digits.len(),
            });
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        let address = Address(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(ParseError::BadChecksum);
        }

        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// ChainId
// ============================================

/// EIP-155 chain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const SEPOLIA: ChainId = ChainId(11_155_111);

    pub fn to_quantity(self) -> String {
        to_quantity(self.0)
    }

    pub fn from_quantity(s: &str) -> Result<Self, ParseError> {
        parse_quantity(s).map(ChainId)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================
// TxHash
// ============================================

/// 32-byte transaction hash
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl FromStr for TxHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_word(s).map(TxHash)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_data(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ============================================
// Registry records
// ============================================

/// A governance proposal as stored by the registry contract
///
/// Proposals are immutable and append-only; the client never edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Contract-assigned, monotonic identifier
    pub id: u64,
    /// Account that submitted the proposal
    pub author: Address,
    pub title: String,
    pub description: String,
    /// Unix timestamp in seconds (block time of the creating transaction)
    pub created_at: u64,
}

impl Proposal {
    /// Creation time as a UTC datetime
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.created_at).ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// Decoded `ProposalCreated(uint256 indexed id, address indexed author, string title)` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalCreated {
    pub id: u64,
    pub author: Address,
    pub title: String,
    pub block_number: u64,
}

/// Raw event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
    pub block_number: u64,
}

/// Mined transaction outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    /// `false` when execution reverted
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference vector from EIP-55
    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_checksum_roundtrip() {
        let address: Address = CHECKSUMMED.parse().unwrap();
        assert_eq!(address.to_checksum(), CHECKSUMMED);
        assert_eq!(address.to_string(), CHECKSUMMED);
    }

    #[test]
    fn test_single_case_addresses_accepted() {
        let lower: Address = CHECKSUMMED.to_lowercase().parse().unwrap();
        let upper: Address = format!("0x{}", CHECKSUMMED[2..].to_uppercase()).parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let tampered = CHECKSUMMED.replace("aAeb", "AaEB");
        assert_eq!(tampered.parse::<Address>(), Err(ParseError::BadChecksum));
    }

    #[test]
    fn test_address_errors() {
        assert_eq!(
            "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse::<Address>(),
            Err(ParseError::MissingPrefix)
        );
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(ParseError::InvalidLength { expected: 40, actual: 4 })
        ));
        assert!(matches!(
            "0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse::<Address>(),
            Err(ParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_short_address() {
        let address: Address = CHECKSUMMED.parse().unwrap();
        assert_eq!(address.short(), "0x5aAe…eAed");
    }

    #[test]
    fn test_quantities() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(11_155_111), "0xaa36a7");
        assert_eq!(parse_quantity("0xaa36a7"), Ok(11_155_111));
        assert_eq!(ChainId::SEPOLIA.to_quantity(), "0xaa36a7");
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("12").is_err());
        assert!(matches!(
            parse_quantity("0x1ffffffffffffffff"),
            Err(ParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_data_helpers() {
        assert_eq!(parse_data("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_data("0x6080").unwrap(), vec![0x60, 0x80]);
        assert_eq!(to_data(&[0xde, 0xad]), "0xdead");
        assert!(parse_word("0x00").is_err());
    }

    #[test]
    fn test_keccak_known_value() {
        // keccak256("") reference digest
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_proposal_timestamp() {
        let proposal = Proposal {
            id: 1,
            author: Address::ZERO,
            title: "T".into(),
            description: "D".into(),
            created_at: 1_700_000_000,
        };
        let dt = proposal.created_at_utc().unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2023-11-14");
    }
}
