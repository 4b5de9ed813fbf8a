//! Governance registry ABI codec
//!
//! Hand-written encoder/decoder for the fixed contract interface:
//!
//! ```text
//! function createProposal(string title, string description)
//! function getProposals() view returns (tuple(uint256 id, address author, string title, string description, uint64 createdAt)[])
//! event ProposalCreated(uint256 indexed id, address indexed author, string title)
//! ```
//!
//! Only the shapes above are supported. Integers wider than 64 bits are
//! rejected with [`AbiError::Overflow`].

use thiserror::Error;

use super::types::{keccak256, Address, Log, Proposal, ProposalCreated};

pub const CREATE_PROPOSAL_SIGNATURE: &str = "createProposal(string,string)";
pub const GET_PROPOSALS_SIGNATURE: &str = "getProposals()";
pub const PROPOSAL_CREATED_SIGNATURE: &str = "ProposalCreated(uint256,address,string)";
const ERROR_STRING_SIGNATURE: &str = "Error(string)";

const WORD: usize = 32;
/// Head size of an encoded proposal tuple (five static slots)
const PROPOSAL_HEAD: usize = 5 * WORD;

/// Four-byte function selector
pub type Selector = [u8; 4];

/// Errors raised while decoding ABI data
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("unexpected selector 0x{0}")]
    UnknownSelector(String),

    #[error("value does not fit in {0}")]
    Overflow(&'static str),

    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    #[error("malformed address word")]
    InvalidAddress,

    #[error("malformed log: {0}")]
    InvalidLog(String),
}

/// Result type alias for ABI operations
pub type AbiResult<T> = Result<T, AbiError>;

/// First four bytes of the Keccak-256 hash of a function signature
pub fn selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic 0 of the `ProposalCreated` event
pub fn proposal_created_topic() -> [u8; 32] {
    keccak256(PROPOSAL_CREATED_SIGNATURE.as_bytes())
}

// ============================================
// Encoding
// ============================================

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Length-prefixed, right-padded dynamic bytes
fn dynamic_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&uint_word(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

/// Encode a sequence of strings as a tuple of dynamic values
fn encode_strings(values: &[&str]) -> Vec<u8> {
    let tails: Vec<Vec<u8>> = values.iter().map(|v| dynamic_bytes(v.as_bytes())).collect();

    let mut out = Vec::new();
    let mut offset = values.len() * WORD;
    for tail in &tails {
        out.extend_from_slice(&uint_word(offset as u64));
        offset += tail.len();
    }
    for tail in tails {
        out.extend(tail);
    }
    out
}

/// Calldata for `createProposal(title, description)`
pub fn encode_create_proposal(title: &str, description: &str) -> Vec<u8> {
    let mut out = selector(CREATE_PROPOSAL_SIGNATURE).to_vec();
    out.extend(encode_strings(&[title, description]));
    out
}

/// Calldata for `getProposals()`
pub fn encode_get_proposals() -> Vec<u8> {
    selector(GET_PROPOSALS_SIGNATURE).to_vec()
}

fn encode_proposal(proposal: &Proposal) -> Vec<u8> {
    let title = dynamic_bytes(proposal.title.as_bytes());
    let description = dynamic_bytes(proposal.description.as_bytes());

    let mut out = Vec::with_capacity(PROPOSAL_HEAD + title.len() + description.len());
    out.extend_from_slice(&uint_word(proposal.id));
    out.extend_from_slice(&address_word(&proposal.author));
    out.extend_from_slice(&uint_word(PROPOSAL_HEAD as u64));
    out.extend_from_slice(&uint_word((PROPOSAL_HEAD + title.len()) as u64));
    out.extend_from_slice(&uint_word(proposal.created_at));
    out.extend(title);
    out.extend(description);
    out
}

/// Return data of `getProposals()`
pub fn encode_proposals(proposals: &[Proposal]) -> Vec<u8> {
    let elements: Vec<Vec<u8>> = proposals.iter().map(encode_proposal).collect();

    let mut out = Vec::new();
    out.extend_from_slice(&uint_word(WORD as u64));
    out.extend_from_slice(&uint_word(elements.len() as u64));

    let mut offset = elements.len() * WORD;
    for element in &elements {
        out.extend_from_slice(&uint_word(offset as u64));
        offset += element.len();
    }
    for element in elements {
        out.extend(element);
    }
    out
}

/// Topics and data of a `ProposalCreated` log
pub fn encode_proposal_created(id: u64, author: &Address, title: &str) -> (Vec<[u8; 32]>, Vec<u8>) {
    let topics = vec![proposal_created_topic(), uint_word(id), address_word(author)];
    (topics, encode_strings(&[title]))
}

/// Revert data carrying an `Error(string)` reason
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let mut out = selector(ERROR_STRING_SIGNATURE).to_vec();
    out.extend(encode_strings(&[reason]));
    out
}

// ============================================
// Decoding
// ============================================

/// Bounds-checked view over ABI data, offsets relative to `data[0]`
#[derive(Clone, Copy)]
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn slice(&self, offset: usize, len: usize) -> AbiResult<&'a [u8]> {
        let out_of_bounds = AbiError::OutOfBounds {
            offset,
            needed: len,
            len: self.data.len(),
        };
        let end = offset.checked_add(len).ok_or(out_of_bounds.clone())?;
        self.data.get(offset..end).ok_or(out_of_bounds)
    }

    /// Sub-reader starting at `offset` (for nested dynamic values)
    fn at(&self, offset: usize) -> AbiResult<Reader<'a>> {
        let data = self.data.get(offset..).ok_or(AbiError::OutOfBounds {
            offset,
            needed: 0,
            len: self.data.len(),
        })?;
        Ok(Reader { data })
    }

    fn word(&self, offset: usize) -> AbiResult<&'a [u8]> {
        self.slice(offset, WORD)
    }

    fn u64(&self, offset: usize) -> AbiResult<u64> {
        word_to_u64(self.word(offset)?)
    }

    fn usize(&self, offset: usize) -> AbiResult<usize> {
        usize::try_from(self.u64(offset)?).map_err(|_| AbiError::Overflow("usize"))
    }

    fn address(&self, offset: usize) -> AbiResult<Address> {
        word_to_address(self.word(offset)?)
    }

    /// Dynamic string whose length word sits at `offset`
    fn string(&self, offset: usize) -> AbiResult<String> {
        let len = self.usize(offset)?;
        let start = offset.checked_add(WORD).ok_or(AbiError::Overflow("usize"))?;
        let bytes = self.slice(start, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }
}

fn word_to_u64(word: &[u8]) -> AbiResult<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow("u64"));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(bytes))
}

fn word_to_address(word: &[u8]) -> AbiResult<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidAddress);
    }
    Address::from_slice(&word[12..]).map_err(|_| AbiError::InvalidAddress)
}

fn strip_selector<'a>(data: &'a [u8], signature: &str) -> AbiResult<&'a [u8]> {
    let expected = selector(signature);
    match data.get(..4) {
        Some(actual) if actual == expected.as_slice() => Ok(&data[4..]),
        Some(actual) => Err(AbiError::UnknownSelector(hex::encode(actual))),
        None => Err(AbiError::OutOfBounds {
            offset: 0,
            needed: 4,
            len: data.len(),
        }),
    }
}

/// Arguments of a `createProposal` call: `(title, description)`
pub fn decode_create_proposal(calldata: &[u8]) -> AbiResult<(String, String)> {
    let args = Reader::new(strip_selector(calldata, CREATE_PROPOSAL_SIGNATURE)?);
    let title = args.string(args.usize(0)?)?;
    let description = args.string(args.usize(WORD)?)?;
    Ok((title, description))
}

/// Return data of `getProposals()`, in contract order
pub fn decode_proposals(data: &[u8]) -> AbiResult<Vec<Proposal>> {
    let root = Reader::new(data);
    let array = root.at(root.usize(0)?)?;
    let count = array.usize(0)?;
    let elements = array.at(WORD)?;

    let mut proposals = Vec::new();
    for index in 0..count {
        let tuple = elements.at(elements.usize(index * WORD)?)?;
        proposals.push(Proposal {
            id: tuple.u64(0)?,
            author: tuple.address(WORD)?,
            title: tuple.string(tuple.usize(2 * WORD)?)?,
            description: tuple.string(tuple.usize(3 * WORD)?)?,
            created_at: tuple.u64(4 * WORD)?,
        });
    }
    Ok(proposals)
}

/// Decode a `ProposalCreated` log
pub fn decode_proposal_created(log: &Log) -> AbiResult<ProposalCreated> {
    if log.topics.len() != 3 {
        return Err(AbiError::InvalidLog(format!(
            "expected 3 topics, got {}",
            log.topics.len()
        )));
    }
    if log.topics[0] != proposal_created_topic() {
        return Err(AbiError::InvalidLog("not a ProposalCreated event".to_string()));
    }

    let data = Reader::new(&log.data);
    Ok(ProposalCreated {
        id: word_to_u64(&log.topics[1])?,
        author: word_to_address(&log.topics[2])?,
        title: data.string(data.usize(0)?)?,
        block_number: log.block_number,
    })
}

/// Reason string carried by `Error(string)` revert data, if any
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let args = Reader::new(strip_selector(data, ERROR_STRING_SIGNATURE).ok()?);
    args.string(args.usize(0).ok()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Address {
        Address::new([0xab; 20])
    }

    fn sample(id: u64, title: &str, description: &str) -> Proposal {
        Proposal {
            id,
            author: author(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: 1_700_000_000 + id,
        }
    }

    #[test]
    fn test_known_selectors() {
        // Solidity's well-known `Error(string)` selector
        assert_eq!(hex::encode(selector(ERROR_STRING_SIGNATURE)), "08c379a0");
        assert_eq!(
            hex::encode(selector("transfer(address,uint256)")),
            "a9059cbb"
        );
    }

    #[test]
    fn test_create_proposal_layout() {
        let calldata = encode_create_proposal("T", "D");

        // selector + 2 offsets + 2 * (length + one padded word)
        assert_eq!(calldata.len(), 4 + 2 * WORD + 2 * 2 * WORD);
        assert_eq!(&calldata[..4], &selector(CREATE_PROPOSAL_SIGNATURE));
        // First offset points just past the two head slots
        assert_eq!(calldata[4 + 31], 0x40);
        // Second offset skips the title's length word and payload word
        assert_eq!(calldata[4 + 63], 0x80);

        assert_eq!(
            decode_create_proposal(&calldata).unwrap(),
            ("T".to_string(), "D".to_string())
        );
    }

    #[test]
    fn test_create_proposal_long_utf8() {
        let title = "Treasury ✓ ".repeat(10);
        let description = "x".repeat(65);
        let calldata = encode_create_proposal(&title, &description);
        assert_eq!(
            decode_create_proposal(&calldata).unwrap(),
            (title, description)
        );
    }

    #[test]
    fn test_wrong_selector_rejected() {
        let calldata = encode_get_proposals();
        assert!(matches!(
            decode_create_proposal(&calldata),
            Err(AbiError::UnknownSelector(_))
        ));
    }

    #[test]
    fn test_proposal_list_preserves_order() {
        let proposals = vec![
            sample(1, "Fund the docs", "Pay for a technical writer"),
            sample(2, "", ""),
            sample(3, "Raise quorum", &"a".repeat(100)),
        ];
        let decoded = decode_proposals(&encode_proposals(&proposals)).unwrap();
        assert_eq!(decoded, proposals);
    }

    #[test]
    fn test_empty_proposal_list() {
        let data = encode_proposals(&[]);
        assert_eq!(data.len(), 2 * WORD);
        assert!(decode_proposals(&data).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_data_is_an_error() {
        let data = encode_proposals(&[sample(1, "T", "D")]);
        let truncated = &data[..data.len() - WORD];
        assert!(matches!(
            decode_proposals(truncated),
            Err(AbiError::OutOfBounds { .. })
        ));
        // An eth_call against an address without code returns empty data
        assert!(decode_proposals(&[]).is_err());
    }

    #[test]
    fn test_oversized_id_rejected() {
        let mut data = encode_proposals(&[sample(1, "T", "D")]);
        // array offset + length + element offset, then the id word
        let id_word = 3 * WORD;
        data[id_word] = 1;
        assert_eq!(decode_proposals(&data), Err(AbiError::Overflow("u64")));
    }

    #[test]
    fn test_proposal_created_log() {
        let (topics, data) = encode_proposal_created(7, &author(), "Raise quorum");
        let log = Log {
            address: Address::new([0x22; 20]),
            topics,
            data,
            block_number: 42,
        };

        let event = decode_proposal_created(&log).unwrap();
        assert_eq!(event.id, 7);
        assert_eq!(event.author, author());
        assert_eq!(event.title, "Raise quorum");
        assert_eq!(event.block_number, 42);
    }

    #[test]
    fn test_foreign_log_rejected() {
        let log = Log {
            address: Address::ZERO,
            topics: vec![keccak256(b"Transfer(address,address,uint256)"), [0; 32], [0; 32]],
            data: Vec::new(),
            block_number: 1,
        };
        assert!(matches!(
            decode_proposal_created(&log),
            Err(AbiError::InvalidLog(_))
        ));
    }

    #[test]
    fn test_revert_reason() {
        let data = encode_revert_reason("title required");
        assert_eq!(decode_revert_reason(&data), Some("title required".to_string()));
        assert_eq!(decode_revert_reason(&[0xde, 0xad]), None);
    }
}
