//! Chain primitives
//!
//! Addresses, wire encodings and the registry contract's ABI.
//!
//! ## Modules
//!
//! - `types`: address, chain id, hashes and decoded records
//! - `abi`: encoder/decoder for the fixed governance registry interface

pub mod abi;
mod types;

pub use abi::{AbiError, AbiResult};
pub use types::{
    keccak256, parse_data, parse_quantity, parse_word, to_data, to_quantity, Address, ChainId,
    Log, ParseError, Proposal, ProposalCreated, TransactionReceipt, TxHash,
};
