//! Browser wallet adapter

mod eip1193;

pub use eip1193::Eip1193Wallet;
