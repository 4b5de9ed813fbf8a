//! UI Components
//!
//! Leptos components for the governance client.

pub mod header;
pub mod proposal_form;
pub mod proposal_list;
pub mod status;

pub use header::Header;
pub use proposal_form::ProposalFormPanel;
pub use proposal_list::ProposalList;
pub use status::StatusBanner;
