//! Text and JSON output for the command-line client

use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::chain::{ProposalCreated, TransactionReceipt};
use crate::list::{ProposalCard, EMPTY_LIST_TEXT};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected table or json)", other)),
        }
    }
}

/// Proposal cards, one block per proposal
pub fn render_cards(cards: &[ProposalCard], format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(cards);
    }
    if cards.is_empty() {
        return Ok(EMPTY_LIST_TEXT.to_string());
    }

    let mut out = String::new();
    for (i, card) in cards.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "#{:<4} {}", card.id, card.title);
        for line in card.description.lines() {
            let _ = writeln!(out, "      {}", line);
        }
        let _ = writeln!(out, "      {}", card.byline);
    }
    Ok(out.trim_end().to_string())
}

/// Outcome of a mined proposal transaction
pub fn render_receipt(receipt: &TransactionReceipt, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(receipt),
        OutputFormat::Table => Ok(format!(
            "Proposal submitted\n  Transaction: {}\n  Block:       {}",
            receipt.transaction_hash, receipt.block_number
        )),
    }
}

/// A single creation event, one line
pub fn render_event(event: &ProposalCreated, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(event),
        OutputFormat::Table => Ok(format!(
            "[block {}] #{} {} by {}",
            event.block_number,
            event.id,
            event.title,
            event.author.short()
        )),
    }
}

/// Any serializable value, for ad-hoc JSON output
pub fn render_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
