use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One row of a parsed bank statement. Amounts are signed cents from the
/// statement account's point of view: negative means money left the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImportRecord {
    pub description: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    /// Bank-specific leftovers (memo, reference numbers) that survive into
    /// the candidate for display but drive no behavior.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("this file has already been converted")]
    AlreadyConverted,
    #[error("no parser available for this file format")]
    NoParserAvailable,
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("malformed statement: {0}")]
    Malformed(String),
}

/// Format-specific statement parsing. The session never looks past this
/// boundary: bytes in, ordered records out, or a terminal error for this
/// file.
pub trait FileParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawImportRecord>, ParseError>;
}
