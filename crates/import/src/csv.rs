use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::parse::{FileParser, ParseError, RawImportRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date_column: usize,
    pub description_column: usize,
    /// Single signed-amount column; mutually exclusive with the
    /// debit/credit pair.
    pub amount_column: Option<usize>,
    pub debit_column: Option<usize>,
    pub credit_column: Option<usize>,
    pub memo_column: Option<usize>,
    pub date_format: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_column: 0,
            description_column: 1,
            amount_column: Some(2),
            debit_column: None,
            credit_column: None,
            memo_column: None,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementProfile {
    pub name: String,
    pub mapping: ColumnMapping,
    pub has_header: bool,
    pub delimiter: String,
}

impl Default for StatementProfile {
    fn default() -> Self {
        Self {
            name: "Generic CSV".to_string(),
            mapping: ColumnMapping::default(),
            has_header: true,
            delimiter: ",".to_string(),
        }
    }
}

/// CSV statement parser driven by a column-mapping profile. Debit cells
/// become negative amounts (money leaving the statement account), credit
/// cells positive.
pub struct CsvStatementParser {
    profile: StatementProfile,
}

impl CsvStatementParser {
    pub fn new(profile: StatementProfile) -> Self {
        Self { profile }
    }
}

impl FileParser for CsvStatementParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawImportRecord>, ParseError> {
        let mapping = &self.profile.mapping;
        let delimiter = self
            .profile
            .delimiter
            .as_bytes()
            .first()
            .copied()
            .unwrap_or(b',');
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(self.profile.has_header)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(bytes);

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result.map_err(|e| ParseError::Malformed(e.to_string()))?;
            if row.is_empty() || row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let date_field = row.get(mapping.date_column).unwrap_or_default();
            let date = parse_date(date_field, &mapping.date_format)?;

            let description = row
                .get(mapping.description_column)
                .unwrap_or_default()
                .trim()
                .to_string();

            let amount_cents = if let Some(col) = mapping.amount_column {
                parse_amount(row.get(col).unwrap_or_default())?
            } else if let (Some(d_col), Some(c_col)) = (mapping.debit_column, mapping.credit_column)
            {
                let debit = row
                    .get(d_col)
                    .filter(|cell| !cell.trim().is_empty())
                    .map(parse_amount)
                    .transpose()?;
                let credit = row
                    .get(c_col)
                    .filter(|cell| !cell.trim().is_empty())
                    .map(parse_amount)
                    .transpose()?;
                match (debit, credit) {
                    (Some(d), None) => -d.abs(),
                    (None, Some(c)) => c.abs(),
                    _ => 0,
                }
            } else {
                return Err(ParseError::Malformed(
                    "profile maps neither an amount column nor a debit/credit pair".to_string(),
                ));
            };

            let mut extra = std::collections::BTreeMap::new();
            if let Some(memo) = mapping
                .memo_column
                .and_then(|col| row.get(col))
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
            {
                extra.insert("memo".to_string(), memo.to_string());
            }

            records.push(RawImportRecord {
                description,
                amount_cents,
                date,
                extra,
            });
        }

        if records.is_empty() {
            return Err(ParseError::Malformed(
                "statement contains no records".to_string(),
            ));
        }

        Ok(records)
    }
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, ParseError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Ok(date);
    }

    for fmt in &[
        "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%Y-%m-%d",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(ParseError::InvalidDate(s.to_string()))
}

fn parse_amount(s: &str) -> Result<i64, ParseError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', '€', ' '], "");
    let mut dec =
        Decimal::from_str(&s).map_err(|_| ParseError::InvalidAmount(s.to_string()))?;
    if negative {
        dec = -dec;
    }
    (dec * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| ParseError::InvalidAmount(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_parser() -> CsvStatementParser {
        CsvStatementParser::new(StatementProfile::default())
    }

    #[test]
    fn parses_signed_amount_column() {
        let data = b"date,description,amount\n2026-01-15,ACME PAYROLL,2500.00\n2026-01-16,CORNER CAFE,-4.20\n";
        let records = default_parser().parse(data).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount_cents, 250000);
        assert_eq!(records[0].description, "ACME PAYROLL");
        assert_eq!(records[1].amount_cents, -420);
    }

    #[test]
    fn debit_cells_become_outflows() {
        let profile = StatementProfile {
            mapping: ColumnMapping {
                amount_column: None,
                debit_column: Some(2),
                credit_column: Some(3),
                ..ColumnMapping::default()
            },
            ..StatementProfile::default()
        };
        let data = b"date,description,debit,credit\n2026-01-15,GROCERY MART,42.50,\n2026-01-16,REFUND,,10.00\n";
        let records = CsvStatementParser::new(profile).parse(data).unwrap();
        assert_eq!(records[0].amount_cents, -4250);
        assert_eq!(records[1].amount_cents, 1000);
    }

    #[test]
    fn memo_column_lands_in_extra() {
        let profile = StatementProfile {
            mapping: ColumnMapping {
                memo_column: Some(3),
                ..ColumnMapping::default()
            },
            ..StatementProfile::default()
        };
        let data = b"date,description,amount,memo\n2026-02-01,LANDLORD,-950.00,rent Feb\n";
        let records = CsvStatementParser::new(profile).parse(data).unwrap();
        assert_eq!(records[0].extra.get("memo").map(String::as_str), Some("rent Feb"));
    }

    #[test]
    fn accounting_parentheses_negate() {
        assert_eq!(parse_amount("(75.25)").unwrap(), -7525);
        assert_eq!(parse_amount("$1,234.56").unwrap(), 123456);
    }

    #[test]
    fn falls_back_through_date_formats() {
        let d = parse_date("01/15/2026", "%Y-%m-%d").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert!(parse_date("not-a-date", "%Y-%m-%d").is_err());
    }

    #[test]
    fn empty_statement_is_malformed() {
        let data = b"date,description,amount\n";
        assert!(matches!(
            default_parser().parse(data),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let data = b"date,description,amount\n2026-01-15,SHOP,-1.00\n,,\n";
        let records = default_parser().parse(data).unwrap();
        assert_eq!(records.len(), 1);
    }
}
