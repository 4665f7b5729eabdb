//! Row-level validation: raw feed rows in, typed transactions out.
//!
//! RULE: This is the only place a row's fields are checked.
//! Everything downstream of an AcceptedTransaction trusts it.

use crate::types::{AgentId, RetailerId};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::{fmt, str::FromStr};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Cell text that spreadsheet and dataframe exports use for "no value".
const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Largest accepted amount magnitude (10^15). Any batch that fits in memory
/// sums to well under `Decimal::MAX`, so aggregation never overflows.
// 10^15 = 0x0003_8D7E_A4C6_8000 split into (lo, mid, hi) 32-bit words; `Decimal::new` is not const.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// A feed row exactly as read. Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRecord {
    pub agent_id: Option<String>,
    pub retailer_id: Option<String>,
    #[serde(rename = "transaction_amount")]
    pub amount: Option<String>,
    pub date: Option<String>,
}

impl RawRecord {
    /// Build a record from cell text, treating blank cells as missing.
    pub fn from_cells(
        agent_id: Option<&str>,
        retailer_id: Option<&str>,
        amount: Option<&str>,
        date: Option<&str>,
    ) -> Self {
        Self {
            agent_id: present(agent_id),
            retailer_id: present(retailer_id),
            amount: present(amount),
            date: present(date),
        }
    }
}

fn present(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty() && !MISSING_MARKERS.contains(s))
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedTransaction {
    pub agent_id: AgentId,
    pub retailer_id: RetailerId,
    pub amount: Decimal,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingAgentId,
    MissingRetailerId,
    MissingAmount,
    InvalidAmount,
    AmountOutOfRange,
    MissingDate,
    InvalidDate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::MissingAgentId    => "missing agent_id",
            RejectReason::MissingRetailerId => "missing retailer_id",
            RejectReason::MissingAmount     => "missing transaction_amount",
            RejectReason::InvalidAmount     => "non-numeric transaction_amount",
            RejectReason::AmountOutOfRange  => "transaction_amount out of range",
            RejectReason::MissingDate       => "missing date",
            RejectReason::InvalidDate       => "unparseable date",
        };
        f.write_str(s)
    }
}

/// A row excluded from processing, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based line in the feed (the header is line 1).
    pub line: u64,
    pub record: RawRecord,
    pub reasons: Vec<RejectReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted(AcceptedTransaction),
    Rejected(RejectedRow),
}

/// Classify one raw row. Every failing field is reported, not just the first.
pub fn validate(line: u64, record: RawRecord) -> Validation {
    let mut reasons = Vec::new();

    if record.agent_id.is_none() {
        reasons.push(RejectReason::MissingAgentId);
    }
    if record.retailer_id.is_none() {
        reasons.push(RejectReason::MissingRetailerId);
    }

    let amount = match record.amount.as_deref() {
        None => {
            reasons.push(RejectReason::MissingAmount);
            None
        }
        Some(text) => match parse_amount(text) {
            None => {
                reasons.push(RejectReason::InvalidAmount);
                None
            }
            Some(amount) if amount.abs() > MAX_AMOUNT => {
                reasons.push(RejectReason::AmountOutOfRange);
                None
            }
            parsed => parsed,
        },
    };

    let date = match record.date.as_deref() {
        None => {
            reasons.push(RejectReason::MissingDate);
            None
        }
        Some(text) => {
            let parsed = parse_date(text);
            if parsed.is_none() {
                reasons.push(RejectReason::InvalidDate);
            }
            parsed
        }
    };

    if reasons.is_empty() {
        if let (Some(agent_id), Some(retailer_id), Some(amount), Some(date)) =
            (record.agent_id.clone(), record.retailer_id.clone(), amount, date)
        {
            return Validation::Accepted(AcceptedTransaction {
                agent_id,
                retailer_id,
                amount,
                date,
            });
        }
    }
    Validation::Rejected(RejectedRow { line, record, reasons })
}

/// Parse a numeric cell. Plain and scientific notation are accepted.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Parse a date cell; a time-of-day part, if any, is dropped.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_signs_and_exponents() {
        assert_eq!(parse_amount("1500"), Some(Decimal::new(1500, 0)));
        assert_eq!(parse_amount(" -12.50 "), Some(Decimal::new(-1250, 2)));
        assert_eq!(parse_amount("1.5e3"), Some(Decimal::new(1500, 0)));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("1,500"), None);
    }

    #[test]
    fn missing_markers_read_as_blank() {
        assert_eq!(present(Some(" NA ")), None);
        assert_eq!(present(Some("NULL")), None);
        assert_eq!(present(Some("nan")), None);
        assert_eq!(present(Some("NAB")), Some("NAB".to_string()));
    }

    #[test]
    fn date_accepts_common_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("2024/01/15"), expected);
        assert_eq!(parse_date("01/15/2024"), expected);
        assert_eq!(parse_date("2024-01-15 10:30:00"), expected);
        assert_eq!(parse_date("2024-13-40"), None);
    }
}
