//! Parser for textual event-dump output.
//!
//! The periodic command scheduler invokes an external dump tool whose stdout
//! is a line-oriented listing: an optional run-number line, then one block
//! per event. An event block starts with a header line carrying `Evid:`,
//! `Mask:` and `Serial:` fields, followed by one or more bank sections. A
//! bank section starts with a `Bank:NAME` line and is followed by lines of
//! whitespace-separated data words (decimal, float, or 0x-prefixed hex).
//!
//! ```text
//! Run number: 1042
//! Evid:0x0001- Mask:0x0000- Serial:17-
//! Bank:CR00 Length:4
//!   0x1f 0x2a 103 88
//! ```
//!
//! Unrecognized lines are skipped; the parser never fails on malformed
//! input, it just yields fewer events. Byte-level unpacking of bank payloads
//! stays outside this crate; the words are carried through as numbers.

use crate::error::{AppResult, RelayError};
use serde::Serialize;

/// One bank section of an event.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DumpBank {
    /// Bank name, e.g. "CR00".
    pub name: String,
    /// Data words in listing order.
    pub words: Vec<f64>,
}

/// One parsed event.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DumpEvent {
    /// Event id from the header, if present.
    pub event_id: Option<i64>,
    /// Trigger mask from the header, if present.
    pub mask: Option<i64>,
    /// Serial number from the header, if present.
    pub serial: Option<i64>,
    /// Bank sections in listing order.
    pub banks: Vec<DumpBank>,
}

/// Full parse result of one dump invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpPackage {
    /// Run number announced in the listing, if any.
    pub run_number: Option<i32>,
    /// Events in listing order.
    pub events: Vec<DumpEvent>,
}

impl DumpPackage {
    /// Serialize each event to one JSON record string, in listing order.
    pub fn records(&self) -> AppResult<Vec<String>> {
        self.events
            .iter()
            .map(|event| {
                serde_json::to_string(event)
                    .map_err(|e| RelayError::Processor(format!("event record encoding: {}", e)))
            })
            .collect()
    }
}

/// Parse a numeric field of the form `Key:value-` out of a header line.
fn header_field(line: &str, key: &str) -> Option<i64> {
    let start = line.find(key)? + key.len();
    let rest = &line[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == 'x' || c == 'X'))
        .unwrap_or(rest.len());
    parse_word(&rest[..end]).map(|v| v as i64)
}

/// Parse one data word: decimal integer, float, or 0x-prefixed hex.
fn parse_word(token: &str) -> Option<f64> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    token.parse::<f64>().ok()
}

/// Parse the full output of one dump invocation.
pub fn parse(text: &str) -> DumpPackage {
    let mut package = DumpPackage::default();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("Run number:") {
            package.run_number = rest.trim().parse().ok();
            continue;
        }

        if trimmed.contains("Evid:") {
            package.events.push(DumpEvent {
                event_id: header_field(trimmed, "Evid:"),
                mask: header_field(trimmed, "Mask:"),
                serial: header_field(trimmed, "Serial:"),
                banks: Vec::new(),
            });
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("Bank:") {
            if let Some(event) = package.events.last_mut() {
                let name = rest
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                event.banks.push(DumpBank {
                    name,
                    words: Vec::new(),
                });
            }
            continue;
        }

        // Data line: numeric tokens belonging to the current bank.
        if let Some(bank) = package
            .events
            .last_mut()
            .and_then(|event| event.banks.last_mut())
        {
            bank.words
                .extend(trimmed.split_whitespace().filter_map(parse_word));
        }
    }

    package
}
