//! `+CUSD` unsolicited result codes
//!
//! Modems deliver USSD screens as `+CUSD: <status>,"<text>",<dcs>`. Multi-line
//! screens arrive split across several serial lines, so records are
//! re-extracted from the joined text rather than parsed line by line. A record
//! only counts once the line terminator after its last field has arrived.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TransportError, TransportResult};
use crate::ussd::{MenuResponse, SessionStatus};

static FULL_RECORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)\+CUSD:\s*(\d+)\s*,\s*"(.*?)"\s*,\s*(\d+)[ \t]*\r?\n"#).expect("CUSD record pattern is valid")
});

static STATUS_RECORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\+CUSD:[ \t]*(\d+)[ \t]*\r?\n").expect("CUSD status pattern is valid"));

/// UCS-2 data coding scheme
const DCS_UCS2: u8 = 72;

/// One `+CUSD` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CusdRecord {
    pub status: u8,
    pub text: Option<String>,
    pub dcs: Option<u8>,
}

impl CusdRecord {
    /// Map the network status onto a screen or a fault
    pub fn into_response(self, operation: &str) -> TransportResult<MenuResponse> {
        let status = match self.status {
            0 => SessionStatus::Complete,
            1 => SessionStatus::AwaitingReply,
            2 | 3 => SessionStatus::Terminated,
            4 => {
                return Err(TransportError::ModemError {
                    command: operation.to_string(),
                    response: "operation not supported by network".to_string(),
                })
            }
            5 => {
                return Err(TransportError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: 0,
                })
            }
            other => {
                return Err(TransportError::ModemError {
                    command: operation.to_string(),
                    response: format!("unknown +CUSD status {other}"),
                })
            }
        };
        let text = match (self.text, self.dcs) {
            (Some(text), Some(DCS_UCS2)) => decode_ucs2(&text).unwrap_or(text),
            (Some(text), _) => text,
            (None, _) => String::new(),
        };
        Ok(MenuResponse::new(text, status))
    }
}

/// Every record in `text`, in order of appearance
pub fn parse_records(text: &str) -> Vec<CusdRecord> {
    let mut found: Vec<(usize, CusdRecord)> = FULL_RECORD
        .captures_iter(text)
        .filter_map(|captures| {
            let start = captures.get(0)?.start();
            Some((
                start,
                CusdRecord {
                    status: captures[1].parse().ok()?,
                    text: Some(captures[2].to_string()),
                    dcs: captures[3].parse().ok(),
                },
            ))
        })
        .collect();

    found.extend(STATUS_RECORD.captures_iter(text).filter_map(|captures| {
        let start = captures.get(0)?.start();
        Some((
            start,
            CusdRecord {
                status: captures[1].parse().ok()?,
                text: None,
                dcs: None,
            },
        ))
    }));

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, record)| record).collect()
}

/// Join complete lines split by the device and pull out the records
pub fn reassemble(lines: &[&str]) -> Vec<CusdRecord> {
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    parse_records(&text)
}

// Hex-encoded UTF-16BE, as sent with DCS 72
fn decode_ucs2(hex: &str) -> Option<String> {
    let hex = hex.trim();
    if hex.is_empty() || hex.len() % 4 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let units: Option<Vec<u16>> = (0..hex.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
        .collect();
    String::from_utf16(&units?).ok()
}
