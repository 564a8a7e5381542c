//! Parsing of `gridinit_cmd status` report lines.
//!
//! The report is a whitespace-aligned table:
//!
//! ```text
//! KEY                       STATUS      PID GROUP
//! OPENIO-account-0          UP         1163 OPENIO,account,0
//! ```
//!
//! Only the four leading columns are structural. Their content is not
//! validated here; pid parsing happens when the record is joined with
//! process statistics.

use thiserror::Error;

/// Key of the header row printed by `gridinit_cmd status`.
pub const HEADER_KEY: &str = "KEY";

/// Number of leading columns every status line must carry.
const REQUIRED_FIELDS: usize = 4;

/// One parsed row of the status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub key: String,
    pub status: String,
    pub pid: String,
    pub group: String,
}

impl StatusRecord {
    /// Returns true for the table header row.
    pub fn is_header(&self) -> bool {
        self.key == HEADER_KEY
    }
}

/// Error returned when a report line cannot be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected at least {REQUIRED_FIELDS} fields, got {tokens}")]
    Malformed { tokens: usize },
}

/// Parses one line of the status report.
///
/// The first four whitespace-separated tokens become key, status, pid and
/// group. Any further tokens are ignored.
pub fn parse_status_line(line: &str) -> Result<StatusRecord, ParseError> {
    let mut fields = line.split_whitespace();

    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(key), Some(status), Some(pid), Some(group)) => Ok(StatusRecord {
            key: key.to_string(),
            status: status.to_string(),
            pid: pid.to_string(),
            group: group.to_string(),
        }),
        _ => Err(ParseError::Malformed {
            tokens: line.split_whitespace().count(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, status: &str, pid: &str, group: &str) -> StatusRecord {
        StatusRecord {
            key: key.into(),
            status: status.into(),
            pid: pid.into(),
            group: group.into(),
        }
    }

    #[test]
    fn test_parse_header_line() {
        let parsed = parse_status_line("KEY                       STATUS      PID GROUP").unwrap();
        assert_eq!(parsed, record("KEY", "STATUS", "PID", "GROUP"));
        assert!(parsed.is_header());
    }

    #[test]
    fn test_parse_process_line() {
        let parsed =
            parse_status_line("OPENIO-account-0          UP         1163 OPENIO,account,0")
                .unwrap();
        assert_eq!(
            parsed,
            record("OPENIO-account-0", "UP", "1163", "OPENIO,account,0")
        );
        assert!(!parsed.is_header());
    }

    #[test]
    fn test_parse_too_few_fields() {
        assert_eq!(
            parse_status_line("A B C"),
            Err(ParseError::Malformed { tokens: 3 })
        );
        assert_eq!(
            parse_status_line("   "),
            Err(ParseError::Malformed { tokens: 0 })
        );
    }

    #[test]
    fn test_parse_exactly_four_fields() {
        assert_eq!(
            parse_status_line("A B C D").unwrap(),
            record("A", "B", "C", "D")
        );
    }

    #[test]
    fn test_parse_ignores_trailing_fields() {
        assert_eq!(
            parse_status_line("A B C D E F").unwrap(),
            record("A", "B", "C", "D")
        );
    }

    #[test]
    fn test_parse_surrounding_whitespace() {
        assert_eq!(
            parse_status_line(" A B C D").unwrap(),
            record("A", "B", "C", "D")
        );
        assert_eq!(
            parse_status_line("\tA  B\tC D  \r").unwrap(),
            record("A", "B", "C", "D")
        );
    }

    #[test]
    fn test_parse_does_not_validate_content() {
        let parsed = parse_status_line("svc BROKEN not-a-pid g").unwrap();
        assert_eq!(parsed.status, "BROKEN");
        assert_eq!(parsed.pid, "not-a-pid");
    }
}
