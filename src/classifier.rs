//! Classification of supervisor status values.

use crate::status::StatusRecord;

const STATUS_UP: &str = "UP";
const STATUS_DOWN: &str = "DOWN";

/// Up/down signal derived from a record's status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub up: bool,
    /// Set when the status is neither `UP` nor `DOWN`.
    pub warning: bool,
}

/// Maps the status column to an up/down signal.
///
/// Unknown values count as down and raise the warning flag; they are never
/// fatal for the collection cycle.
pub fn classify(record: &StatusRecord) -> Classification {
    match record.status.as_str() {
        STATUS_UP => Classification {
            up: true,
            warning: false,
        },
        STATUS_DOWN => Classification {
            up: false,
            warning: false,
        },
        _ => Classification {
            up: false,
            warning: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::parse_status_line;

    fn classify_line(line: &str) -> Classification {
        classify(&parse_status_line(line).unwrap())
    }

    #[test]
    fn test_classify_up() {
        let c = classify_line("OPENIO-rawx-0 UP 14 OPENIO,rawx,0");
        assert!(c.up);
        assert!(!c.warning);
    }

    #[test]
    fn test_classify_down() {
        let c = classify_line("OPENIO-rawx-0 DOWN -1 OPENIO,rawx,0");
        assert!(!c.up);
        assert!(!c.warning);
    }

    #[test]
    fn test_classify_unknown_status() {
        let c = classify_line("OPENIO-rawx-0 RESTARTING 14 OPENIO,rawx,0");
        assert!(!c.up);
        assert!(c.warning);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let c = classify_line("OPENIO-rawx-0 up 14 OPENIO,rawx,0");
        assert!(!c.up);
        assert!(c.warning);
    }
}
