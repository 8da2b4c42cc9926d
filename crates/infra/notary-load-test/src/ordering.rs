//! Monotonicity check of ledger timestamps across submission order.

use chrono::{DateTime, Utc};

use crate::{verifier::RecordLookup, violation::Violation};

/// Result of scanning the lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingScan {
    /// Violations in scan order.
    pub violations: Vec<Violation>,
    /// Running "last seen" timestamp after each lookup.
    pub running: Vec<DateTime<Utc>>,
}

/// Checks that ledger timestamps never decrease in submission order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderingValidator;

impl OrderingValidator {
    /// Scans every lookup, never stopping early.
    ///
    /// A missing answer is reported but leaves the running timestamp untouched, so
    /// a gap is never by itself an ordering violation.
    pub fn scan(lookups: &[RecordLookup]) -> OrderingScan {
        let mut last_seen = DateTime::<Utc>::default();
        let mut scan = OrderingScan {
            violations: Vec::new(),
            running: Vec::with_capacity(lookups.len()),
        };

        for lookup in lookups {
            match lookup.record {
                None => scan.violations.push(Violation::AnswerNotReceived { index: lookup.payload_index }),
                Some(record) if record.ledger_timestamp < last_seen => {
                    scan.violations.push(Violation::OutOfOrderTimestamp {
                        index: lookup.payload_index,
                        previous: last_seen,
                        observed: record.ledger_timestamp,
                    });
                }
                Some(record) => last_seen = record.ledger_timestamp,
            }
            scan.running.push(last_seen);
        }
        scan
    }
}
