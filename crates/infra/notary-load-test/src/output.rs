//! Human-readable and JSON rendering of a [`TestOutcome`].

use std::{fmt::Write as _, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ArtifactIoError, report::TestOutcome};

/// Report file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Plain text summary.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Formats a duration given in milliseconds: `N ms`, `Ns Nms` or `Nh Nm Ns Nms`.
pub fn display_timing(duration_ms: f64) -> String {
    let ms = duration_ms.round().max(0.0) as u64;
    if ms < 1_000 {
        return format!("{ms} ms");
    }
    if ms < 60_000 {
        let s = ms / 1_000;
        return format!("{s}s {}ms", ms - s * 1_000);
    }
    let hours = ms / 3_600_000;
    let minutes = ms % 3_600_000 / 60_000;
    let seconds = ms % 60_000 / 1_000;
    format!("{hours}h {minutes}m {seconds}s {}ms", ms % 1_000)
}

/// Renders the plain text summary.
pub fn render_text(outcome: &TestOutcome) -> String {
    let mut out = String::new();
    out.push_str(if outcome.success {
        "Testing completed successfully\n\n"
    } else {
        "Testing FAILED\n\n"
    });

    let params = &outcome.params;
    let _ = writeln!(out, "Testing Date: {}", outcome.started_at.format("%d/%m/%Y, %H:%M:%S UTC"));
    let _ = writeln!(
        out,
        "Testing parameters: {} files of size [{}-{}]kb",
        params.file_nb, params.min_size, params.max_size
    );
    for violation in &outcome.violations {
        let _ = writeln!(out, "{violation}");
    }
    let _ = writeln!(
        out,
        "Protocol Writing Time (total): {}",
        display_timing(outcome.write_duration_ms as f64)
    );
    let _ = writeln!(
        out,
        "Protocol Writing Time (average): {}",
        display_timing(outcome.average_write_ms())
    );
    let _ = writeln!(
        out,
        "Protocol Reading Time (total): {}",
        display_timing(outcome.read_duration_ms as f64)
    );
    let _ = writeln!(
        out,
        "Protocol Reading Time (average): {}",
        display_timing(outcome.average_read_ms())
    );
    out
}

/// Renders the outcome as pretty JSON.
pub fn render_json(outcome: &TestOutcome) -> String {
    // TestOutcome has no map keys or non-finite floats, so serialization cannot fail.
    serde_json::to_string_pretty(outcome).unwrap_or_default()
}

/// Writes the rendered report to `path`.
pub async fn save_report(
    outcome: &TestOutcome,
    path: &Path,
    format: ReportFormat,
) -> Result<(), ArtifactIoError> {
    let rendered = match format {
        ReportFormat::Text => render_text(outcome),
        ReportFormat::Json => render_json(outcome),
    };
    tokio::fs::write(path, rendered)
        .await
        .map_err(|source| ArtifactIoError { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::{config::TestParams, violation::Violation};

    fn outcome(violations: Vec<Violation>) -> TestOutcome {
        TestOutcome {
            success: violations.is_empty(),
            started_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            params: TestParams::default().with_file_nb(4).with_size_range(10, 10),
            write_duration_ms: 2_500,
            read_duration_ms: 80,
            submitted: 4,
            verified: 4,
            violations,
        }
    }

    #[test]
    fn timing_formats() {
        assert_eq!(display_timing(999.4), "999 ms");
        assert_eq!(display_timing(1_500.0), "1s 500ms");
        assert_eq!(display_timing(59_999.0), "59s 999ms");
        assert_eq!(display_timing(3_723_004.0), "1h 2m 3s 4ms");
    }

    #[test]
    fn successful_report_layout() {
        let text = render_text(&outcome(Vec::new()));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Testing completed successfully");
        assert_eq!(lines[2], "Testing Date: 14/11/2023, 22:13:20 UTC");
        assert_eq!(lines[3], "Testing parameters: 4 files of size [10-10]kb");
        assert_eq!(lines[4], "Protocol Writing Time (total): 2s 500ms");
        assert_eq!(lines[5], "Protocol Writing Time (average): 625 ms");
        assert_eq!(lines[6], "Protocol Reading Time (total): 80 ms");
        assert_eq!(lines[7], "Protocol Reading Time (average): 20 ms");
    }

    #[test]
    fn failed_report_lists_each_violation() {
        let text = render_text(&outcome(vec![
            Violation::AnswerNotReceived { index: 2 },
            Violation::ReadingTimeExceeded { elapsed_ms: 80, budget_ms: 10 },
        ]));
        assert!(text.starts_with("Testing FAILED\n\n"));
        assert!(text.contains("did not receive answer from ledger for payload 2\n"));
        assert!(text.contains("ERROR - Protocol Reading Time is too big"));
    }

    #[test]
    fn json_report_tags_violations() {
        let json = render_json(&outcome(vec![Violation::AnswerNotReceived { index: 2 }]));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["violations"][0]["kind"], "answer_not_received");
        assert_eq!(value["params"]["time_out"], 1_800_000);
    }

    #[tokio::test]
    async fn save_report_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testReport.txt");
        save_report(&outcome(Vec::new()), &path, ReportFormat::Text).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("Testing completed"));

        let path = dir.path().join("testReport.json");
        save_report(&outcome(Vec::new()), &path, ReportFormat::Json).await.unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["submitted"], 4);
    }

    #[tokio::test]
    async fn save_report_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("testReport.txt");

        let err = save_report(&outcome(Vec::new()), &path, ReportFormat::Text).await.unwrap_err();

        assert_eq!(err.path, path);
    }
}
