//! Test parameters and gateway environment presets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Default delay between the end of the write phase and the start of verification.
pub const DEFAULT_FINALITY_DELAY: Duration = Duration::from_secs(10);

/// Largest accepted payload size bound, in KB (1 GiB).
pub const MAX_PAYLOAD_KB: u64 = 1024 * 1024;

/// Parameters of a single harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestParams {
    /// Number of payloads to generate and notarize.
    pub file_nb: usize,
    /// Lower payload size bound in KB.
    pub min_size: u64,
    /// Upper payload size bound in KB.
    pub max_size: u64,
    /// Remove payload artifacts once submission completes.
    pub delete_files: bool,
    /// Budget for each phase, in milliseconds.
    #[serde(rename = "time_out")]
    pub timeout_ms: u64,
}

impl Default for TestParams {
    fn default() -> Self {
        Self { file_nb: 1, min_size: 10, max_size: 500, delete_files: true, timeout_ms: 1_800_000 }
    }
}

impl TestParams {
    /// Sets the number of payloads.
    pub const fn with_file_nb(mut self, file_nb: usize) -> Self {
        self.file_nb = file_nb;
        self
    }

    /// Sets the payload size bounds in KB.
    pub const fn with_size_range(mut self, min_size: u64, max_size: u64) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    /// Sets whether artifacts are removed after submission.
    pub const fn with_delete_files(mut self, delete_files: bool) -> Self {
        self.delete_files = delete_files;
        self
    }

    /// Sets the per-phase budget in milliseconds.
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Returns the per-phase budget.
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the inclusive payload size range in bytes.
    ///
    /// Saturates on bounds that [`validate`](Self::validate) would reject.
    pub const fn byte_range(&self) -> (usize, usize) {
        (kb_to_bytes(self.min_size), kb_to_bytes(self.max_size))
    }

    /// Checks the parameters are usable.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.file_nb == 0 {
            return Err(HarnessError::Config("file_nb must be at least 1".into()));
        }
        if self.min_size > self.max_size {
            return Err(HarnessError::Config(format!(
                "min_size ({}) must not exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.max_size > MAX_PAYLOAD_KB {
            return Err(HarnessError::Config(format!(
                "max_size ({}) must not exceed {MAX_PAYLOAD_KB} KB",
                self.max_size
            )));
        }
        Ok(())
    }
}

/// Converts a KB count to bytes, saturating at `usize::MAX`.
pub(crate) const fn kb_to_bytes(kb: u64) -> usize {
    let bytes = kb.saturating_mul(1024);
    if bytes > usize::MAX as u64 { usize::MAX } else { bytes as usize }
}

/// Gateway deployment the harness targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production gateway.
    Production,
    /// Development gateway.
    #[default]
    Development,
    /// Integration gateway.
    Integration,
    /// Locally configured gateway; the URL must be supplied explicitly.
    Local,
}

impl Environment {
    /// Returns the API gateway base URL of the preset, if it has one.
    pub const fn api_url(&self) -> Option<&'static str> {
        match self {
            Self::Production => Some("https://api.ebsi.tech.ec.europa.eu"),
            Self::Development => Some("https://api.ebsi.xyz"),
            Self::Integration => Some("https://api.intebsi.xyz"),
            Self::Local => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let params = TestParams::default();
        assert_eq!(params.file_nb, 1);
        assert_eq!(params.byte_range(), (10 * 1024, 500 * 1024));
        assert_eq!(params.timeout(), Duration::from_secs(1800));
        assert!(params.delete_files);
    }

    #[test]
    fn rejects_inverted_size_range() {
        let params = TestParams::default().with_size_range(20, 10);
        assert!(matches!(params.validate(), Err(HarnessError::Config(_))));
    }

    #[test]
    fn rejects_sizes_that_would_overflow() {
        let params = TestParams::default().with_size_range(1, u64::MAX / 512);
        assert!(matches!(params.validate(), Err(HarnessError::Config(_))));
        assert_eq!(params.byte_range(), (1024, kb_to_bytes(u64::MAX)));

        let params = TestParams::default().with_size_range(MAX_PAYLOAD_KB, MAX_PAYLOAD_KB);
        assert!(params.validate().is_ok());
        assert_eq!(params.byte_range().1, 1 << 30);
    }

    #[test]
    fn rejects_empty_workload() {
        let params = TestParams::default().with_file_nb(0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn deserializes_time_out_field_name() {
        let params: TestParams = serde_json::from_str(
            r#"{"file_nb":4,"min_size":10,"max_size":10,"delete_files":false,"time_out":5000}"#,
        )
        .unwrap();
        assert_eq!(params.timeout_ms, 5000);
        assert_eq!(params.byte_range(), (10240, 10240));
    }

    #[test]
    fn local_environment_has_no_preset_url() {
        assert!(Environment::Local.api_url().is_none());
        assert_eq!(Environment::default().api_url(), Some("https://api.ebsi.xyz"));
    }
}
