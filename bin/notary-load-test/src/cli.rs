use std::path::PathBuf;

use alloy_primitives::Address;
use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use notary_load_test::{Environment, NonceSequencing, ReportFormat, TestParams};
use tracing::level_filters::LevelFilter;
use url::Url;

/// Address of the notary contract deployed on the public test networks.
const DEFAULT_NOTARY_CONTRACT: &str = "0x21b38942aA9BC992482627f63814Ffa06DA7e500";

#[derive(Parser, Debug)]
#[command(name = "notary-load-test")]
#[command(about = "Load and conformance test for a ledger hash-notarization service", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Logging configuration.
    #[command(flatten)]
    pub log: LogArgs,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run: notarize random payloads and verify them
    Run(RunArgs),
    /// Generate identities and write them to a wallets file
    GenerateIdentities(GenerateArgs),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// Timestamp, level, target and spans.
    #[default]
    Full,
    /// Level and message only.
    Compact,
    /// Structured JSON lines.
    Json,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct LogArgs {
    /// Increase logging verbosity (-v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Log output format
    #[arg(id = "log_format", long = "log-format", default_value = "full", global = true)]
    pub format: LogFormat,
}

impl LogArgs {
    pub(crate) const fn level_filter(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum EnvironmentArg {
    Production,
    Development,
    Integration,
    Local,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Production => Self::Production,
            EnvironmentArg::Development => Self::Development,
            EnvironmentArg::Integration => Self::Integration,
            EnvironmentArg::Local => Self::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum SequencingArg {
    /// Read the nonce from the ledger before every submission
    Ledger,
    /// Read each nonce once and hand out increasing values locally
    Authority,
}

impl From<SequencingArg> for NonceSequencing {
    fn from(arg: SequencingArg) -> Self {
        match arg {
            SequencingArg::Ledger => Self::Ledger,
            SequencingArg::Authority => Self::Authority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackendArg {
    /// Payload carried as data of a transfer to the next identity
    DataTransfer,
    /// Payload carried in an `addRecord(bytes)` call to the notary contract
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FinalityArg {
    /// Sleep for a fixed delay
    Fixed,
    /// Poll every transaction until it is readable
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum RecordSourceArg {
    /// Decode the hash and timestamp embedded in each included transaction
    Embedded,
    /// Query the gateway's timestamp API by content hash
    TimestampApi,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Gateway preset
    #[arg(long, env = "NOTARY_ENV", default_value = "development")]
    pub env: EnvironmentArg,

    /// API gateway base URL, overrides the preset
    #[arg(long, env = "NOTARY_API_URL")]
    pub api_url: Option<Url>,

    /// Pre-issued session token
    #[arg(long, env = "NOTARY_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// JSON file holding a pre-built session request
    #[arg(long, env = "NOTARY_SESSION_REQUEST", conflicts_with = "session_token")]
    pub session_request: Option<PathBuf>,

    /// Wallets JSON file
    #[arg(long, env = "NOTARY_WALLETS")]
    pub wallets: Option<PathBuf>,

    /// Read comma-separated hex keys from this environment variable
    #[arg(long, conflicts_with = "wallets")]
    pub keys_env: Option<String>,

    /// Generate this many throwaway identities instead of loading keys
    #[arg(long, conflicts_with_all = ["wallets", "keys_env"])]
    pub generate_identities: Option<usize>,

    /// Nonce sequencing mode
    #[arg(long, default_value = "ledger")]
    pub nonce_sequencing: SequencingArg,

    /// How payloads are carried in transactions
    #[arg(long, default_value = "data-transfer")]
    pub backend: BackendArg,

    /// Notary contract address for the contract backend
    #[arg(long, env = "NOTARY_CONTRACT", default_value = DEFAULT_NOTARY_CONTRACT)]
    pub contract: Address,

    /// Finality policy
    #[arg(long, default_value = "fixed")]
    pub finality: FinalityArg,

    /// Where notarized records are read back from
    #[arg(long, env = "NOTARY_RECORD_SOURCE", default_value = "embedded")]
    pub record_source: RecordSourceArg,

    /// Fixed finality delay (milliseconds)
    #[arg(long, default_value = "10000")]
    pub finality_delay_ms: u64,

    /// Receipt polling interval (milliseconds)
    #[arg(long, default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Receipt polling deadline (milliseconds)
    #[arg(long, default_value = "60000")]
    pub poll_timeout_ms: u64,

    /// Number of payloads to notarize
    #[arg(long, default_value = "1")]
    pub file_nb: usize,

    /// Minimum payload size (KB)
    #[arg(long, default_value = "10")]
    pub min_size: u64,

    /// Maximum payload size (KB)
    #[arg(long, default_value = "500")]
    pub max_size: u64,

    /// Delete persisted payloads after submission
    #[arg(long, default_value = "true", action = ArgAction::Set)]
    pub delete_files: bool,

    /// Per-phase time budget (milliseconds)
    #[arg(long = "time-out", default_value = "1800000")]
    pub time_out: u64,

    /// Directory to persist payloads into
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// Maximum concurrent record lookups
    #[arg(long, default_value = "64")]
    pub read_concurrency: usize,

    /// Random seed for reproducible payloads
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the report to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    pub(crate) fn api_url(&self) -> Result<Url> {
        if let Some(url) = &self.api_url {
            return Ok(url.clone());
        }
        let environment = Environment::from(self.env);
        let Some(preset) = environment.api_url() else {
            bail!("--api-url is required for the local environment");
        };
        Url::parse(preset).context("invalid preset gateway URL")
    }

    pub(crate) fn params(&self) -> TestParams {
        TestParams::default()
            .with_file_nb(self.file_nb)
            .with_size_range(self.min_size, self.max_size)
            .with_delete_files(self.delete_files)
            .with_timeout_ms(self.time_out)
    }
}

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Number of identities to generate
    #[arg(long, default_value = "10")]
    pub count: usize,

    /// Random seed for reproducible keys
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output wallets file
    #[arg(long)]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["notary-load-test", "run", "--session-token", "t"]).unwrap();
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        let params = args.params();
        assert_eq!(params, TestParams::default());
        assert_eq!(args.api_url().unwrap().as_str(), "https://api.ebsi.xyz/");
        assert_eq!(args.backend, BackendArg::DataTransfer);
        assert_eq!(args.record_source, RecordSourceArg::Embedded);
        assert_eq!(cli.log.level_filter(), LevelFilter::WARN);
    }

    #[test]
    fn local_environment_requires_url() {
        let cli = Cli::try_parse_from(["notary-load-test", "run", "--env", "local"]).unwrap();
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        assert!(args.api_url().is_err());
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "notary-load-test",
            "-vv",
            "--log-format",
            "json",
            "run",
            "--file-nb",
            "20",
            "--min-size",
            "1",
            "--max-size",
            "2",
            "--delete-files",
            "false",
            "--time-out",
            "5000",
            "--backend",
            "contract",
            "--finality",
            "poll",
            "--record-source",
            "timestamp-api",
        ])
        .unwrap();
        assert_eq!(cli.log.level_filter(), LevelFilter::DEBUG);
        assert_eq!(cli.log.format, LogFormat::Json);
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        let params = args.params();
        assert_eq!(params.file_nb, 20);
        assert_eq!(params.byte_range(), (1024, 2048));
        assert!(!params.delete_files);
        assert_eq!(params.timeout(), Duration::from_secs(5));
        assert_eq!(args.finality, FinalityArg::Poll);
        assert_eq!(args.record_source, RecordSourceArg::TimestampApi);
    }

    #[test]
    fn key_sources_are_exclusive() {
        let result = Cli::try_parse_from([
            "notary-load-test",
            "run",
            "--wallets",
            "w.json",
            "--generate-identities",
            "3",
        ]);
        assert!(result.is_err());
    }
}
