//! Notary load test binary entry point.

mod cli;

use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli::{
    BackendArg, Cli, Commands, FinalityArg, GenerateArgs, LogArgs, LogFormat, RecordSourceArg,
    RunArgs,
};
use notary_load_test::{
    ArtifactStore, EnvKeysProvider, FixedDelayFinalityPolicy, GatewayClient, GeneratedIdentities,
    HarnessRunner, IdentityPool, NotaryContractBackend, ReceiptPollingFinalityPolicy,
    ReportFormat, SecretProvider, SessionAuthenticator, SessionEndpointAuthenticator,
    SessionToken, StaticTokenAuthenticator, TimestampApiClient, WalletsFileProvider, render_json,
    render_text, save_report, save_wallets,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log)?;

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::GenerateIdentities(args) => generate(args).map(|()| ExitCode::SUCCESS),
    }
}

fn init_tracing(log: &LogArgs) -> Result<()> {
    let filter =
        EnvFilter::builder().with_default_directive(log.level_filter().into()).from_env_lossy();
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let result = match log.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow!("failed to initialize tracing subscriber: {e}"))
}

fn generate(args: GenerateArgs) -> Result<()> {
    let provider = match args.seed {
        Some(seed) => GeneratedIdentities::new(args.count).with_seed(seed),
        None => GeneratedIdentities::new(args.count),
    };
    let identities = provider.load().context("failed to generate identities")?;
    save_wallets(&identities, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(count = identities.len(), path = %args.output.display(), "identities written");
    for identity in &identities {
        println!("{}", identity.address());
    }
    Ok(())
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let identities = if let Some(path) = &args.wallets {
        WalletsFileProvider::new(path).load().context("failed to load wallets")?
    } else if let Some(var) = &args.keys_env {
        EnvKeysProvider::new(var).load().context("failed to load identity keys")?
    } else if let Some(count) = args.generate_identities {
        GeneratedIdentities::new(count).load().context("failed to generate identities")?
    } else {
        EnvKeysProvider::new(EnvKeysProvider::DEFAULT_VAR)
            .load()
            .context("no identities: pass --wallets, --keys-env or --generate-identities")?
    };
    let pool = IdentityPool::new(identities, args.nonce_sequencing.into())
        .context("identity pool is empty")?;

    let api_url = args.api_url()?;
    let ledger = GatewayClient::new(&api_url).context("failed to create gateway client")?;
    let authenticator = authenticator(&args, &api_url)?;
    info!(gateway = %ledger.rpc_url(), "using ledger gateway");

    let mut runner = HarnessRunner::new(args.params(), pool)
        .with_read_concurrency(args.read_concurrency)
        .with_progress(!args.no_progress);
    if args.backend == BackendArg::Contract {
        runner = runner.with_backend(NotaryContractBackend::new(args.contract));
    }
    runner = match args.finality {
        FinalityArg::Fixed => runner.with_finality(FixedDelayFinalityPolicy::new(
            Duration::from_millis(args.finality_delay_ms),
        )),
        FinalityArg::Poll => runner.with_finality(ReceiptPollingFinalityPolicy::new(
            Duration::from_millis(args.poll_interval_ms),
            Duration::from_millis(args.poll_timeout_ms),
        )),
    };
    if args.record_source == RecordSourceArg::TimestampApi {
        let records =
            TimestampApiClient::new(&api_url).context("failed to create timestamp API client")?;
        runner = runner.with_record_source(records);
    }
    if let Some(dir) = &args.artifact_dir {
        runner = runner.with_artifacts(ArtifactStore::new(dir));
    }
    if let Some(seed) = args.seed {
        runner = runner.with_seed(seed);
    }

    let outcome = runner.run(&ledger, authenticator.as_ref()).await?;

    let format = ReportFormat::from(args.format);
    match format {
        ReportFormat::Text => print!("{}", render_text(&outcome)),
        ReportFormat::Json => println!("{}", render_json(&outcome)),
    }
    if let Some(path) = &args.output {
        save_report(&outcome, path, format).await?;
        info!(path = %path.display(), "report saved");
    }

    Ok(if outcome.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn authenticator(args: &RunArgs, api_url: &url::Url) -> Result<Box<dyn SessionAuthenticator>> {
    if let Some(token) = &args.session_token {
        return Ok(Box::new(StaticTokenAuthenticator::new(SessionToken::new(token.clone()))));
    }
    let Some(path) = &args.session_request else {
        bail!("either --session-token or --session-request is required");
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let request: serde_json::Value =
        serde_json::from_str(&raw).context("session request is not valid JSON")?;
    Ok(Box::new(SessionEndpointAuthenticator::new(api_url, request)?))
}
