//! Drives the in-memory connector through a facade: seeds accounts, searches
//! them with a filter, then replays the change log.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use conduit_core::{Attribute, Filter, ObjectClass, OperationOptions};
use conduit_framework::memory::NAME_ATTRIBUTE;
use conduit_framework::{
    ApiConfiguration, ConnectorCatalog, ConnectorFacade, MemoryConnector, OperationError,
    OperationKind, OperationSettings, StreamOutcome,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "conduit-demo")]
#[command(about = "Run connector operations against the in-memory connector", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON operation settings; every kind is supported when omitted
    #[arg(long, env = "CONDUIT_SETTINGS")]
    settings: Option<PathBuf>,

    /// Default per-call timeout in milliseconds
    #[arg(long, env = "CONDUIT_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Capacity of the streaming result buffer
    #[arg(long, env = "CONDUIT_BUFFER_SIZE")]
    buffer_size: Option<usize>,

    /// Simulated backend latency per call and per streamed item, in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Number of accounts to seed
    #[arg(long, default_value = "20")]
    records: usize,

    /// Stop the search after this many results
    #[arg(long)]
    limit: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<OperationSettings> {
    let mut settings = match &cli.settings {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            OperationSettings::from_json(&raw)
                .with_context(|| format!("parsing settings from {}", path.display()))?
        }
        None => OperationSettings::default().with_supported(OperationKind::ALL),
    };
    if let Some(ms) = cli.timeout_ms {
        settings = settings.with_default_timeout(Duration::from_millis(ms));
    }
    if let Some(size) = cli.buffer_size {
        settings = settings.with_buffer_size(size);
    }
    Ok(settings)
}

/// Search accounts on the corporate mail domain, stopping after `limit`
/// results. A zero limit skips the search.
async fn search_corp_accounts(
    facade: &ConnectorFacade,
    limit: u64,
) -> Result<StreamOutcome, OperationError> {
    if limit == 0 {
        return Ok(StreamOutcome::default());
    }
    let mut seen = 0_u64;
    facade
        .search(
            ObjectClass::account(),
            Some(Filter::ends_with("mail", "@corp.example")),
            move |object| {
                seen += 1;
                info!(uid = %object.uid, "search result");
                seen < limit
            },
            OperationOptions::new(),
        )
        .await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings = load_settings(&cli)?;
    let catalog = ConnectorCatalog::new();
    let info = catalog
        .register(MemoryConnector::info())
        .context("registering the memory connector")?;

    let connector =
        Arc::new(MemoryConnector::new().with_latency(Duration::from_millis(cli.latency_ms)));
    let registry = connector.registry()?;
    let facade = ConnectorFacade::new(&ApiConfiguration::new(info, settings), &registry)?;
    info!(supported = ?facade.supported_operations(), "facade ready");

    facade.test().await?;

    let account = ObjectClass::account();
    for n in 0..cli.records {
        let domain = if n % 2 == 0 { "corp.example" } else { "home.example" };
        facade
            .create(
                account.clone(),
                vec![
                    Attribute::single(NAME_ATTRIBUTE, format!("user{n:03}")),
                    Attribute::single("mail", format!("user{n:03}@{domain}")),
                ],
                OperationOptions::new(),
            )
            .await?;
    }
    info!(records = cli.records, "accounts seeded");

    let outcome = search_corp_accounts(&facade, cli.limit.unwrap_or(u64::MAX)).await?;
    info!(
        delivered = outcome.delivered,
        stopped_early = outcome.stopped_early,
        "search finished"
    );

    let sync = facade
        .sync(
            account.clone(),
            None,
            |delta| {
                info!(uid = %delta.uid, kind = ?delta.delta_type, "change");
                true
            },
            OperationOptions::new(),
        )
        .await?;
    let token = facade.get_latest_sync_token(account).await?;
    info!(delivered = sync.delivered, latest = ?token, "sync finished");

    Ok(())
}

#[cfg(test)]
mod tests {
    use conduit_framework::OperationRegistry;

    use super::*;

    async fn seeded_facade(records: usize) -> ConnectorFacade {
        let connector = Arc::new(MemoryConnector::new());
        let registry: OperationRegistry = connector.registry().unwrap();
        let settings = OperationSettings::default().with_supported(OperationKind::ALL);
        let facade = ConnectorFacade::new(
            &ApiConfiguration::new(Arc::new(MemoryConnector::info()), settings),
            &registry,
        )
        .unwrap();
        for n in 0..records {
            facade
                .create(
                    ObjectClass::account(),
                    vec![
                        Attribute::single(NAME_ATTRIBUTE, format!("user{n}")),
                        Attribute::single("mail", format!("user{n}@corp.example")),
                    ],
                    OperationOptions::new(),
                )
                .await
                .unwrap();
        }
        facade
    }

    #[tokio::test]
    async fn zero_limit_delivers_nothing() {
        let facade = seeded_facade(3).await;
        let outcome = search_corp_accounts(&facade, 0).await.unwrap();
        assert_eq!(outcome.delivered, 0);
        assert!(!outcome.stopped_early);
    }

    #[tokio::test]
    async fn limit_caps_delivered_results() {
        let facade = seeded_facade(3).await;
        let outcome = search_corp_accounts(&facade, 2).await.unwrap();
        assert_eq!(outcome.delivered, 2);
        assert!(outcome.stopped_early);

        let all = search_corp_accounts(&facade, u64::MAX).await.unwrap();
        assert_eq!(all.delivered, 3);
        assert!(!all.stopped_early);
    }
}
