//! Tenement Ingest - multi-jurisdiction tenement sync tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tenement_common::logging::{init_logging, LogConfig, LogLevel};
use tenement_common::{Jurisdiction, SourceFormat};
use tenement_ingest::config::Config;
use tenement_ingest::db::{
    self, DataSourceRepository, InMemoryDataSourceRepository, InMemoryTenementStore,
    PgDataSourceRepository, PgTenementStore, TenementStore,
};
use tenement_ingest::ingest::providers::http::build_client;
use tenement_ingest::ingest::EndpointDescriptor;
use tenement_ingest::{IngestError, IngestionOrchestrator, ProviderRegistry, SyncResult};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "tenement-ingest")]
#[command(author, version, about = "Australian mining tenement ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use in-memory stores seeded from configuration instead of Postgres
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync the enabled source of one jurisdiction
    Sync {
        /// WA, NSW, VIC, NT, QLD or TAS
        jurisdiction: Jurisdiction,
    },

    /// Sync every enabled source concurrently
    SyncAll,

    /// Check every enabled source and record its health
    Status,

    /// Sync a jurisdiction from an explicit endpoint
    Ingest {
        #[arg(long)]
        jurisdiction: Jurisdiction,

        /// arcgis_rest, wfs, csv or tab_in_zip
        #[arg(long)]
        format: SourceFormat,

        #[arg(long)]
        url: String,

        /// WFS type name
        #[arg(long)]
        layer: Option<String>,

        /// ArcGIS paging key
        #[arg(long)]
        order_by: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("tenement-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = Config::load().context("Failed to load configuration")?;
    let client = build_client()?;

    let (sources, store): (Arc<dyn DataSourceRepository>, Arc<dyn TenementStore>) = if cli.dry_run {
        info!("Dry run: using in-memory stores");
        (
            Arc::new(InMemoryDataSourceRepository::from_settings(&config.ingest)),
            Arc::new(InMemoryTenementStore::new()),
        )
    } else {
        let pool = db::create_pool(&config.database).await?;
        db::health_check(&pool)
            .await
            .context("Database is not reachable")?;
        db::run_migrations(&pool).await?;
        (
            Arc::new(PgDataSourceRepository::new(pool.clone())),
            Arc::new(PgTenementStore::new(pool)),
        )
    };

    let registry = Arc::new(ProviderRegistry::from_settings(&config.ingest, client.clone()));
    if registry.is_empty() {
        warn!("No data sources are enabled");
    } else {
        info!(providers = registry.len(), "Providers registered");
    }
    let orchestrator =
        IngestionOrchestrator::new(registry, sources.clone(), store, config.ingest, client);

    match cli.command {
        Command::Sync { jurisdiction } => {
            let result = orchestrator.sync_data_source(jurisdiction).await?;
            report(&result);
        },
        Command::SyncAll => {
            let results = orchestrator.sync_all().await;
            let mut failed = 0;
            for (jurisdiction, result) in &results {
                match result {
                    Ok(result) => report(result),
                    Err(e) => {
                        failed += 1;
                        error!(jurisdiction = %jurisdiction, error = %e, "Sync failed");
                    },
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} syncs failed", failed, results.len());
            }
        },
        Command::Status => {
            for status in orchestrator.check_all_data_sources_status().await {
                info!(
                    jurisdiction = %status.jurisdiction,
                    region = status.jurisdiction.display_name(),
                    source = %status.name,
                    status = %status.status,
                    error = status.error.as_deref().unwrap_or(""),
                    "Source status"
                );
            }
        },
        Command::Ingest {
            jurisdiction,
            format,
            url,
            layer,
            order_by,
        } => {
            let mut source = sources
                .find_enabled(jurisdiction)
                .await?
                .ok_or_else(|| IngestError::no_enabled_source(jurisdiction))?;

            source.format = format;
            source.endpoint = EndpointDescriptor {
                url,
                layer,
                order_by,
            };

            let result = orchestrator.ingest_from_source(&source).await?;
            report(&result);
        },
    }

    info!("Done");
    Ok(())
}

fn report(result: &SyncResult) {
    if result.is_complete() {
        info!(
            jurisdiction = %result.jurisdiction,
            imported = result.imported,
            "Sync complete"
        );
        return;
    }

    warn!(
        jurisdiction = %result.jurisdiction,
        imported = result.imported,
        failed_batches = result.errors.len(),
        "Sync finished with failed batches"
    );
    for batch_error in &result.errors {
        warn!(jurisdiction = %result.jurisdiction, "{}", batch_error);
    }
}
