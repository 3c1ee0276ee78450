use clap::Parser;
use owner_sync::config::credentials::resolve_token;
use owner_sync::config::toml_config::SourceKind;
use owner_sync::core::CrmSource;
use owner_sync::utils::{logger, validation::Validate};
use owner_sync::{
    CliConfig, FixtureSource, PipedriveClient, RunReport, SyncConfig, SyncEngine, SyncError,
};
use std::time::Duration;

fn load_config(cli: &CliConfig) -> Result<SyncConfig, SyncError> {
    let mut config = SyncConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

fn fail(e: &SyncError) -> ! {
    tracing::error!(
        "❌ Owner sync failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

async fn run<S: CrmSource>(source: S, config: SyncConfig) -> Result<RunReport, SyncError> {
    SyncEngine::new(source, config).run().await
}

fn summarize(report: &RunReport) {
    let verb = if report.dry_run { "planned" } else { "made" };
    tracing::info!(
        "✅ Sync finished: {} open deals, {} organizations, {} owner changes {}",
        report.open_deals,
        report.organizations,
        report.total_updates(),
        verb
    );
    tracing::info!(
        "Skipped {} deals and {} organizations/contacts with missing owners or relations",
        report.deal_pass.skipped.len(),
        report.organization_pass.skipped.len()
    );

    if report.has_failures() {
        let failures: Vec<&SyncError> = report.failures().collect();
        tracing::error!("❌ {} owner update(s) failed", failures.len());
        for failure in &failures {
            tracing::error!("  - {}", failure);
        }
        eprintln!("❌ {} owner update(s) failed; see the log", failures.len());
    } else {
        println!(
            "✅ Owner sync completed: {} owner changes {}",
            report.total_updates(),
            verb
        );
    }
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    logger::init_logger(&config.logging.level, config.logging.format, cli.verbose);
    tracing::info!("Starting owner-sync");
    tracing::debug!(
        "Configuration: base_url={}, page_size={}, source={:?}, dry_run={}",
        config.api.base_url,
        config.fetch.page_size,
        config.source.kind,
        config.reconcile.dry_run
    );

    let kind = config.source.kind;
    let outcome = match kind {
        SourceKind::Fixture => {
            tracing::info!("📁 Using recorded fixtures from {}", config.source.fixture_dir);
            match FixtureSource::from_dir(&config.source.fixture_dir) {
                Ok(source) => run(source, config).await,
                Err(e) => Err(e),
            }
        }
        SourceKind::Live => match resolve_token(&config.api) {
            Ok(token) => {
                let client = PipedriveClient::new(config.api.base_url.clone(), token.expose())
                    .with_timeout(Duration::from_secs(config.api.timeout_seconds));
                run(client, config).await
            }
            Err(e) => Err(e),
        },
    };

    match outcome {
        Ok(report) => {
            summarize(&report);
            std::process::exit(report.exit_code());
        }
        Err(e) => fail(&e),
    }
}
