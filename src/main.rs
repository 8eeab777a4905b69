use packtracker::{ Config, Result };
use std::sync::Arc;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "packtracker=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| packtracker::AppError::Config(e.to_string()))?;

    tracing::info!("Starting packtracker against {}", config.source_base_url);

    // Persistence and shared cache
    let store: Arc<dyn packtracker::storage::KvStore> = Arc::new(
        packtracker::storage::JsonFileStore::new(&config.data_dir)?
    );
    let cache = Arc::new(packtracker::cache::TtlCache::new());

    // Pricing source client and catalog pipeline
    let tcgcsv = Arc::new(
        packtracker::tcgcsv::TcgcsvClient::new(
            config.source_base_url.as_str(),
            cache.clone(),
            config.http_timeout
        )?
    );
    let catalog = Arc::new(
        packtracker::services::CatalogService::new(
            tcgcsv.clone(),
            config.max_sets,
            config.max_groups_per_refresh,
            config.fetch_concurrency
        )
    );

    // Alerting
    let alerts = Arc::new(packtracker::services::AlertService::new(store.clone()));
    let notifier = Arc::new(packtracker::services::DiscordNotifier::new(config.http_timeout)?);
    let checker = Arc::new(
        packtracker::alert_checker::AlertChecker::new(
            alerts.clone(),
            notifier,
            store.clone(),
            config.webhook_url.clone()
        )
    );

    let scheduler = Arc::new(
        packtracker::scheduler::Scheduler::new(catalog, checker, config.refresh_interval)
    );

    tracing::info!("Refresh loop starting (every {:?})", config.refresh_interval);

    scheduler.start().await;

    Ok(())
}
