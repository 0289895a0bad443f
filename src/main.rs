use health_tracker::{
    AppState, Config, DailyRecords, DocumentStore, load_data, nutrition::NutritionEstimator,
    profile::ProfileStore, router,
};
use std::{net::SocketAddr, path::Path};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    ensure_parent_dir(&config.data_path).await?;
    ensure_parent_dir(&config.profile_path).await?;

    let data = load_data(&config.data_path).await;
    let store = DocumentStore::new(config.data_path.clone(), data);
    let records = DailyRecords::new(store, &config.user_id);
    let profiles = ProfileStore::open(config.profile_path.clone()).await;
    let estimator = NutritionEstimator::new(config.openai.clone());

    info!(user = %config.user_id, collection = records.collection(), "records ready");
    let app = router(AppState::new(records, profiles, estimator));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(err) => {
            error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await
        }
    }
}
