//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::routes::sales::SalesStore;
use fulfillment::{ArtifactStore, FileSystemArtifactStore, LogNotifier, Notifier};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve<S: SalesStore>(store: S, config: &Config, metrics_handle: PrometheusHandle) {
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(FileSystemArtifactStore::new(
        &config.artifact_dir,
        config.artifact_base_url(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let state = api::create_state(store, artifacts, notifier, config);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(
        %addr,
        environment = %config.environment,
        artifact_dir = %config.artifact_dir.display(),
        step_timeout_ms = config.step_timeout.as_millis() as u64,
        "starting API server"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the backing store and start serving
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, 10)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            serve(store, &config, metrics_handle).await;
        }
        None => {
            let store = InMemoryStore::new();
            api::seed::seed_demo_catalog(&store).await;
            tracing::info!("DATABASE_URL not set, using in-memory store");
            serve(store, &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
