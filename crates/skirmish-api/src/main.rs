//! Skirmish combat orchestrator API server entry point.

use std::error::Error;
use std::sync::Arc;

use skirmish_api::config::ServerConfig;
use skirmish_api::routes;
use skirmish_api::settings_file::{FileSettingsStore, read_document};
use skirmish_api::state::{AppState, Engine};
use skirmish_api::table::{Table, TableSeed};
use skirmish_api::ticker;
use skirmish_core::clock::SystemClock;
use skirmish_core::model::UserContext;
use skirmish_core::rng::SeededRng;
use skirmish_core::settings::SettingsStore;
use skirmish_lifecycle::application::controller::CombatLifecycleController;
use skirmish_playlist::application::migration::run_settings_migration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Skirmish combat orchestrator");

    let config = ServerConfig::from_env()?;
    tracing::info!(
        family = ?config.family,
        gm_user = %config.gm_user,
        settings = %config.settings_path.display(),
        "configuration loaded"
    );

    let store = Arc::new(FileSettingsStore::new(&config.settings_path, config.family));

    let mut table = Table::new(config.gm_user, Box::new(SeededRng::from_entropy()));
    if let Some(path) = &config.table_path {
        let seed: TableSeed = read_document(path).await?;
        table.seed(&seed);
    }

    // Legacy settings resolve against the seeded playlists.
    match run_settings_migration(store.as_ref(), &table).await {
        Ok(report) if report.migrated => tracing::info!(
            added = report.added.len(),
            unresolved = report.unresolved.len(),
            "legacy settings migrated"
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "settings migration failed"),
    }
    let settings = store.load().await?;

    let controller = CombatLifecycleController::for_family(
        config.family,
        settings,
        UserContext::gm(config.gm_user),
        Arc::new(SystemClock),
        Box::new(SeededRng::from_entropy()),
    );
    let app_state = AppState::new(Engine::new(table, controller), store);
    let poller = ticker::spawn_ticker(Arc::clone(&app_state.engine));

    // TODO: Replace CorsLayer::permissive() with restricted origins once a UI is served.
    let app = routes::api_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    poller.abort();
    Ok(())
}
