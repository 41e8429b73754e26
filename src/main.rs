use anyhow::{Context, Result};
use seo_metadata::config::Config;
use seo_metadata::db::Database;
use seo_metadata::entity::EntityRegistry;
use seo_metadata::server::{router, AppState};
use seo_metadata::sync::SeoSignals;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("seo_metadata=info".parse()?),
        )
        .init();

    info!("Starting SEO metadata service");

    let config = Config::from_env()?;
    info!(
        "Languages: {:?} (default '{}')",
        config.seo.languages.codes().collect::<Vec<_>>(),
        config.seo.default_lang()
    );

    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let db = Database::new(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    info!("Database ready at {}", config.database_path);

    // The standalone service hosts no entity types of its own.
    let entities = EntityRegistry::new();
    SeoSignals::connect(&db, &config.seo, &entities).context("Invalid SEO_MODELS")?;

    if config.api_key.is_none() {
        info!("API_KEY not set, /sync is disabled");
    }

    let port = config.port;
    let state = Arc::new(AppState {
        config: Arc::new(config),
        db,
        entities: Arc::new(entities),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}
