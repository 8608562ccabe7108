use std::sync::Arc;

use leadbox::config::{SeedConnection, ServerConfig, SyncConfig};
use leadbox::provider::GmailProvider;
use leadbox::server::api_routes;
use leadbox::store::model::Connection;
use leadbox::store::{Database, LibSqlBackend};
use leadbox::sync::SyncEngine;
use leadbox::sync::scheduler::spawn_sync_scheduler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server_config = ServerConfig::from_env();
    let sync_config = SyncConfig::from_env();

    eprintln!("📬 Leadbox v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}", server_config.port);
    eprintln!(
        "   Sync: every {}s, {} threads/run, {}s deadline",
        sync_config.poll_interval_secs, sync_config.page_size, sync_config.run_timeout_secs
    );

    // ── Database ─────────────────────────────────────────────────────────
    let db_path =
        std::env::var("LEADBOX_DB_PATH").unwrap_or_else(|_| "./data/leadbox.db".to_string());

    let db_path_ref = std::path::Path::new(&db_path);
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(db_path_ref)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", db_path, e);
                std::process::exit(1);
            }),
    );

    eprintln!("   Database: {}", db_path);

    // ── Seed connection (optional) ───────────────────────────────────────
    // The OAuth flow lives outside this service; a fresh deployment can
    // point the sync at one mailbox via environment variables.
    if let Some(seed) = SeedConnection::from_env() {
        let connection = Connection::new(&seed.user_id, &seed.mailbox_email, seed.access_token)
            .with_refresh_token(seed.refresh_token);
        match db.upsert_connection(&connection).await {
            Ok(id) => {
                eprintln!("   Connection: {} ({})", seed.mailbox_email, id);
            }
            Err(e) => {
                eprintln!("   Warning: Could not seed connection: {}", e);
            }
        }
    }

    // ── Sync engine + scheduler ──────────────────────────────────────────
    let provider = Arc::new(GmailProvider::new());
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&db),
        provider,
        sync_config.clone(),
    ));

    if sync_config.scheduler_enabled() {
        let (_handle, _shutdown) =
            spawn_sync_scheduler(Arc::clone(&engine), Arc::clone(&db), sync_config);
    } else {
        eprintln!("   Scheduler: disabled (LEADBOX_SYNC_INTERVAL_SECS=0)");
    }

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = api_routes(Arc::clone(&db), engine);
    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", server_config.port)).await?;
    tracing::info!(port = server_config.port, "API server started");
    axum::serve(listener, app).await?;

    Ok(())
}
