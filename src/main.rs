use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use quotesync::application::actors::sync_actor::{
    request_status, request_sync, SyncActor, SyncMessage,
};
use quotesync::config::AppConfig;
use quotesync::domain::entities::quote::Quote;
use quotesync::domain::errors::SyncError;
use quotesync::infrastructure::remote_client::RemoteQuoteClient;
use quotesync::persistence::repository::{
    AppStateRepository, QuoteRepository, LAST_SYNC_KEY, SELECTED_CATEGORY_KEY,
};
use quotesync::persistence::sync_audit::{SqliteSyncAuditRepository, SyncAuditRepository};
use quotesync::persistence::init_database;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    quotes: QuoteRepository,
    app_state: AppStateRepository,
    audit: Arc<SqliteSyncAuditRepository>,
    sync: mpsc::Sender<SyncMessage>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotesync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    info!("Quotesync server starting...");
    info!(
        "Sync: enabled={}, endpoint={}, interval={}s",
        config.sync_enabled, config.sync_endpoint, config.sync_interval_seconds
    );

    let pool = init_database(&config.database_url).await?;
    let quotes = QuoteRepository::new(pool.clone());
    let app_state = AppStateRepository::new(pool.clone());
    let audit = Arc::new(SqliteSyncAuditRepository::new(pool));

    let seeded = quotes.seed_defaults().await?;
    if seeded > 0 {
        info!("Seeded {} starter quotes into empty collection", seeded);
    }

    let remote = Arc::new(RemoteQuoteClient::new(
        config.sync_endpoint.clone(),
        config.sync_fetch_limit,
        config.sync_timeout(),
    )?);

    let sync_tx = SyncActor::spawn(remote, quotes.clone(), app_state.clone(), audit.clone());
    let sync_tx_shutdown = sync_tx.clone();

    if config.sync_enabled {
        let scheduler_tx = sync_tx.clone();
        let interval = config.sync_interval();
        tokio::spawn(async move {
            sync_scheduler_task(scheduler_tx, interval).await;
        });
    } else {
        info!("Periodic sync disabled by configuration");
    }

    let state = AppState {
        quotes,
        app_state,
        audit,
        sync: sync_tx,
    };

    let app = Router::new()
        .route("/", get(|| async { "Quotesync server is running!" }))
        .route("/health", get(health_check))
        .route("/quotes", get(get_quotes).post(add_quote))
        .route("/quotes/random", get(get_random_quote))
        .route("/quotes/export", get(export_quotes))
        .route("/quotes/import", post(import_quotes))
        .route("/categories", get(get_categories))
        .route("/categories/selected", get(get_selected_category))
        .route("/categories/select", post(select_category))
        .route("/sync", post(trigger_sync))
        .route("/sync/status", get(get_sync_status))
        .route("/sync/history", get(get_sync_history))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from((config.host, config.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);

    let shutdown_signal = async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    info!("Server started successfully. Press Ctrl+C to stop.");
    server.with_graceful_shutdown(shutdown_signal).await?;

    info!("Server shutting down gracefully...");

    if sync_tx_shutdown.try_send(SyncMessage::Shutdown).is_err() {
        debug!("Sync actor already busy or stopped, skipping shutdown message");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Background task that triggers a sync cycle on a fixed interval
///
/// A tick that arrives while a cycle is still queued or running is skipped;
/// the bounded actor channel is the in-flight guard.
async fn sync_scheduler_task(sync: mpsc::Sender<SyncMessage>, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        match sync.try_send(SyncMessage::SyncNow { reply: reply_tx }) {
            Ok(()) => match reply_rx.recv().await {
                Some(Ok(report)) => info!(
                    added = report.added,
                    updated = report.updated,
                    "Scheduled sync cycle finished"
                ),
                Some(Err(e)) => warn!("Scheduled sync cycle failed: {}", e),
                None => warn!("Sync actor dropped the reply channel"),
            },
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Previous sync cycle still pending, skipping this tick");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                info!("Sync channel closed, stopping scheduler");
                break;
            }
        }
    }
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let quote_count = state.quotes.count().await.unwrap_or(-1);

    Json(serde_json::json!({
        "status": "running",
        "quotes": quote_count,
    }))
}

/// List quotes, optionally filtered by category
async fn get_quotes(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let quotes = match params.get("category") {
        Some(category) if category != "all" => state.quotes.list_by_category(category).await,
        _ => state.quotes.list_all().await,
    }
    .map_err(internal_error)?;

    Ok(Json(serde_json::json!({
        "count": quotes.len(),
        "quotes": quotes,
    })))
}

/// Add a new quote from user input
async fn add_quote(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    let text = payload["text"].as_str().ok_or((
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": "Missing text field"})),
    ))?;

    let category = payload["category"].as_str().ok_or((
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": "Missing category field"})),
    ))?;

    let quote = Quote::new(text, category).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": e.to_string()})),
        )
    })?;

    let stored = state.quotes.insert(&quote).await.map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"success": true, "quote": stored})),
    ))
}

/// Get a random quote
///
/// An explicit `?category=` wins; otherwise the persisted selected category
/// filter applies.
async fn get_random_quote(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let category = match params.get("category") {
        Some(category) => Some(category.clone()),
        None => state
            .app_state
            .get(SELECTED_CATEGORY_KEY)
            .await
            .map_err(internal_error)?,
    };

    let quote = state
        .quotes
        .random(category.as_deref())
        .await
        .map_err(internal_error)?;

    match quote {
        Some(quote) => Ok(Json(serde_json::json!({"quote": quote}))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No quotes available."})),
        )),
    }
}

/// Export the whole collection as a JSON array
async fn export_quotes(
    State(state): State<AppState>,
) -> Result<Json<Vec<Quote>>, (StatusCode, Json<serde_json::Value>)> {
    let quotes = state.quotes.list_all().await.map_err(internal_error)?;
    Ok(Json(quotes))
}

/// Import quotes from a JSON array
///
/// Every entry is validated before anything is appended; a malformed payload
/// imports nothing.
async fn import_quotes(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let entries: Vec<Quote> = serde_json::from_value(payload).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": format!("Invalid import payload: {}", e)})),
        )
    })?;

    let mut validated = Vec::with_capacity(entries.len());
    for entry in entries {
        let quote = Quote::from_parts(entry.id, &entry.text, &entry.category, entry.updated_at)
            .map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": e.to_string()})),
                )
            })?;
        validated.push(quote);
    }

    let imported = state
        .quotes
        .insert_many(&validated)
        .await
        .map_err(internal_error)?;

    info!("Imported {} quotes", imported);

    Ok(Json(serde_json::json!({"success": true, "imported": imported})))
}

/// List all known categories
async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let categories = state.quotes.categories().await.map_err(internal_error)?;
    Ok(Json(serde_json::json!({"categories": categories})))
}

/// Get the persisted category filter
async fn get_selected_category(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let selected = state
        .app_state
        .get(SELECTED_CATEGORY_KEY)
        .await
        .map_err(internal_error)?
        .unwrap_or_else(|| "all".to_string());

    Ok(Json(serde_json::json!({"selected": selected})))
}

/// Persist the category filter
async fn select_category(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let category = payload["category"]
        .as_str()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Missing category field"})),
        ))?;

    state
        .app_state
        .set(SELECTED_CATEGORY_KEY, category)
        .await
        .map_err(internal_error)?;

    Ok(Json(serde_json::json!({"success": true, "selected": category})))
}

/// Trigger one sync cycle and wait for its outcome
async fn trigger_sync(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match request_sync(&state.sync, std::time::Duration::from_secs(30)).await {
        Ok(report) => Ok(Json(serde_json::json!({"success": true, "report": report}))),
        Err(SyncError::RemoteUnavailable(e)) => Err((
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"success": false, "error": e})),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"success": false, "error": e.to_string()})),
        )),
    }
}

/// Sync statistics plus the persisted last sync time
async fn get_sync_status(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let stats = request_status(&state.sync).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
    })?;

    let last_sync = state
        .app_state
        .get(LAST_SYNC_KEY)
        .await
        .map_err(internal_error)?
        .and_then(|v| v.parse::<i64>().ok());

    Ok(Json(serde_json::json!({
        "stats": stats,
        "lastSync": last_sync,
    })))
}

/// Recent sync cycles from the audit trail
async fn get_sync_history(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let cycles = state
        .audit
        .recent_cycles(20)
        .await
        .map_err(internal_error)?;

    Ok(Json(serde_json::json!({"cycles": cycles})))
}

fn internal_error(
    e: quotesync::persistence::DatabaseError,
) -> (StatusCode, Json<serde_json::Value>) {
    error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": e.to_string()})),
    )
}
