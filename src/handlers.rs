use crate::{
    config::{self, Config},
    error::AppError,
    models::{DiagnosticsReport, MessageResponse, VideoRequest},
    resolver::LinkResolver,
    AppState,
};
use anyhow::anyhow;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::env;

// ===================================================================
//                          GREETING HANDLERS
// ===================================================================

/// # GET / - Confirms the backend is up.
pub async fn root() -> impl IntoResponse {
    Json(MessageResponse {
        message: "Hello from the TikTok agent backend!".to_string(),
    })
}

/// # GET /api/hello
pub async fn hello() -> impl IntoResponse {
    Json(MessageResponse {
        message: "Hello from the backend API!".to_string(),
    })
}

// ===================================================================
//                          RESOLVE HANDLER
// ===================================================================

/// # POST /api/tiktok - Resolves a TikTok link into its title, thumbnail and no-watermark URL.
pub async fn resolve_tiktok(
    State(state): State<AppState>,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let source = request.source_url().map_err(AppError::BadRequest)?;

    let config = current_config(&state)?;
    let resolver = LinkResolver::new(state.http.clone(), &config);
    let result = resolver.resolve(&source).await.map_err(AppError::Resolve)?;

    Ok((StatusCode::OK, Json(result)))
}

// ===================================================================
//                          DIAGNOSTICS HANDLER
// ===================================================================

/// # GET /test - Reports backend status and database environment wiring.
pub async fn diagnostics() -> impl IntoResponse {
    let report = DiagnosticsReport::collect(|key| env::var_os(key).is_some());
    (StatusCode::OK, Json(report))
}

// ===================================================================
//                          CONFIG HANDLERS
// ===================================================================

/// # GET /config - Returns the current application configuration.
pub async fn get_config(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let config = current_config(&state)?;
    Ok((StatusCode::OK, Json(config)))
}

/// # POST /config - Updates the configuration and saves it to disk.
pub async fn update_config(
    State(state): State<AppState>,
    payload: Result<Json<Config>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    config::save_config(&state.config_path, &payload).await?;
    *state
        .config
        .write()
        .map_err(|_| anyhow!("config lock poisoned"))? = payload.clone();
    tracing::info!("Configuration updated and saved.");
    Ok((StatusCode::OK, Json(payload)))
}

// ===================================================================
//                          HELPER FUNCTIONS
// ===================================================================

/// Takes a snapshot of the shared configuration.
fn current_config(state: &AppState) -> Result<Config, AppError> {
    let config = state
        .config
        .read()
        .map_err(|_| anyhow!("config lock poisoned"))?;
    Ok(config.clone())
}
