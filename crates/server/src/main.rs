use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Path, State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;
use server_api::{
    apply_command, calendar_turns, delete_template, load_config, save_config, timeline_view,
    ApiContext, TimelineView,
};
use shared::{
    domain::TemplateName,
    error::{ApiError, ErrorCode},
    protocol::{ConfigEvent, SaveConfigResponse, TimelineCommand},
};
use storage::{load_calendar, Storage};
use timeline::Turn;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod settings;

use app_state::AppState;
use settings::load_settings;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let storage = Storage::new(settings.config_path.to_string_lossy().as_ref())?;
    storage.health_check().await.map_err(|error| {
        error!(
            config_path = %settings.config_path.display(),
            error = ?error,
            "config document is unreadable; fix or remove the file and restart"
        );
        error
    })?;
    let calendar = load_calendar(settings.calendar_path.as_deref())?;
    info!(turns = calendar.turn_count(), "calendar ready");

    let (events, _) = broadcast::channel(256);
    let state = AppState {
        api: ApiContext::new(storage, calendar),
        events,
        version_path: settings.version_path.clone(),
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, config_path = %settings.config_path.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/config", get(http_get_config).post(http_save_config))
        .route("/calendar", get(http_calendar))
        .route("/timeline", get(http_timeline))
        .route("/timeline/commands", post(http_timeline_command))
        .route("/templates/:name", delete(http_delete_template))
        .route("/version.txt", get(version))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    }
    (status, Json(err))
}

fn publish(state: &AppState, event: ConfigEvent) {
    // No subscribers is the normal case.
    let _ = state.events.send(event);
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            warn!(error = ?error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn http_get_config(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    load_config(&state.api).await.map(Json).map_err(api_error)
}

async fn http_save_config(
    State(state): State<Arc<AppState>>,
    Json(document): Json<Value>,
) -> ApiResult<Json<SaveConfigResponse>> {
    let event = save_config(&state.api, document.clone())
        .await
        .map_err(api_error)?;
    publish(&state, event);
    Ok(Json(SaveConfigResponse::success(document)))
}

async fn http_calendar(State(state): State<Arc<AppState>>) -> Json<Vec<Turn>> {
    Json(calendar_turns(&state.api))
}

async fn http_timeline(State(state): State<Arc<AppState>>) -> ApiResult<Json<TimelineView>> {
    timeline_view(&state.api).await.map(Json).map_err(api_error)
}

async fn http_timeline_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<TimelineCommand>,
) -> ApiResult<Json<TimelineView>> {
    let update = apply_command(&state.api, command)
        .await
        .map_err(api_error)?;
    publish(&state, update.event);
    Ok(Json(update.view))
}

async fn http_delete_template(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<TimelineView>> {
    let update = delete_template(&state.api, &TemplateName::from(name))
        .await
        .map_err(api_error)?;
    publish(&state, update.event);
    Ok(Json(update.view))
}

async fn version(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let raw = tokio::fs::read_to_string(&state.version_path)
        .await
        .map_err(|e| {
            api_error(ApiError::not_found(format!(
                "version file '{}' unavailable: {e}",
                state.version_path.display()
            )))
        })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        raw.trim().to_string(),
    ))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: axum::extract::ws::WebSocket) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            let event = match events_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "config event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
