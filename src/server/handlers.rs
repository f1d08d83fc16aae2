//! Read-only dashboard routes. Each handler is a projection of `RelayState`.

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::ledger::RECENT_LIMIT;

const INDEX_HTML: &str = include_str!("../../public/index.html");
const APP_JS: &str = include_str!("../../public/app.js");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], APP_JS)
}

pub async fn ultimo_acesso(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.relay.last_result())
}

pub async fn historico_recente(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "historico": state.relay.recent(RECENT_LIMIT) }))
}

pub async fn estatisticas(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.relay.stats())
}

pub async fn listar_autorizados(State(state): State<AppState>) -> impl IntoResponse {
    let directory = state.relay.directory();
    Json(json!({ "total": directory.len(), "ids_autorizados": directory }))
}

pub async fn historico(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.relay.history();
    Json(json!({ "total_tentativas": entries.len(), "historico": entries }))
}
