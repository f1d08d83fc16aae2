//! `/api/validar`: synchronous tag lookup against the document store.

use std::panic::AssertUnwindSafe;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::ledger::{Verdict, UNKNOWN_DEPARTMENT};
use crate::relay::now_timestamp;
use crate::store::{StoreError, TagDocument};

/// Owner name used when a matched document has no `proprietario`.
pub const DEFAULT_OWNER: &str = "Usuario";

#[derive(Debug, Deserialize)]
pub struct ValidarParams {
    pub uid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Granted { proprietario: String },
    Denied { uid: String },
}

impl IntoResponse for Validation {
    fn into_response(self) -> Response {
        match self {
            Validation::Granted { proprietario } => {
                (StatusCode::OK, Json(json!({"status": "ok", "proprietario": proprietario}))).into_response()
            }
            Validation::Denied { uid } => (
                StatusCode::NOT_FOUND,
                Json(json!({"status": "negado", "uid": uid, "mensagem": "UID não cadastrado"})),
            )
                .into_response(),
        }
    }
}

/// Turn a store lookup into the verdict to commit and the reply to send.
/// A failed query is committed as a denial but answered with a server error.
pub fn resolve_lookup(
    uid: &str,
    lookup: Result<Option<TagDocument>, StoreError>,
    timestamp: String,
) -> (Verdict, AppResult<Validation>) {
    match lookup {
        Ok(Some(doc)) => {
            let owner = doc.proprietario.unwrap_or_else(|| DEFAULT_OWNER.to_string());
            let dept = doc.departamento.unwrap_or_else(|| UNKNOWN_DEPARTMENT.to_string());
            let verdict = Verdict::granted(uid, &owner, &dept, timestamp);
            (verdict, Ok(Validation::Granted { proprietario: owner }))
        }
        Ok(None) => (Verdict::denied(uid, timestamp), Ok(Validation::Denied { uid: uid.to_string() })),
        Err(e) => {
            error!(target: "store", uid = %uid, error = %e, "tag lookup failed");
            (Verdict::denied(uid, timestamp), Err(AppError::from(e)))
        }
    }
}

pub async fn validar(
    State(state): State<AppState>,
    params: Result<Query<ValidarParams>, QueryRejection>,
) -> AppResult<Validation> {
    // A store that failed at startup answers 500 regardless of uid.
    let Some(store) = state.store.as_ref() else {
        return Err(StoreError::Disabled.into());
    };
    let Query(params) = params.map_err(|e| AppError::user("bad_query".to_string(), e.body_text()))?;
    let Some(uid) = params.uid.filter(|u| !u.is_empty()) else {
        return Err(AppError::user("missing_uid", "parâmetro uid é obrigatório"));
    };

    let lookup = match AssertUnwindSafe(store.find_by_uid(&uid)).catch_unwind().await {
        Ok(res) => res,
        Err(panic_payload) => {
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                      else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                      else { "panic" };
            error!(target: "panic", "tag lookup panic: {}", msg);
            Err(StoreError::Query("panic during lookup".into()))
        }
    };

    let (verdict, reply) = resolve_lookup(&uid, lookup, now_timestamp());
    state.relay.commit(verdict);
    reply
}
