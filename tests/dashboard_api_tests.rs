//! Dashboard API tests: drive the router in-process and check the JSON projections of the
//! ledger and last result.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use access_relay::directory::Directory;
use access_relay::ledger::RECENT_LIMIT;
use access_relay::relay::RelayState;
use access_relay::server::{router, AppState};

async fn get_json(state: &AppState, uri: &str) -> Result<(StatusCode, Value)> {
    let resp = router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn fresh_state() -> AppState {
    AppState::new(RelayState::new(Directory::builtin()), None)
}

#[tokio::test]
async fn last_result_is_empty_sentinel_before_any_attempt() -> Result<()> {
    let state = fresh_state();
    let (status, body) = get_json(&state, "/api/ultimo_acesso").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "", "status": "", "nome": "", "departamento": "", "timestamp": ""}));
    Ok(())
}

#[tokio::test]
async fn grant_then_deny_shows_up_everywhere() -> Result<()> {
    let state = fresh_state();
    state.relay.evaluate("12345");
    state.relay.evaluate("00000");

    let (_, last) = get_json(&state, "/api/ultimo_acesso").await?;
    assert_eq!(last["id"], "00000");
    assert_eq!(last["status"], "NEGADO");
    assert_eq!(last["nome"], "Desconhecido");
    assert_eq!(last["departamento"], "N/A");

    let (_, stats) = get_json(&state, "/api/estatisticas").await?;
    assert_eq!(stats, json!({"total": 2, "liberados": 1, "negados": 1}));

    let (_, full) = get_json(&state, "/historico").await?;
    assert_eq!(full["total_tentativas"], 2);
    assert_eq!(full["historico"][0]["nome"], "João Silva");
    assert_eq!(full["historico"][0]["status"], "LIBERADO");
    assert_eq!(full["historico"][1]["nome"], "Desconhecido");
    assert_eq!(full["historico"][1]["status"], "NEGADO");
    Ok(())
}

#[tokio::test]
async fn recent_history_is_newest_first_and_capped() -> Result<()> {
    let state = fresh_state();
    for i in 0..15 {
        state.relay.evaluate(&format!("tag-{i}"));
    }
    let (_, recent) = get_json(&state, "/api/historico_recente").await?;
    let recent = recent["historico"].as_array().cloned().unwrap_or_default();
    assert_eq!(recent.len(), RECENT_LIMIT);

    let (_, full) = get_json(&state, "/historico").await?;
    let mut suffix: Vec<Value> = full["historico"].as_array().cloned().unwrap_or_default()[15 - RECENT_LIMIT..].to_vec();
    suffix.reverse();
    assert_eq!(recent, suffix);
    assert_eq!(recent[0]["id"], "tag-14");
    Ok(())
}

#[tokio::test]
async fn stats_always_partition_total() -> Result<()> {
    let state = fresh_state();
    let ids = ["12345", "x", "67890", "y", "z", "99999", "12345"];
    for id in ids {
        state.relay.evaluate(id);
        let (_, s) = get_json(&state, "/api/estatisticas").await?;
        assert_eq!(s["liberados"].as_u64().unwrap() + s["negados"].as_u64().unwrap(), s["total"].as_u64().unwrap());
    }
    let (_, s) = get_json(&state, "/api/estatisticas").await?;
    assert_eq!(s, json!({"total": 7, "liberados": 4, "negados": 3}));
    Ok(())
}

#[tokio::test]
async fn directory_dump_lists_every_entry() -> Result<()> {
    let state = fresh_state();
    let (status, body) = get_json(&state, "/listar_autorizados").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(body["ids_autorizados"]["67890"], json!({"nome": "Maria Santos", "departamento": "RH"}));
    Ok(())
}

#[tokio::test]
async fn landing_page_and_script_are_served() -> Result<()> {
    let state = fresh_state();
    let resp = router(state.clone())
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    assert!(String::from_utf8_lossy(&html).contains("/app.js"));

    let resp = router(state)
        .oneshot(Request::builder().uri("/app.js").body(Body::empty())?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers().get("content-type").and_then(|v| v.to_str().ok()).unwrap_or("");
    assert!(ct.starts_with("application/javascript"));
    Ok(())
}

#[tokio::test]
async fn cors_allows_any_origin() -> Result<()> {
    let state = fresh_state();
    let resp = router(state)
        .oneshot(
            Request::builder()
                .uri("/api/estatisticas")
                .header("origin", "http://dashboard.local")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(resp.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()), Some("*"));
    Ok(())
}
