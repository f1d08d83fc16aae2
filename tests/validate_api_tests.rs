//! `/api/validar` tests against the in-memory tag store and a disabled store.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use access_relay::directory::Directory;
use access_relay::relay::RelayState;
use access_relay::server::{router, AppState};
use access_relay::store::{MemoryTagStore, TagDocument, TagStore};

async fn call(state: &AppState, uri: &str) -> Result<(StatusCode, Value)> {
    let resp = router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn with_store() -> AppState {
    let mem = MemoryTagStore::new()
        .with("04A1B2C3", TagDocument::owned_by("Carla Mendes"))
        .with("04FFEE00", TagDocument::default());
    AppState::new(RelayState::new(Directory::default()), Some(TagStore::Memory(mem)))
}

#[tokio::test]
async fn missing_uid_is_rejected() -> Result<()> {
    let state = with_store();
    let (status, body) = call(&state, "/api/validar").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "erro");

    let (status, _) = call(&state, "/api/validar?uid=").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.relay.ledger_len(), 0);
    Ok(())
}

#[tokio::test]
async fn known_uid_is_granted() -> Result<()> {
    let state = with_store();
    let (status, body) = call(&state, "/api/validar?uid=04A1B2C3").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["proprietario"], "Carla Mendes");

    let last = state.relay.last_result();
    assert_eq!(last.status, "LIBERADO");
    assert_eq!(last.nome, "Carla Mendes");
    Ok(())
}

#[tokio::test]
async fn document_without_owner_defaults() -> Result<()> {
    let state = with_store();
    let (status, body) = call(&state, "/api/validar?uid=04FFEE00").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["proprietario"], "Usuario");
    Ok(())
}

#[tokio::test]
async fn unknown_uid_is_denied() -> Result<()> {
    let state = with_store();
    let (status, body) = call(&state, "/api/validar?uid=DEADBEEF").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "negado");

    let (_, stats) = call(&state, "/api/estatisticas").await?;
    assert_eq!(stats["negados"], 1);
    Ok(())
}

#[tokio::test]
async fn lookups_land_in_the_ledger_in_order() -> Result<()> {
    let state = with_store();
    for uid in ["04A1B2C3", "nope", "04FFEE00"] {
        call(&state, &format!("/api/validar?uid={uid}")).await?;
    }
    let (_, full) = call(&state, "/historico").await?;
    assert_eq!(full["total_tentativas"], 3);
    let ids: Vec<&str> = full["historico"].as_array().unwrap().iter().filter_map(|h| h["id"].as_str()).collect();
    assert_eq!(ids, vec!["04A1B2C3", "nope", "04FFEE00"]);
    Ok(())
}

#[tokio::test]
async fn disabled_store_fails_every_call() -> Result<()> {
    let state = AppState::new(RelayState::new(Directory::builtin()), None);
    for uri in ["/api/validar?uid=04A1B2C3", "/api/validar?uid=12345", "/api/validar?uid=x", "/api/validar"] {
        let (status, body) = call(&state, uri).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "erro");
    }
    // rejected before any lookup, so nothing is recorded
    assert_eq!(state.relay.ledger_len(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_query_uses_error_envelope() -> Result<()> {
    let state = with_store();
    let (status, body) = call(&state, "/api/validar?uid=04A1B2C3&uid=DEADBEEF").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "erro");
    assert_eq!(body["code"], "bad_query");
    assert_eq!(state.relay.ledger_len(), 0);
    Ok(())
}
