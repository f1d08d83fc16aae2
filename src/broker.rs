//! Context broker client and poller.
//!
//! The broker exposes one entity whose `idRecebido` attribute is written by the door
//! reader. `BrokerPoller` reads that entity on a fixed cadence, evaluates each new
//! identifier and writes the verdict back with `BrokerClient::report`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::ledger::Verdict;
use crate::relay::RelayState;

/// Attribute holding the identifier reported by the reader.
pub const ID_ATTRIBUTE: &str = "idRecebido";

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("broker returned {status}")]
    Status { status: u16 },

    #[error("malformed broker response: {0}")]
    Malformed(String),
}

/// Typed attribute in an NGSI v2 partial update.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TextAttribute {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
}

impl TextAttribute {
    fn text(value: &str) -> Self { Self { kind: "Text", value: value.to_string() } }
}

/// Body of `PATCH <entity>/attrs`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VerdictAttributes {
    #[serde(rename = "statusAcesso")]
    pub status_acesso: TextAttribute,
    #[serde(rename = "nomeUsuario")]
    pub nome_usuario: TextAttribute,
    pub departamento: TextAttribute,
}

impl From<&Verdict> for VerdictAttributes {
    fn from(v: &Verdict) -> Self {
        Self {
            status_acesso: TextAttribute::text(v.outcome.as_str()),
            nome_usuario: TextAttribute::text(&v.nome),
            departamento: TextAttribute::text(&v.departamento),
        }
    }
}

/// Pull the reported identifier out of an entity body.
///
/// `Ok(None)` when the entity has no `idRecebido` attribute yet; an attribute without a
/// string `value` is malformed.
pub fn extract_reported_id(body: &serde_json::Value) -> Result<Option<String>, BrokerError> {
    let Some(attr) = body.get(ID_ATTRIBUTE) else { return Ok(None) };
    match attr.get("value") {
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(BrokerError::Malformed(format!("{ID_ATTRIBUTE}.value is not a string: {other}"))),
        None => Err(BrokerError::Malformed(format!("{ID_ATTRIBUTE} has no value"))),
    }
}

#[derive(Debug, Clone)]
pub struct BrokerClient {
    entity_url: String,
    client: Client,
}

impl BrokerClient {
    /// `timeout` bounds each call end to end.
    pub fn new(entity_url: impl Into<String>, timeout: Duration) -> Result<Self, BrokerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { entity_url: entity_url.into(), client })
    }

    pub fn entity_url(&self) -> &str { &self.entity_url }

    /// Read the entity and return the currently reported identifier, if any.
    pub async fn fetch_reported_id(&self) -> Result<Option<String>, BrokerError> {
        let resp = self.client.get(&self.entity_url).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(BrokerError::Status { status: resp.status().as_u16() });
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| BrokerError::Malformed(e.to_string()))?;
        extract_reported_id(&body)
    }

    /// Push a verdict as a partial attribute update. 200 and 204 count as delivered.
    pub async fn report(&self, verdict: &Verdict) -> Result<(), BrokerError> {
        let url = format!("{}/attrs", self.entity_url);
        let resp = self
            .client
            .patch(&url)
            .json(&VerdictAttributes::from(verdict))
            .send()
            .await?;
        match resp.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                info!(target: "broker", status = verdict.outcome.as_str(), "verdict sent to broker");
                Ok(())
            }
            other => Err(BrokerError::Status { status: other.as_u16() }),
        }
    }
}

/// Single poller instance; owns the last-seen identifier outright.
pub struct BrokerPoller {
    client: BrokerClient,
    state: RelayState,
    interval: Duration,
    active: Arc<AtomicBool>,
    last_seen: Option<String>,
}

impl BrokerPoller {
    pub fn new(client: BrokerClient, state: RelayState, interval: Duration) -> Self {
        Self { client, state, interval, active: Arc::new(AtomicBool::new(true)), last_seen: None }
    }

    /// Flag checked before every cycle; clearing it stops the loop after the current sleep.
    pub fn active_flag(&self) -> Arc<AtomicBool> { Arc::clone(&self.active) }

    pub fn last_seen(&self) -> Option<&str> { self.last_seen.as_deref() }

    /// Poll until the active flag is cleared. Errors never end the loop and never shorten
    /// or stretch the cadence.
    pub async fn run(mut self) {
        let interval_ms = self.interval.as_millis() as u64;
        info!(target: "broker", url = %self.client.entity_url(), interval_ms, "broker monitoring started");
        while self.active.load(Ordering::SeqCst) {
            self.poll_once().await;
            tokio::time::sleep(self.interval).await;
        }
        info!(target: "broker", "broker monitoring stopped");
    }

    /// One cycle: fetch, dedupe, evaluate, report. Returns the verdict when a new
    /// identifier was evaluated.
    pub async fn poll_once(&mut self) -> Option<Verdict> {
        let id = match self.client.fetch_reported_id().await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!(target: "broker", "entity has no {} attribute", ID_ATTRIBUTE);
                return None;
            }
            Err(BrokerError::Http(e)) => {
                warn!(target: "broker", error = %e, "failed to reach broker");
                return None;
            }
            Err(e) => {
                error!(target: "broker", error = %e, "broker poll failed");
                return None;
            }
        };
        if id.is_empty() || self.last_seen.as_deref() == Some(id.as_str()) {
            return None;
        }
        self.last_seen = Some(id.clone());
        let verdict = self.state.evaluate(&id);
        if let Err(e) = self.client.report(&verdict).await {
            error!(target: "broker", error = %e, id = %verdict.id, "failed to send verdict to broker");
        }
        Some(verdict)
    }
}
