//!
//! Relay configuration
//! -------------------
//! Settings are resolved as CLI flag > environment variable > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_BROKER_URL: &str = "http://130.131.19.158:1026/v2/entities/TesteESP32";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_COLLECTION: &str = "tags";

pub const USAGE: &str = "access_relay\n\nUSAGE:\n  access_relay [--mode broker|lookup] [--host H] [--http-port N] [--broker-url URL]\n               [--poll-interval-ms N] [--directory PATH] [--collection NAME]\n\nOPTIONS:\n  --mode M              broker (poll the context broker) or lookup (serve /api/validar) (env: ACCESS_RELAY_MODE, default broker)\n  --host H              bind address (env: ACCESS_RELAY_HOST, default 0.0.0.0)\n  --http-port N         HTTP port (env: ACCESS_RELAY_HTTP_PORT, default 5000)\n  --broker-url URL      broker entity URL (env: ACCESS_RELAY_BROKER_URL)\n  --poll-interval-ms N  broker poll cadence (env: ACCESS_RELAY_POLL_INTERVAL_MS, default 2000)\n  --directory PATH      JSON authorization directory (env: ACCESS_RELAY_DIRECTORY_FILE, default built-in)\n  --collection NAME     document store table (env: ACCESS_RELAY_COLLECTION, default tags)\n\nENVIRONMENT:\n  DATABASE_URL                 document store connection string (lookup mode)\n  ACCESS_RELAY_HTTP_TIMEOUT_MS outbound call timeout (default 5000)\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Poll the context broker and report verdicts back.
    Broker,
    /// Answer synchronous lookups from the document store.
    Lookup,
}

impl RelayMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "broker" => Some(RelayMode::Broker),
            "lookup" => Some(RelayMode::Lookup),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelayMode::Broker => "broker",
            RelayMode::Lookup => "lookup",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub mode: RelayMode,
    pub host: String,
    pub http_port: u16,
    pub broker_url: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub directory_file: Option<PathBuf>,
    pub database_url: Option<String>,
    pub collection: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: RelayMode::Broker,
            host: DEFAULT_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            broker_url: DEFAULT_BROKER_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            directory_file: None,
            database_url: None,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl RelayConfig {
    pub fn from_process(args: &[String]) -> Result<Self> {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve<F>(args: &[String], env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = RelayConfig::default();
        let pick = |flag: &str, var: &str| arg_value(args, flag).or_else(|| env(var).filter(|v| !v.trim().is_empty()));

        let mode = match pick("--mode", "ACCESS_RELAY_MODE") {
            Some(m) => RelayMode::parse(&m).ok_or_else(|| anyhow!("unknown mode '{}', expected broker or lookup", m))?,
            None => d.mode,
        };
        let http_port = match pick("--http-port", "ACCESS_RELAY_HTTP_PORT") {
            Some(p) => p.trim().parse::<u16>().map_err(|_| anyhow!("invalid HTTP port '{}'", p))?,
            None => d.http_port,
        };
        let poll_interval = match pick("--poll-interval-ms", "ACCESS_RELAY_POLL_INTERVAL_MS") {
            Some(v) => Duration::from_millis(parse_millis(&v, "poll interval")?),
            None => d.poll_interval,
        };
        let http_timeout = match env("ACCESS_RELAY_HTTP_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse_millis(&v, "HTTP timeout")?),
            None => d.http_timeout,
        };
        let collection = pick("--collection", "ACCESS_RELAY_COLLECTION").unwrap_or(d.collection);
        if !is_plain_identifier(&collection) {
            bail!("invalid collection name '{}'", collection);
        }

        Ok(Self {
            mode,
            host: pick("--host", "ACCESS_RELAY_HOST").unwrap_or(d.host),
            http_port,
            broker_url: pick("--broker-url", "ACCESS_RELAY_BROKER_URL").unwrap_or(d.broker_url),
            poll_interval,
            http_timeout,
            directory_file: pick("--directory", "ACCESS_RELAY_DIRECTORY_FILE").map(PathBuf::from),
            database_url: env("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            collection,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_millis(v: &str, what: &str) -> Result<u64> {
    match v.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(anyhow!("invalid {} '{}'", what, v)),
        Ok(ms) => Ok(ms),
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, optionally schema-qualified once (`schema.table`).
pub fn is_plain_identifier(s: &str) -> bool {
    let part_ok = |p: &str| {
        let mut chars = p.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    match s.split_once('.') {
        Some((schema, table)) => part_ok(schema) && part_ok(table),
        None => part_ok(s),
    }
}
