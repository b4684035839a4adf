use crate::error::ScrapeError;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Header pool shipped with the crate, used when no `headers_file` is configured
const BUILTIN_HEADER_POOL: &str = include_str!("../resources/headers.json");

/// Desktop browser user agents for sources that only look at the User-Agent
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.2420.81",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// HTTP header name → value, kept in insertion order.
///
/// Some sites fingerprint the order in which a client sends its header
/// fields, so the order a set was recorded in is the order it is sent in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderSet(IndexMap<String, String>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
impl HeaderSet {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Produces a fresh header set for every request
pub trait HeaderSource: Send + Sync {
    fn produce(&self) -> HeaderSet;
}

/// Pre-recorded, order-sensitive header sets; each request gets one picked
/// uniformly at random. Loaded once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct PooledHeaders {
    pool: Vec<HeaderSet>,
}

impl PooledHeaders {
    /// Parse a JSON array of flat string → string objects
    pub fn from_json(json: &str) -> Result<Self> {
        let pool: Vec<HeaderSet> =
            serde_json::from_str(json).context("Header pool must be a JSON array of string maps")?;

        if pool.is_empty() {
            return Err(ScrapeError::EmptyHeaderPool.into());
        }

        Ok(Self { pool })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read header pool {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid header pool {}", path.display()))
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_HEADER_POOL)
    }

    /// Load from `path` when given, otherwise fall back to the built-in pool
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let pool = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin()?,
        };
        tracing::debug!("Loaded header pool with {} header sets", pool.len());
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
impl PooledHeaders {
    pub fn sets(&self) -> &[HeaderSet] {
        &self.pool
    }
}

impl HeaderSource for PooledHeaders {
    fn produce(&self) -> HeaderSet {
        // The constructors reject an empty pool
        self.pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }
}

/// Only a realistic, randomly chosen User-Agent
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUserAgent;

impl HeaderSource for RandomUserAgent {
    fn produce(&self) -> HeaderSet {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        HeaderSet::new().with("User-Agent", user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_set_preserves_insertion_order() {
        let headers = HeaderSet::new()
            .with("Host", "example.com")
            .with("User-Agent", "test")
            .with("Accept", "*/*")
            .with("Connection", "keep-alive");

        let names: Vec<&str> = headers.names().collect();
        assert_eq!(names, vec!["Host", "User-Agent", "Accept", "Connection"]);
    }

    #[test]
    fn test_pool_from_json_keeps_field_order() {
        let json = r#"[{"Zeta": "1", "Alpha": "2", "Mid": "3"}]"#;
        let pool = PooledHeaders::from_json(json).unwrap();

        let produced = pool.produce();
        let names: Vec<&str> = produced.names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_builtin_pool_loads() {
        let pool = PooledHeaders::builtin().unwrap();
        assert!(pool.len() >= 2);
        for set in pool.sets() {
            assert!(set.get("User-Agent").is_some(), "Every pooled set needs a User-Agent");
        }
    }

    #[test]
    fn test_pool_produce_returns_member_of_pool() {
        let pool = PooledHeaders::builtin().unwrap();
        for _ in 0..20 {
            let headers = pool.produce();
            assert!(pool.sets().contains(&headers));
        }
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let err = PooledHeaders::from_json("[]").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScrapeError>(),
            Some(ScrapeError::EmptyHeaderPool)
        ));
    }

    #[test]
    fn test_pool_rejects_non_string_values() {
        assert!(PooledHeaders::from_json(r#"[{"Accept": 1}]"#).is_err());
        assert!(PooledHeaders::from_json(r#"{"Accept": "*/*"}"#).is_err());
    }

    #[test]
    fn test_missing_pool_file_is_an_error() {
        let result = PooledHeaders::load(Some(Path::new("does/not/exist/headers.json")));
        assert!(result.is_err());
    }

    #[test]
    fn test_random_user_agent_only_sets_user_agent() {
        let headers = RandomUserAgent.produce();
        assert_eq!(headers.len(), 1);

        let user_agent = headers.get("User-Agent").unwrap();
        assert!(USER_AGENTS.contains(&user_agent));
        assert!(user_agent.starts_with("Mozilla/5.0"));
    }
}
