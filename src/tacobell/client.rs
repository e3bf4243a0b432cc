//! Taco Bell web services client
//!
//! Read-only client for the stores and menu endpoints. One instance is built at
//! startup and shared by every tool call.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use validator::Validate;

use crate::config::tacobell::{ACCEPT_LANGUAGE, SITE_URL};
use crate::config::Config;
use crate::error::{snippet, ConfigError, ParseError, Result, UpstreamError};
use crate::tacobell::menu::parse_menu;
use crate::tacobell::stores::{narrow, parse_stores};
use crate::tacobell::types::{LocationQuery, MenuQuery, MenuResult, StoreRecord};

/// Taco Bell API client
#[derive(Debug, Clone)]
pub struct TacoBellClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// Upstream configuration
    config: Config,
}

impl TacoBellClient {
    /// Create a new client from configuration
    pub fn new(config: Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Store Operations ====================

    /// Search for stores near a point
    pub async fn search_locations(&self, query: &LocationQuery) -> Result<Vec<StoreRecord>> {
        query.validate()?;

        let mut params = vec![
            ("latitude", query.latitude.to_string()),
            ("longitude", query.longitude.to_string()),
        ];
        if self.config.cache_buster {
            params.push(("_", timestamp_millis().to_string()));
        }

        let referer = format!("{}/locations", SITE_URL);
        let payload = self
            .get_json(&self.config.stores_url(), &params, &referer)
            .await?;

        let stores = parse_stores(payload)?;
        let total = stores.len();
        let stores = narrow(stores, query);

        tracing::debug!(total, returned = stores.len(), "Store search complete");
        Ok(stores)
    }

    // ==================== Menu Operations ====================

    /// Get the menu for a store
    pub async fn get_menu(&self, query: &MenuQuery) -> Result<MenuResult> {
        let referer = format!(
            "{}/food?store={}",
            SITE_URL,
            urlencoding::encode(query.store_id())
        );
        let payload = self
            .get_json(&self.config.menu_url(query.store_id()), &[], &referer)
            .await?;

        Ok(parse_menu(payload)?)
    }

    /// Issue one GET and decode the body as JSON
    async fn get_json(&self, url: &str, params: &[(&str, String)], referer: &str) -> Result<Value> {
        tracing::debug!(url, "Sending upstream request");

        let response = self
            .http_client
            .get(url)
            .query(params)
            .header(header::REFERER, referer)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Upstream request failed");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                snippet: snippet(&body),
            }
            .into());
        }

        serde_json::from_str(&body).map_err(|e| {
            ParseError::InvalidJson {
                message: e.to_string(),
                snippet: snippet(&body),
            }
            .into()
        })
    }
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
