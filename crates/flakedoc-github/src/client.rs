//! HTTP client and configuration for the GitHub REST API.

use crate::error::GithubError;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default API base when `GITHUB_API` is unset.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default request timeout in seconds when `HTTP_TIMEOUT` is unset.
const DEFAULT_TIMEOUT_SECS: f64 = 20.0;

/// GitHub adapter configuration
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API base URL
    pub api_base: String,
    /// Bearer token (optional for public repositories)
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        let timeout_secs = std::env::var("HTTP_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        GithubConfig {
            api_base: std::env::var("GITHUB_API")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            token: std::env::var("GITHUB_TOKEN").ok(),
            timeout: Duration::from_secs_f64(timeout_secs),
        }
    }
}

impl GithubConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific API base
    pub fn new(api_base: &str) -> Self {
        GithubConfig {
            api_base: api_base.to_string(),
            token: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// Client for the GitHub Actions endpoints used as evidence sources.
pub struct ActionsClient {
    pub(crate) config: GithubConfig,
    http: reqwest::Client,
    pub(crate) failure_pattern: Regex,
}

impl ActionsClient {
    /// Create a new client
    pub fn new(config: GithubConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("flakedoc/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        // Matches the failure markers CI log lines carry.
        let failure_pattern = Regex::new(r"(?i)\b(FAIL|FAILED|ERROR|Traceback|AssertionError)\b")
            .expect("failure pattern");

        ActionsClient {
            config,
            http,
            failure_pattern,
        }
    }

    /// Create client from environment variables
    pub fn from_env() -> Self {
        Self::new(GithubConfig::from_env())
    }

    /// GET a JSON document, applying auth and media-type headers.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, GithubError> {
        debug!(url, "github api request");
        let mut request = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    /// GET a plain-text document (job logs).
    pub(crate) async fn get_text(&self, url: &str) -> Result<String, GithubError> {
        debug!(url, "github api request");
        let mut request = self.http.get(url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
