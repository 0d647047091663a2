use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::error::{BuilderError, Upstream};

/// Pooled HTTP client shared by every worker. Cloning is cheap and clones
/// share one connection pool.
#[derive(Clone)]
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn new(timeout: Duration) -> Result<Self, BuilderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("compound-builder/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BuilderError::InvalidConfig(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| BuilderError::InvalidConfig(err.to_string()))?;
        Ok(Self { client })
    }

    /// Sends a GET and returns the response whatever its status.
    pub fn get(&self, upstream: Upstream, url: &str) -> Result<Response, BuilderError> {
        tracing::debug!(%upstream, url, "GET");
        self.client
            .get(url)
            .send()
            .map_err(|err| BuilderError::http(upstream, err))
    }

    pub fn get_text(&self, upstream: Upstream, url: &str) -> Result<String, BuilderError> {
        let response = Self::handle_status(upstream, self.get(upstream, url)?)?;
        response
            .text()
            .map_err(|err| BuilderError::http(upstream, err))
    }

    pub fn get_json(&self, upstream: Upstream, url: &str) -> Result<Value, BuilderError> {
        let response = Self::handle_status(upstream, self.get(upstream, url)?)?;
        response
            .json()
            .map_err(|err| BuilderError::payload(upstream, err.to_string()))
    }

    /// Like [`get_json`](Self::get_json), with `query` form-encoded onto
    /// the URL.
    pub fn get_json_query(
        &self,
        upstream: Upstream,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, BuilderError> {
        tracing::debug!(%upstream, url, ?query, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| BuilderError::http(upstream, err))?;
        Self::handle_status(upstream, response)?
            .json()
            .map_err(|err| BuilderError::payload(upstream, err.to_string()))
    }

    pub fn handle_status(upstream: Upstream, response: Response) -> Result<Response, BuilderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| format!("{upstream} request failed"));
        Err(BuilderError::Status {
            upstream,
            status,
            message,
        })
    }
}
