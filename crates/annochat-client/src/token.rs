//! HTTP token provider.
//!
//! `GET token_url` returning `{ "token": string }`. Every call is a fresh
//! request; nothing is cached.

use std::time::Duration;

use annochat_app::TokenProvider;
use serde::Deserialize;

use crate::TokenError;

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Fetches chat tokens from the token endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpTokenProvider {
    /// Provider for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TokenError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TokenError::Request(e.to_string()))?;
        Ok(Self { http, url: url.into() })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TokenProvider for HttpTokenProvider {
    type Error = TokenError;

    async fn fetch_token(&self) -> Result<String, TokenError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| TokenError::Request(e.to_string()))?;
        let token = parse_token(&body)?;
        tracing::debug!(url = %self.url, "fetched chat token");
        Ok(token)
    }
}

/// Extract the token from a response body.
pub fn parse_token(body: &str) -> Result<String, TokenError> {
    serde_json::from_str::<TokenResponse>(body)
        .map(|response| response.token)
        .map_err(|e| TokenError::Malformed(e.to_string()))
}
