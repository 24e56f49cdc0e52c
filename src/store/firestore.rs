//! Cloud document store reached over REST.
//! Documents live in a `translations` collection keyed by the hex of the
//! normalized key hash. HTTP status codes map onto the error taxonomy:
//! 404 is an ordinary miss, 408/429/5xx are transient, other 4xx permanent.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{TranslationEntry, TranslationStore};
use crate::error::TranslateError;
use crate::key::NormalizedKey;
use crate::lang::TargetLanguage;

pub struct FirestoreRestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirestoreRestStore {
    pub fn new(base_url: String, api_key: String) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TranslateError::Store(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/translations/{id}", self.base_url)
    }

    fn map_status(status: reqwest::StatusCode, body: &str) -> TranslateError {
        let snippet: String = body.chars().take(200).collect();
        if status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error() {
            TranslateError::Transient(format!("store returned {status}: {snippet}"))
        } else {
            TranslateError::Store(format!("store returned {status}: {snippet}"))
        }
    }

    fn map_transport(e: reqwest::Error) -> TranslateError {
        if e.is_timeout() || e.is_connect() {
            TranslateError::Transient(format!("store transport: {e}"))
        } else {
            TranslateError::Store(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    entries: Vec<TranslationEntry>,
}

#[async_trait]
impl TranslationStore for FirestoreRestStore {
    async fn get(&self, key: &NormalizedKey) -> Result<Option<TranslationEntry>, TranslateError> {
        let response = self
            .http
            .get(self.document_url(&key.hex()))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, &body));
        }

        let entry: TranslationEntry = response
            .json()
            .await
            .map_err(|e| TranslateError::Store(format!("store payload: {e}")))?;
        debug!(lang = %entry.target_lang, "store document hit");
        Ok(Some(entry))
    }

    async fn put(
        &self,
        key: &NormalizedKey,
        entry: &TranslationEntry,
    ) -> Result<(), TranslateError> {
        let response = self
            .http
            .put(self.document_url(&key.hex()))
            .bearer_auth(&self.api_key)
            .json(entry)
            .send()
            .await
            .map_err(Self::map_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "store write rejected");
            return Err(Self::map_status(status, &body));
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        lang: Option<TargetLanguage>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TranslationEntry>, TranslateError> {
        let mut request = self
            .http
            .get(format!("{}/translations", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[
                ("q", query.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ]);
        if let Some(lang) = lang {
            request = request.query(&[("lang", lang.code())]);
        }

        let response = request.send().await.map_err(Self::map_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, &body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Store(format!("store payload: {e}")))?;
        Ok(parsed.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        let transient = FirestoreRestStore::map_status(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "overloaded",
        );
        assert!(transient.is_retryable());

        let rate_limited =
            FirestoreRestStore::map_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(rate_limited.is_retryable());

        let rejected = FirestoreRestStore::map_status(reqwest::StatusCode::FORBIDDEN, "denied");
        assert!(matches!(rejected, TranslateError::Store(_)));
    }
}
