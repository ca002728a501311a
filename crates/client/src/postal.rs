//! Postal code (CEP) lookup.
//!
//! Lookups only pre-fill an address form. A failed or empty lookup never
//! blocks the customer from typing the address by hand.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use deskly_core::{ApiError, ErrorClass, PostalAddress, normalize_zip};
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::http::transport_error;

const CEP_DIGITS: usize = 8;

/// Resolve a zip code to street-level data.
pub trait PostalLookup: Send + Sync {
    /// `Ok(None)` when the code is well formed but unknown.
    fn lookup(
        &self,
        zip_code: &str,
    ) -> impl Future<Output = Result<Option<PostalAddress>, ApiError>> + Send;
}

/// Client for a ViaCEP-compatible service (`{base}/ws/{cep}/json/`).
///
/// Results, including "not found", are cached for an hour.
#[derive(Clone)]
pub struct ViaCep {
    inner: Arc<ViaCepInner>,
}

struct ViaCepInner {
    client: reqwest::Client,
    base: Url,
    cache: Cache<String, Option<PostalAddress>>,
}

impl ViaCep {
    /// # Errors
    ///
    /// Returns a `Network` error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(transport_error)?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Ok(Self {
            inner: Arc::new(ViaCepInner {
                client,
                base: config.postal_url.clone(),
                cache,
            }),
        })
    }

    fn endpoint(&self, cep: &str) -> Result<Url, ApiError> {
        self.inner
            .base
            .join(&format!("/ws/{cep}/json/"))
            .map_err(|e| ApiError::new(ErrorClass::Validation, e.to_string()))
    }
}

impl PostalLookup for ViaCep {
    #[instrument(skip(self))]
    async fn lookup(&self, zip_code: &str) -> Result<Option<PostalAddress>, ApiError> {
        let cep = validate_cep(zip_code)?;

        if let Some(cached) = self.inner.cache.get(&cep).await {
            debug!("Cache hit for CEP");
            return Ok(cached);
        }

        let response = self
            .inner
            .client
            .get(self.endpoint(&cep)?)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.map_err(transport_error)?;
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        let body: ViaCepResponse = response.json().await.map_err(transport_error)?;
        let found = body.into_postal_address(&cep);
        self.inner.cache.insert(cep, found.clone()).await;
        Ok(found)
    }
}

/// Normalize a zip code and require exactly eight digits.
///
/// # Errors
///
/// Returns a `Validation` error on `zipCode` otherwise.
pub fn validate_cep(zip_code: &str) -> Result<String, ApiError> {
    let cep = normalize_zip(zip_code);
    if cep.len() == CEP_DIGITS {
        Ok(cep)
    } else {
        Err(ApiError::validation("zipCode", "CEP must have 8 digits"))
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

impl ViaCepResponse {
    fn into_postal_address(self, cep: &str) -> Option<PostalAddress> {
        let not_found = match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(text)) => text == "true",
            _ => false,
        };
        if not_found {
            return None;
        }
        Some(PostalAddress {
            zip_code: cep.to_owned(),
            street: self.logradouro,
            district: self.bairro,
            city: self.localidade,
            state: self.uf,
        })
    }
}
