//! Shared JSON-over-HTTP plumbing.
//!
//! Each [`JsonClient`] has its own cookie jar, so a session cookie set by
//! one server's login is only ever sent back to that server.

use std::sync::Arc;
use std::time::Duration;

use deskly_core::{ApiError, ErrorClass};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

#[derive(Clone)]
pub struct JsonClient {
    inner: Arc<JsonClientInner>,
}

struct JsonClientInner {
    client: reqwest::Client,
    base: Url,
}

impl JsonClient {
    /// Build a client rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns a `Network` error if the underlying client cannot be built.
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(JsonClientInner { client, base }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::new(ErrorClass::Validation, format!("invalid path {path}: {e}")))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = self.url(path)?;
        tracing::debug!(%method, %url, "Sending request");

        let mut request = self.inner.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let err = ApiError::from_response(status.as_u16(), &body);
        tracing::debug!(status = %status, class = %err.class, "Request failed");
        Err(err)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, Some(body)).await?;
        decode(response).await
    }

    /// `POST` with no request body and no response body.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::POST, path, None).await?;
        Ok(())
    }

    /// `POST` with no request body, decoding the response.
    pub async fn post_unit<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::POST, path, None).await?;
        decode(response).await
    }

    pub async fn put_unit<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::PUT, path, None).await?;
        decode(response).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::PATCH, path, Some(body)).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(transport_error)
}

/// Classify a `reqwest` failure. No response means `Network`; a response
/// that cannot be decoded is the server's fault.
pub fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout()
    } else if err.is_decode() {
        ApiError::new(ErrorClass::Server, format!("invalid response body: {err}"))
    } else {
        ApiError::network(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_gets_trailing_slash() {
        let base = Url::parse("http://127.0.0.1:3000/shop").unwrap();
        let client = JsonClient::new(&base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url("/api/orders").unwrap().as_str(),
            "http://127.0.0.1:3000/shop/api/orders"
        );
    }

    #[test]
    fn test_root_base() {
        let base = Url::parse("http://127.0.0.1:3001").unwrap();
        let client = JsonClient::new(&base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url("api/orders/7/status").unwrap().as_str(),
            "http://127.0.0.1:3001/api/orders/7/status"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let client = JsonClient::new(&base, Duration::from_millis(500)).unwrap();
        let err = client.get::<serde_json::Value>("/health").await.unwrap_err();
        assert_eq!(err.class, ErrorClass::Network);
    }
}
