use std::sync::Arc;
use std::time::Instant;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::client::{Api, ApiError, ExamApi, GenerationApi, ResultApi};
use crate::config::ApiConfig;

mod endpoints;
mod mapping;

/// reqwest-backed Exam API client.
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpInitError {
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

impl HttpExamApi {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `HttpInitError` if the TLS backend cannot be initialized.
    pub fn new(config: &ApiConfig) -> Result<Self, HttpInitError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        if config.token.is_none() {
            warn!("no API token configured, requests will be unauthenticated");
        }
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Unavailable(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.request(Method::GET, url.clone());
        self.execute(Method::GET, url, request).await
    }

    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, url.clone()).json(body);
        self.execute(Method::POST, url, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let started = Instant::now();
        debug!(%method, %url, "api request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%method, %url, error = %err, "api request failed");
                return Err(err.into());
            }
        };

        let status = response.status();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if !status.is_success() {
            warn!(%method, %url, status = status.as_u16(), elapsed_ms, "api error response");
            return Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound,
                other => ApiError::HttpStatus(other),
            });
        }

        debug!(%method, %url, status = status.as_u16(), elapsed_ms, "api response");
        Ok(response.json::<T>().await?)
    }
}

impl Api {
    /// Build an `Api` bundle backed by HTTP.
    ///
    /// # Errors
    ///
    /// Returns `HttpInitError` if the client cannot be built.
    pub fn http(config: &ApiConfig) -> Result<Self, HttpInitError> {
        let api = HttpExamApi::new(config)?;
        let exams: Arc<dyn ExamApi> = Arc::new(api.clone());
        let results: Arc<dyn ResultApi> = Arc::new(api.clone());
        let generation: Arc<dyn GenerationApi> = Arc::new(api);
        Ok(Self {
            exams,
            results,
            generation,
        })
    }
}
