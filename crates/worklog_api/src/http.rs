//! Shared JSON-over-HTTP transport used by the service clients.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct Transport {
    http: HttpClient,
    config: ApiConfig,
    limiter: RateLimiter,
}

impl Transport {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.cooldown);
        Self::new_with_limiter(config, limiter)
    }

    pub fn new_with_limiter(config: ApiConfig, limiter: RateLimiter) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.get_with_query(path, None).await
    }

    pub async fn get_with_query<T>(&self, path: &str, query: Option<&[(&str, &str)]>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.limiter.hit().await;
        debug!(method = "GET", path, "sending request");
        let mut request = self.http.get(self.url_for(path));
        if let Some(params) = query {
            request = request.query(params);
        }
        let response = request.send().await?;
        Self::parse_json(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(Method::POST, path, Some(body)).await
    }

    pub async fn patch_empty(&self, path: &str) -> Result<()> {
        self.send_expect_empty(Method::PATCH, path, None::<&Value>).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send_expect_empty(Method::DELETE, path, None::<&Value>).await
    }

    pub async fn send_with_body<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.limiter.hit().await;
        debug!(method = %method, path, "sending request");
        let mut request = self.http.request(method, self.url_for(path));
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await?;
        Self::parse_json(response).await
    }

    pub async fn send_expect_empty<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.limiter.hit().await;
        debug!(method = %method, path, "sending request");
        let mut request = self.http.request(method, self.url_for(path));
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await?;
        Self::ensure_success(response).await
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(path.trim_start_matches('/'));
        base
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            // Empty 2xx bodies decode like JSON `null` so `Option<T>` targets work.
            let body = if body.trim().is_empty() { "null" } else { body.as_str() };
            serde_json::from_str(body).map_err(ApiError::from)
        } else {
            Err(Self::failure(status, response).await)
        }
    }

    async fn ensure_success(response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::failure(status, response).await)
        }
    }

    async fn failure(status: StatusCode, response: Response) -> ApiError {
        let url = response.url().path().to_string();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            warn!(path = %url, ?retry_after, "rate limited");
            return ApiError::RateLimited { retry_after };
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), path = %url, "request failed");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ApiError::Authentication(format!("Access denied ({}) - {}", status, body))
            }
            StatusCode::NOT_FOUND => ApiError::NotFound(url),
            _ => ApiError::from_body(status, &body),
        }
    }
}

fn build_http_client(config: &ApiConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(config.auth_method.header_value())?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(config.user_agent.clone())?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| ApiError::Other(err.to_string()))
}

fn header_value(value: String) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(&value).map_err(|err| ApiError::Other(err.to_string()))?;
    header.set_sensitive(true);
    Ok(header)
}
