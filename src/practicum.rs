use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::ApiError;

/// Anything that can answer "which homeworks changed since `from_date`".
#[async_trait]
pub trait HomeworkSource: Send + Sync {
    async fn fetch(&self, from_date: i64) -> Result<Value, ApiError>;
}

/// Client for the Practicum homework status endpoint.
pub struct PracticumClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl PracticumClient {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl HomeworkSource for PracticumClient {
    async fn fetch(&self, from_date: i64) -> Result<Value, ApiError> {
        debug!("GET {} with from_date={}", self.endpoint, from_date);

        let response = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|e| ApiError::transport(&self.endpoint, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            error!("Homework API returned {} for {}", status, self.endpoint);
            return Err(ApiError::Status { status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(&self.endpoint, e))?;
        let value = serde_json::from_str(&body).map_err(ApiError::Decode)?;

        info!("Received homework statuses from {}", self.endpoint);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn statuses(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<Value>, axum::http::StatusCode> {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "OAuth test-token");
        if !authorized {
            return Err(axum::http::StatusCode::UNAUTHORIZED);
        }
        let from_date: i64 = params
            .get("from_date")
            .and_then(|v| v.parse().ok())
            .ok_or(axum::http::StatusCode::BAD_REQUEST)?;
        Ok(Json(json!({
            "homeworks": [{"homework_name": "hw", "status": "reviewing"}],
            "current_date": from_date + 1
        })))
    }

    async fn spawn_api() -> String {
        let app = Router::new()
            .route("/statuses/", get(statuses))
            .route("/broken/", get(|| async { "<html>not json</html>" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(endpoint: &str, token: &str) -> PracticumClient {
        PracticumClient::new(endpoint, token, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_token_and_cursor() {
        let base = spawn_api().await;
        let api = client(&format!("{base}/statuses/"), "test-token");

        let value = api.fetch(1_000).await.unwrap();
        assert_eq!(value["current_date"], 1_001);
        assert_eq!(value["homeworks"][0]["status"], "reviewing");
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_status_error() {
        let base = spawn_api().await;
        let api = client(&format!("{base}/statuses/"), "wrong-token");

        match api.fetch(1_000).await {
            Err(ApiError::Status { status }) => assert_eq!(status, StatusCode::UNAUTHORIZED),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_invalid_json_is_decode_error() {
        let base = spawn_api().await;
        let api = client(&format!("{base}/broken/"), "test-token");

        assert!(matches!(api.fetch(0).await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client(&format!("http://{addr}/statuses/"), "test-token");
        let err = api.fetch(0).await.unwrap_err();
        assert!(err.is_transport());
    }
}
