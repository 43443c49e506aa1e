//! Estimation gateway: turns the collected answers into requests to the
//! remote estimation service and never lets a failure escape.
//!
//! Contract:
//! - `POST {base}/api/estimate` with every answer plus `Location`; the
//!   response carries `predicted_cost`.
//! - `POST {base}/api/value` (when enabled) with the same body plus
//!   `renovation_cost`; the response carries `post_renovation_value`.
//!
//! Any failure along the way (network, timeout, non-2xx status, body that
//! does not match) yields a zero cost and a zero value. A failed second call
//! zeroes the cost as well, so a cost is never shown next to a missing value.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::steps::types::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub predicted_cost: f64,
    pub post_renovation_value: f64,
    /// True when the numbers are the zero fallback rather than an estimate
    #[serde(default)]
    pub fallback: bool,
}

impl EstimationResult {
    pub fn unavailable() -> Self {
        Self {
            predicted_cost: 0.0,
            post_renovation_value: 0.0,
            fallback: true,
        }
    }
}

#[async_trait]
pub trait Estimator: Send + Sync {
    /// Estimate cost and post-renovation value. Infallible by contract.
    async fn estimate(&self, answers: &Map<String, Value>, location: &str) -> EstimationResult;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub estimate_path: String,
    /// Second call for the post-renovation value; `None` skips it
    pub value_path: Option<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            estimate_path: "/api/estimate".to_string(),
            value_path: Some("/api/value".to_string()),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Error, Debug)]
enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("estimator returned {0}")]
    Status(StatusCode),
}

#[derive(Deserialize)]
struct EstimateResponse {
    predicted_cost: f64,
}

#[derive(Deserialize)]
struct ValueResponse {
    post_renovation_value: f64,
}

/// [`Estimator`] backed by the HTTP estimation service.
pub struct HttpEstimationGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpEstimationGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn try_estimate(
        &self,
        answers: &Map<String, Value>,
        location: &str,
    ) -> Result<EstimationResult, GatewayError> {
        let mut body = answers.clone();
        body.insert(session_keys::LOCATION.to_string(), json!(location));

        let estimate: EstimateResponse = self.post(&self.config.estimate_path, &body).await?;
        debug!(predicted_cost = estimate.predicted_cost, "Cost estimate received");

        let post_renovation_value = match &self.config.value_path {
            Some(path) => {
                body.insert("renovation_cost".to_string(), json!(estimate.predicted_cost));
                let value: ValueResponse = self.post(path, &body).await?;
                value.post_renovation_value
            }
            None => 0.0,
        };

        Ok(EstimationResult {
            predicted_cost: estimate.predicted_cost,
            post_renovation_value,
            fallback: false,
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Map<String, Value>,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl Estimator for HttpEstimationGateway {
    async fn estimate(&self, answers: &Map<String, Value>, location: &str) -> EstimationResult {
        match self.try_estimate(answers, location).await {
            Ok(result) => {
                info!(
                    location = %location,
                    predicted_cost = result.predicted_cost,
                    post_renovation_value = result.post_renovation_value,
                    "Estimate complete"
                );
                result
            }
            Err(e) => {
                warn!(location = %location, error = %e, "Estimation failed, using zero estimate");
                EstimationResult::unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use pretty_assertions::assert_eq;

    fn answers() -> Map<String, Value> {
        let mut answers = Map::new();
        answers.insert("renovation_type".to_string(), json!(["Kitchen"]));
        answers.insert("property_size".to_string(), json!(900));
        answers
    }

    fn gateway(server: &ServerGuard, value_path: Option<&str>) -> HttpEstimationGateway {
        HttpEstimationGateway::new(GatewayConfig {
            base_url: server.url(),
            value_path: value_path.map(str::to_string),
            timeout: Duration::from_secs(2),
            ..GatewayConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn two_call_sequence() {
        let mut server = Server::new_async().await;
        let estimate = server
            .mock("POST", "/api/estimate")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "renovation_type": ["Kitchen"],
                "property_size": 900,
                "Location": "Salford"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"predicted_cost": 42000}"#)
            .create_async()
            .await;
        let value = server
            .mock("POST", "/api/value")
            .match_body(Matcher::PartialJson(json!({
                "renovation_cost": 42000.0,
                "property_size": 900
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"post_renovation_value": 310000}"#)
            .create_async()
            .await;

        let result = gateway(&server, Some("/api/value"))
            .estimate(&answers(), "Salford")
            .await;

        estimate.assert_async().await;
        value.assert_async().await;
        assert_eq!(
            result,
            EstimationResult {
                predicted_cost: 42000.0,
                post_renovation_value: 310000.0,
                fallback: false,
            }
        );
    }

    #[tokio::test]
    async fn single_call_when_value_disabled() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/estimate")
            .with_status(200)
            .with_body(r#"{"predicted_cost": 18000}"#)
            .create_async()
            .await;
        let value = server
            .mock("POST", "/api/value")
            .expect(0)
            .create_async()
            .await;

        let result = gateway(&server, None).estimate(&answers(), "Bury").await;

        value.assert_async().await;
        assert_eq!(result.predicted_cost, 18000.0);
        assert_eq!(result.post_renovation_value, 0.0);
        assert!(!result.fallback);
    }

    #[tokio::test]
    async fn server_error_skips_second_call() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/estimate")
            .with_status(500)
            .with_body(r#"{"error": "Prediction failed"}"#)
            .create_async()
            .await;
        let value = server
            .mock("POST", "/api/value")
            .expect(0)
            .create_async()
            .await;

        let result = gateway(&server, Some("/api/value"))
            .estimate(&answers(), "Sale")
            .await;

        value.assert_async().await;
        assert_eq!(result, EstimationResult::unavailable());
    }

    #[tokio::test]
    async fn failed_value_call_zeroes_the_cost_too() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/estimate")
            .with_status(200)
            .with_body(r#"{"predicted_cost": 55000}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/value")
            .with_status(503)
            .create_async()
            .await;

        let result = gateway(&server, Some("/api/value"))
            .estimate(&answers(), "Hale")
            .await;

        assert_eq!(result, EstimationResult::unavailable());
    }

    #[tokio::test]
    async fn unexpected_body_falls_back() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/estimate")
            .with_status(200)
            .with_body(r#"{"total_predicted_cost": 1}"#)
            .create_async()
            .await;

        let result = gateway(&server, None).estimate(&answers(), "Hale").await;
        assert_eq!(result, EstimationResult::unavailable());
    }

    #[tokio::test]
    async fn unreachable_service_falls_back() {
        let gateway = HttpEstimationGateway::new(GatewayConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(500),
            ..GatewayConfig::default()
        })
        .unwrap();

        let result = gateway.estimate(&answers(), "Wigan").await;
        assert_eq!(result, EstimationResult::unavailable());
    }
}
