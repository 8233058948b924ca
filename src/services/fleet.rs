use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::shipment::{Hub, Rider, ShipmentCandidate};
use crate::models::stop::{RouteSubmission, Stop};
use crate::services::ProviderError;

/// Reference to a route that exists upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRef {
    pub id: String,
}

/// A persisted route as the fleet backend reports it, used to pre-populate
/// a draft for editing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: String,
    pub name: String,
    pub hub_id: String,
    pub rider_id: Option<String>,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

/// The REST backend owning shipments, hubs, riders and saved routes.
#[async_trait]
pub trait FleetBackend: Send + Sync {
    async fn hubs(&self) -> Result<Vec<Hub>, ProviderError>;

    /// Shipments not yet on any route, scoped to a hub. May contain
    /// duplicate ids; callers deduplicate before display.
    async fn unassigned_shipments(&self, hub_id: &str)
        -> Result<Vec<ShipmentCandidate>, ProviderError>;

    async fn available_riders(&self, hub_id: &str) -> Result<Vec<Rider>, ProviderError>;

    async fn create_route(&self, submission: &RouteSubmission) -> Result<RouteRef, ProviderError>;

    async fn update_route(
        &self,
        route_id: &str,
        submission: &RouteSubmission,
    ) -> Result<RouteRef, ProviderError>;

    async fn fetch_route(&self, route_id: &str) -> Result<RouteRecord, ProviderError>;
}

pub struct HttpFleetBackend {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpFleetBackend {
    pub fn new(http: reqwest::Client, base_url: String, api_token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.authed(self.http.get(&url)).send().await?;
        read_response(response).await
    }
}

#[async_trait]
impl FleetBackend for HttpFleetBackend {
    async fn hubs(&self) -> Result<Vec<Hub>, ProviderError> {
        self.get_json("/hubs").await
    }

    async fn unassigned_shipments(
        &self,
        hub_id: &str,
    ) -> Result<Vec<ShipmentCandidate>, ProviderError> {
        self.get_json(&format!("/hubs/{hub_id}/unassigned-shipments"))
            .await
    }

    async fn available_riders(&self, hub_id: &str) -> Result<Vec<Rider>, ProviderError> {
        self.get_json(&format!("/hubs/{hub_id}/available-riders"))
            .await
    }

    async fn create_route(&self, submission: &RouteSubmission) -> Result<RouteRef, ProviderError> {
        let url = format!("{}/routes", self.base_url);
        let response = self
            .authed(self.http.post(&url))
            .json(submission)
            .send()
            .await?;
        read_response(response).await
    }

    async fn update_route(
        &self,
        route_id: &str,
        submission: &RouteSubmission,
    ) -> Result<RouteRef, ProviderError> {
        let url = format!("{}/routes/{route_id}", self.base_url);
        let response = self
            .authed(self.http.put(&url))
            .json(submission)
            .send()
            .await?;
        read_response(response).await
    }

    async fn fetch_route(&self, route_id: &str) -> Result<RouteRecord, ProviderError> {
        self.get_json(&format!("/routes/{route_id}")).await
    }
}

async fn read_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        service: "fleet",
        status: status.as_u16(),
        message: upstream_message(&body, status),
    })
}

/// Pulls a human-readable message out of an upstream error body, falling
/// back to a generic one when the body is opaque.
fn upstream_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    format!("fleet backend request failed with http {}", status.as_u16())
}
