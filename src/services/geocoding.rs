use async_trait::async_trait;
use serde::Deserialize;

use crate::models::geo::GeoPoint;
use crate::services::ProviderError;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a free-text address to a coordinate. The first candidate
    /// wins; zero candidates is an error.
    async fn geocode(&self, address: &str) -> Result<GeoPoint, ProviderError>;
}

pub struct GoogleGeocoder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, ProviderError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<GeocodeResponse>()
            .await?;

        if response.status != "OK" {
            return Err(ProviderError::Status {
                service: "geocoding",
                status: response.status,
            });
        }

        response
            .results
            .into_iter()
            .next()
            .map(|candidate| GeoPoint {
                lat: candidate.geometry.location.lat,
                lng: candidate.geometry.location.lng,
            })
            .ok_or(ProviderError::NoCandidates)
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
}

#[derive(Deserialize)]
struct GeocodeCandidate {
    geometry: WireGeometry,
}

#[derive(Deserialize)]
struct WireGeometry {
    location: WireLocation,
}

#[derive(Deserialize)]
struct WireLocation {
    lat: f64,
    lng: f64,
}
