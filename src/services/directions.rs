use async_trait::async_trait;
use serde::Deserialize;

use crate::models::geo::GeoPoint;
use crate::models::navigation::RouteStep;
use crate::services::ProviderError;

/// One driving route between two points: the overview polyline plus the
/// first leg's maneuvers and totals. Recalculations replace it wholesale.
#[derive(Debug, Clone)]
pub struct DrivingRoute {
    pub overview_polyline: String,
    pub steps: Vec<RouteStep>,
    pub duration_text: String,
    pub duration_secs: i64,
    pub distance_text: String,
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn driving_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<DrivingRoute, ProviderError>;
}

/// Google Directions API client. Only the first route and first leg of the
/// response are used.
pub struct GoogleDirections {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleDirections {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl DirectionsProvider for GoogleDirections {
    async fn driving_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<DrivingRoute, ProviderError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("origin", format!("{},{}", origin.lat, origin.lng)),
                (
                    "destination",
                    format!("{},{}", destination.lat, destination.lng),
                ),
                ("mode", "driving".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<DirectionsResponse>()
            .await?;

        if response.status != "OK" {
            return Err(ProviderError::Status {
                service: "directions",
                status: response.status,
            });
        }

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::NoRoute)?;
        let leg = route.legs.into_iter().next().ok_or(ProviderError::NoRoute)?;

        let steps = leg
            .steps
            .into_iter()
            .map(|step| RouteStep {
                instruction_html: step.html_instructions,
                distance_text: step.distance.map(|d| d.text).unwrap_or_default(),
                polyline: step.polyline.map(|p| p.points).unwrap_or_default(),
            })
            .collect();

        Ok(DrivingRoute {
            overview_polyline: route.overview_polyline.points,
            steps,
            duration_text: leg.duration.text,
            duration_secs: leg.duration.value,
            distance_text: leg.distance.text,
        })
    }
}

#[derive(Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Deserialize)]
struct WireRoute {
    #[serde(default)]
    overview_polyline: WirePolyline,
    #[serde(default)]
    legs: Vec<WireLeg>,
}

#[derive(Deserialize, Default)]
struct WirePolyline {
    #[serde(default)]
    points: String,
}

#[derive(Deserialize)]
struct WireLeg {
    #[serde(default)]
    steps: Vec<WireStep>,
    duration: WireValueText,
    distance: WireText,
}

#[derive(Deserialize)]
struct WireStep {
    #[serde(default)]
    html_instructions: String,
    distance: Option<WireText>,
    polyline: Option<WirePolyline>,
}

#[derive(Deserialize)]
struct WireValueText {
    text: String,
    value: i64,
}

#[derive(Deserialize)]
struct WireText {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::DirectionsResponse;

    #[test]
    fn parses_directions_payload() {
        let raw = r#"{
            "status": "OK",
            "routes": [{
                "overview_polyline": { "points": "_p~iF~ps|U" },
                "legs": [{
                    "steps": [{
                        "html_instructions": "Head <b>north</b>",
                        "distance": { "text": "0.3 km" },
                        "polyline": { "points": "_p~iF~ps|U" }
                    }],
                    "duration": { "text": "12 mins", "value": 720 },
                    "distance": { "text": "4.2 km" }
                }]
            }]
        }"#;

        let parsed: DirectionsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "OK");
        let route = &parsed.routes[0];
        assert_eq!(route.overview_polyline.points, "_p~iF~ps|U");
        let leg = &route.legs[0];
        assert_eq!(leg.duration.value, 720);
        assert_eq!(leg.steps[0].html_instructions, "Head <b>north</b>");
    }

    #[test]
    fn tolerates_empty_route_list() {
        let parsed: DirectionsResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS"}"#).unwrap();
        assert_eq!(parsed.status, "ZERO_RESULTS");
        assert!(parsed.routes.is_empty());
    }
}
