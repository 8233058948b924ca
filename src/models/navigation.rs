use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geo::{GeoBounds, GeoPoint};

/// Which confirmation scan the rider is travelling towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    Idle,
    Overview,
    ActiveTurnByTurn,
    Paused,
}

/// What the client should render for the destination while it is being
/// geocoded, after geocoding failed, or once a coordinate is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DestinationView {
    Resolving { address: String },
    Failed { address: String },
    Resolved { address: String, coordinate: GeoPoint },
}

/// One maneuver as returned by the directions service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction_html: String,
    pub distance_text: String,
    pub polyline: String,
}

/// The instruction banner: first step of the latest route, tags stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStep {
    pub instruction: String,
    pub distance_text: String,
}

impl CurrentStep {
    pub fn from_step(step: &RouteStep) -> Self {
        Self {
            instruction: plain_instruction(&step.instruction_html),
            distance_text: step.distance_text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStats {
    pub duration_text: String,
    pub distance_text: String,
    /// Wall-clock arrival time ("%H:%M") in the session's UTC offset.
    pub arrival_clock: String,
}

impl TripStats {
    /// `None` when the advertised travel time cannot be represented as an
    /// arrival timestamp.
    pub fn compute(
        duration_text: &str,
        distance_text: &str,
        duration_secs: i64,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Option<Self> {
        let travel = Duration::try_seconds(duration_secs)?;
        let arrival = now.checked_add_signed(travel)?.with_timezone(&offset);
        Some(Self {
            duration_text: duration_text.to_string(),
            distance_text: distance_text.to_string(),
            arrival_clock: arrival.format("%H:%M").to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiderPose {
    pub position: GeoPoint,
    pub heading: f64,
}

/// Camera directive for the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CameraPose {
    /// Chase camera locked to the rider while actively navigating.
    Follow {
        center: GeoPoint,
        zoom: f64,
        pitch: f64,
        heading: f64,
    },
    /// Static framing of everything relevant (route, rider, destination).
    Frame { bounds: GeoBounds },
}

/// The full view published after every session event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub session_id: Uuid,
    pub order_id: String,
    pub state: NavigationState,
    pub destination: DestinationView,
    pub rider: Option<RiderPose>,
    /// Decoded route polyline, empty until a route has been fetched.
    pub path: Vec<GeoPoint>,
    pub current_step: Option<CurrentStep>,
    pub stats: Option<TripStats>,
    pub camera: Option<CameraPose>,
    pub updated_at: DateTime<Utc>,
}

/// Carried into the scan/confirmation flow; arrival proximity is not checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHandoff {
    pub order_id: String,
    pub scan_type: ScanKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Android,
    Ios,
}

/// Deep links for handing navigation off to the platform's maps app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalNavLinks {
    pub primary_url: String,
    pub fallback_url: String,
}

impl ExternalNavLinks {
    pub fn to_destination(destination: GeoPoint, platform: Platform) -> Self {
        let GeoPoint { lat, lng } = destination;
        let primary_url = match platform {
            Platform::Android => format!("google.navigation:q={lat},{lng}"),
            Platform::Ios => format!("maps:?daddr={lat},{lng}"),
        };
        Self {
            primary_url,
            fallback_url: format!(
                "https://www.google.com/maps/dir/?api=1&destination={lat},{lng}"
            ),
        }
    }
}

/// Strips markup from a directions instruction, leaving display text.
/// Handles the tags and `&nbsp;` entities Google embeds; runs of whitespace
/// collapse to a single space.
pub fn plain_instruction(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    let decoded = text.replace("&nbsp;", " ").replace("&amp;", "&");
    let mut out = String::with_capacity(decoded.len());
    let mut last_space = true;
    for ch in decoded.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}
