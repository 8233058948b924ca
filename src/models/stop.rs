use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    Pickup,
    Delivery,
    Waypoint,
}

/// One ordered stop on a route draft. Location data is captured at insertion
/// time and not updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub shipment_id: String,
    pub kind: StopKind,
    pub location: String,
    pub coordinate: Option<GeoPoint>,
    /// Dense 1-based position; renumbered after every mutation.
    pub order: u32,
}

/// An in-progress route, owned by exactly one draft session until it is
/// submitted as a unit or discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDraft {
    pub id: Uuid,
    /// Backend route id when editing an existing route; selects update
    /// instead of create on save.
    pub route_id: Option<String>,
    pub name: String,
    pub hub_id: Option<String>,
    pub rider_id: Option<String>,
    pub stops: Vec<Stop>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RouteDraft {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            route_id: None,
            name: String::new(),
            hub_id: None,
            rider_id: None,
            stops: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for RouteDraft {
    fn default() -> Self {
        Self::new()
    }
}

/// The unit submitted to the fleet backend on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSubmission {
    pub name: String,
    pub hub_id: String,
    pub rider_id: Option<String>,
    pub stops: Vec<Stop>,
}
