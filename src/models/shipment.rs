use serde::{Deserialize, Serialize};

use crate::models::geo::GeoPoint;

/// Shipment lifecycle stages as reported by the fleet backend.
///
/// `Unknown` absorbs statuses added upstream after this build; shipments in
/// an unknown stage are never eligible for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    Assigned,
    ReceivedAtHub,
    OutForDelivery,
    Delivered,
    Returned,
    #[serde(other)]
    Unknown,
}

impl ShipmentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Assigned => "assigned",
            ShipmentStatus::ReceivedAtHub => "received_at_hub",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Returned => "returned",
            ShipmentStatus::Unknown => "unknown",
        }
    }
}

/// A shipment eligible for route building. Backend-owned, read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentCandidate {
    pub id: String,
    #[serde(default)]
    pub tracking_number: String,
    #[serde(default)]
    pub recipient_name: String,
    pub status: ShipmentStatus,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup_coordinate: Option<GeoPoint>,
    pub delivery_coordinate: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hub {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub address: String,
    pub coordinate: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: String,
    pub name: String,
}
