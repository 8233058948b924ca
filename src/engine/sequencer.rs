//! Stop sequencing for route drafts.
//!
//! Every operation works against the committed stop list it is handed, so a
//! shipment always ends up with either no stops or a matched pickup+delivery
//! pair, regardless of how toggles interleave.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::geo::GeoPoint;
use crate::models::shipment::{Hub, ShipmentCandidate, ShipmentStatus};
use crate::models::stop::{RouteDraft, RouteSubmission, Stop, StopKind};

pub const MIN_ROUTE_NAME_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// A pickup+delivery pair was appended.
    Added,
    /// Every stop of the shipment was removed.
    Removed,
    /// The shipment's lifecycle stage is not routable; nothing changed.
    Ineligible,
}

struct StopPlace {
    location: String,
    coordinate: Option<GeoPoint>,
}

/// Adds or removes a shipment's stops. Membership is decided by the stop
/// list itself, never by caller-side bookkeeping.
pub fn toggle_shipment(
    stops: &mut Vec<Stop>,
    candidate: &ShipmentCandidate,
    hub: &Hub,
) -> ToggleOutcome {
    if stops.iter().any(|s| s.shipment_id == candidate.id) {
        remove_shipment(stops, &candidate.id);
        return ToggleOutcome::Removed;
    }

    let Some((pickup, delivery)) = leg_endpoints(candidate, hub) else {
        return ToggleOutcome::Ineligible;
    };

    let next = stops.len() as u32 + 1;
    stops.push(Stop {
        shipment_id: candidate.id.clone(),
        kind: StopKind::Pickup,
        location: pickup.location,
        coordinate: pickup.coordinate,
        order: next,
    });
    stops.push(Stop {
        shipment_id: candidate.id.clone(),
        kind: StopKind::Delivery,
        location: delivery.location,
        coordinate: delivery.coordinate,
        order: next + 1,
    });
    ToggleOutcome::Added
}

/// Removes every stop belonging to `shipment_id` (all kinds, waypoints
/// included) and renumbers. Returns whether anything was removed.
pub fn remove_shipment(stops: &mut Vec<Stop>, shipment_id: &str) -> bool {
    let before = stops.len();
    stops.retain(|s| s.shipment_id != shipment_id);
    let removed = stops.len() != before;
    if removed {
        renumber(stops);
    }
    removed
}

/// Restores the dense 1-based ordering after any mutation.
pub fn renumber(stops: &mut [Stop]) {
    for (idx, stop) in stops.iter_mut().enumerate() {
        stop.order = idx as u32 + 1;
    }
}

/// Which way the shipment travels in its current lifecycle stage: to the
/// hub while the merchant still holds it, from the hub once it arrived.
fn leg_endpoints(candidate: &ShipmentCandidate, hub: &Hub) -> Option<(StopPlace, StopPlace)> {
    let hub_place = || StopPlace {
        location: hub.address.clone(),
        coordinate: hub.coordinate,
    };

    match candidate.status {
        ShipmentStatus::Pending | ShipmentStatus::Assigned => Some((
            StopPlace {
                location: candidate.pickup_address.clone(),
                coordinate: candidate.pickup_coordinate,
            },
            hub_place(),
        )),
        ShipmentStatus::ReceivedAtHub => Some((
            hub_place(),
            StopPlace {
                location: candidate.delivery_address.clone(),
                coordinate: candidate.delivery_coordinate,
            },
        )),
        _ => None,
    }
}

/// Drops repeated candidate ids, keeping the first occurrence, so one
/// shipment can never be toggled through two card instances.
pub fn dedup_candidates(candidates: Vec<ShipmentCandidate>) -> Vec<ShipmentCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

/// Display-only search across tracking number, recipient, both addresses
/// and status label. Never touches the stop list.
pub fn filter_candidates(candidates: &[ShipmentCandidate], search: &str) -> Vec<ShipmentCandidate> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return candidates.to_vec();
    }

    candidates
        .iter()
        .filter(|c| {
            [
                c.tracking_number.as_str(),
                c.recipient_name.as_str(),
                c.delivery_address.as_str(),
                c.pickup_address.as_str(),
                c.status.label(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Checks the draft is submittable and builds the backend unit.
pub fn validate_draft(draft: &RouteDraft) -> Result<RouteSubmission, Vec<String>> {
    let mut problems = Vec::new();

    if draft.name.trim().chars().count() < MIN_ROUTE_NAME_CHARS {
        problems.push(format!(
            "route name must be at least {MIN_ROUTE_NAME_CHARS} characters"
        ));
    }

    let hub_id = match &draft.hub_id {
        Some(id) => id.clone(),
        None => {
            problems.push("a hub must be selected".to_string());
            String::new()
        }
    };

    if draft.stops.is_empty() {
        problems.push("the route needs at least one stop".to_string());
    }

    if !problems.is_empty() {
        return Err(problems);
    }

    Ok(RouteSubmission {
        name: draft.name.trim().to_string(),
        hub_id,
        rider_id: draft.rider_id.clone(),
        stops: draft.stops.clone(),
    })
}
