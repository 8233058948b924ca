use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::engine::session::SessionCommand;
use crate::models::navigation::{NavigationSnapshot, ScanKind};
use crate::models::shipment::{Hub, ShipmentCandidate};
use crate::models::stop::RouteDraft;
use crate::observability::metrics::Metrics;
use crate::services::directions::DirectionsProvider;
use crate::services::fleet::FleetBackend;
use crate::services::geocoding::Geocoder;

/// Upstream provider clients, behind traits so tests can substitute fakes.
#[derive(Clone)]
pub struct Providers {
    pub directions: Arc<dyn DirectionsProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub fleet: Arc<dyn FleetBackend>,
}

/// The write-side of a running navigation session. The reducer task owns the
/// session state; handlers only get this handle.
pub struct SessionHandle {
    pub order_id: String,
    pub scan_kind: ScanKind,
    pub cmd_tx: mpsc::Sender<SessionCommand>,
}

/// An in-progress route draft plus the candidate pool it was toggled from.
/// Candidates are cached per draft so toggle lookups hit local data, not the
/// fleet backend.
pub struct DraftSession {
    pub draft: RouteDraft,
    pub candidates: Vec<ShipmentCandidate>,
    pub hub: Option<Hub>,
    /// Refreshed on every access; the reaper discards drafts left idle.
    pub last_touched: Instant,
}

impl DraftSession {
    pub fn new(draft: RouteDraft, hub: Option<Hub>) -> Self {
        Self {
            draft,
            candidates: Vec::new(),
            hub,
            last_touched: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

pub struct AppState {
    pub sessions: DashMap<Uuid, SessionHandle>,
    pub snapshots: DashMap<Uuid, NavigationSnapshot>,
    pub drafts: DashMap<Uuid, DraftSession>,
    pub nav_events_tx: broadcast::Sender<NavigationSnapshot>,
    pub providers: Providers,
    pub engine: EngineSettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(engine: EngineSettings, providers: Providers) -> Self {
        let (nav_events_tx, _unused_rx) = broadcast::channel(engine.event_buffer_size);

        Self {
            sessions: DashMap::new(),
            snapshots: DashMap::new(),
            drafts: DashMap::new(),
            nav_events_tx,
            providers,
            engine,
            metrics: Metrics::new(),
        }
    }
}
