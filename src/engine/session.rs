//! Per-rider navigation sessions.
//!
//! Each session is one tokio task owning a [`SessionCore`] and draining a
//! bounded command channel: location fixes, start/pause, retries, and the
//! results of provider calls it spawned earlier. The task is the only writer
//! of session state, so every decision reads committed state. Provider calls
//! never block the loop; their results re-enter the channel carrying the
//! token they were issued with and are discarded when superseded.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::geo;
use crate::models::geo::{GeoBounds, GeoPoint, LocationFix};
use crate::models::navigation::{
    CameraPose, CurrentStep, DestinationView, NavigationSnapshot, NavigationState, RiderPose,
    RouteStep, ScanKind, TripStats,
};
use crate::polyline::{self, PolylineError};
use crate::services::directions::DrivingRoute;
use crate::services::ProviderError;
use crate::state::{AppState, SessionHandle};

const CAMERA_FOLLOW_ZOOM: f64 = 18.0;
const CAMERA_FOLLOW_PITCH: f64 = 60.0;

/// Everything needed to start a session; the rest accumulates from commands.
#[derive(Debug, Clone)]
pub struct SessionSeed {
    pub id: Uuid,
    pub order_id: String,
    pub scan_kind: ScanKind,
    pub address: String,
    pub coordinate: Option<GeoPoint>,
    pub utc_offset_minutes: i32,
}

#[derive(Debug)]
pub enum SessionCommand {
    Fix(LocationFix),
    Start,
    Pause,
    RetryResolve,
    Close,
    RouteResult {
        token: u64,
        result: Result<DrivingRoute, ProviderError>,
    },
    GeocodeResult {
        token: u64,
        result: Result<GeoPoint, ProviderError>,
    },
}

/// An issued directions recalculation, tagged with its generation token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionsTicket {
    pub token: u64,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeTicket {
    pub token: u64,
    pub address: String,
}

#[derive(Debug)]
pub enum FixOutcome {
    /// Below the sensor distance filter; state untouched.
    Filtered,
    /// Accepted, optionally demanding a directions recalculation.
    Accepted(Option<DirectionsTicket>),
}

/// What became of a provider result once it got back to the reducer.
#[derive(Debug)]
pub enum LookupOutcome {
    Applied,
    Superseded,
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
enum DestinationStatus {
    Resolving,
    Failed,
    Resolved(GeoPoint),
}

/// Why a directions response could not become a displayable plan.
#[derive(Debug, Error)]
pub enum RoutePlanError {
    #[error(transparent)]
    Polyline(#[from] PolylineError),
    #[error("arrival time is outside the representable range")]
    ArrivalOutOfRange,
}

/// A decoded, displayable route: the most recent directions response.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub path: Vec<GeoPoint>,
    pub steps: Vec<RouteStep>,
    pub stats: TripStats,
}

impl RoutePlan {
    pub fn from_driving(
        route: DrivingRoute,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Self, RoutePlanError> {
        let path = polyline::decode(&route.overview_polyline)?;
        let stats = TripStats::compute(
            &route.duration_text,
            &route.distance_text,
            route.duration_secs,
            now,
            offset,
        )
        .ok_or(RoutePlanError::ArrivalOutOfRange)?;
        Ok(Self {
            path,
            steps: route.steps,
            stats,
        })
    }
}

/// The reducer state. Mutated only by its owning task (or directly in unit
/// tests, which drive the same methods synchronously).
pub struct SessionCore {
    id: Uuid,
    order_id: String,
    address: String,
    destination: DestinationStatus,
    nav_state: NavigationState,
    last_fix: Option<LocationFix>,
    route: Option<RoutePlan>,
    last_recalc_origin: Option<GeoPoint>,
    route_token: u64,
    geocode_token: u64,
    utc_offset: FixedOffset,
    settings: EngineSettings,
}

impl SessionCore {
    pub fn new(seed: SessionSeed, settings: EngineSettings) -> Self {
        // Client-supplied and unbounded; anything east_opt rejects reads as UTC.
        let utc_offset = FixedOffset::east_opt(seed.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));

        Self {
            id: seed.id,
            order_id: seed.order_id,
            address: seed.address,
            destination: match seed.coordinate {
                Some(coordinate) => DestinationStatus::Resolved(coordinate),
                None => DestinationStatus::Resolving,
            },
            nav_state: NavigationState::Idle,
            last_fix: None,
            route: None,
            last_recalc_origin: None,
            route_token: 0,
            geocode_token: 0,
            utc_offset,
            settings,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Issues the initial geocode when the destination arrived as text only.
    pub fn bootstrap(&mut self) -> Option<GeocodeTicket> {
        if !matches!(self.destination, DestinationStatus::Resolving) {
            return None;
        }
        self.geocode_token += 1;
        Some(GeocodeTicket {
            token: self.geocode_token,
            address: self.address.clone(),
        })
    }

    pub fn on_fix(&mut self, fix: LocationFix) -> FixOutcome {
        if let Some(prev) = self.last_fix {
            let moved_m = geo::haversine_m(prev.coordinate, fix.coordinate);
            if moved_m < self.settings.fix_distance_filter_m {
                return FixOutcome::Filtered;
            }
        }
        self.last_fix = Some(fix);

        if self.nav_state == NavigationState::Idle && self.destination_coordinate().is_some() {
            self.nav_state = NavigationState::Overview;
        }

        let ticket = if self.nav_state == NavigationState::ActiveTurnByTurn
            && self.should_recalculate(fix.coordinate)
        {
            self.directions_ticket(fix.coordinate)
        } else {
            None
        };
        FixOutcome::Accepted(ticket)
    }

    /// Start (or resume) turn-by-turn. Valid from overview or paused once a
    /// fix and a resolved destination exist; always issues a fresh
    /// recalculation from the current position.
    pub fn on_start(&mut self) -> Option<DirectionsTicket> {
        if !matches!(
            self.nav_state,
            NavigationState::Overview | NavigationState::Paused
        ) {
            return None;
        }
        let fix = self.last_fix?;
        let ticket = self.directions_ticket(fix.coordinate)?;
        self.nav_state = NavigationState::ActiveTurnByTurn;
        Some(ticket)
    }

    pub fn on_pause(&mut self) {
        if self.nav_state == NavigationState::ActiveTurnByTurn {
            self.nav_state = NavigationState::Paused;
        }
    }

    pub fn on_retry_resolve(&mut self) -> Option<GeocodeTicket> {
        if !matches!(self.destination, DestinationStatus::Failed) {
            return None;
        }
        self.destination = DestinationStatus::Resolving;
        self.geocode_token += 1;
        Some(GeocodeTicket {
            token: self.geocode_token,
            address: self.address.clone(),
        })
    }

    pub fn on_route_result(
        &mut self,
        token: u64,
        result: Result<DrivingRoute, ProviderError>,
    ) -> LookupOutcome {
        if token != self.route_token {
            return LookupOutcome::Superseded;
        }
        match result {
            Ok(route) => match RoutePlan::from_driving(route, Utc::now(), self.utc_offset) {
                Ok(plan) => {
                    self.route = Some(plan);
                    LookupOutcome::Applied
                }
                Err(err) => LookupOutcome::Failed(err.to_string()),
            },
            Err(err) => LookupOutcome::Failed(err.to_string()),
        }
    }

    pub fn on_geocode_result(
        &mut self,
        token: u64,
        result: Result<GeoPoint, ProviderError>,
    ) -> LookupOutcome {
        if token != self.geocode_token {
            return LookupOutcome::Superseded;
        }
        match result {
            Ok(coordinate) => {
                self.destination = DestinationStatus::Resolved(coordinate);
                if self.nav_state == NavigationState::Idle && self.last_fix.is_some() {
                    self.nav_state = NavigationState::Overview;
                }
                LookupOutcome::Applied
            }
            Err(err) => {
                self.destination = DestinationStatus::Failed;
                LookupOutcome::Failed(err.to_string())
            }
        }
    }

    pub fn destination_coordinate(&self) -> Option<GeoPoint> {
        match self.destination {
            DestinationStatus::Resolved(coordinate) => Some(coordinate),
            _ => None,
        }
    }

    fn should_recalculate(&self, origin: GeoPoint) -> bool {
        match self.last_recalc_origin {
            None => true,
            Some(prev) => {
                geo::displacement_exceeds(prev, origin, self.settings.recalc_threshold_deg)
            }
        }
    }

    fn directions_ticket(&mut self, origin: GeoPoint) -> Option<DirectionsTicket> {
        let destination = self.destination_coordinate()?;
        self.route_token += 1;
        self.last_recalc_origin = Some(origin);
        Some(DirectionsTicket {
            token: self.route_token,
            origin,
            destination,
        })
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        let rider = self.last_fix.map(|fix| RiderPose {
            position: fix.coordinate,
            heading: fix.heading.unwrap_or(0.0),
        });
        let path = self
            .route
            .as_ref()
            .map(|plan| plan.path.clone())
            .unwrap_or_default();
        let current_step = self
            .route
            .as_ref()
            .and_then(|plan| plan.steps.first())
            .map(CurrentStep::from_step);
        let stats = self.route.as_ref().map(|plan| plan.stats.clone());
        let camera = self.camera(rider, &path);

        NavigationSnapshot {
            session_id: self.id,
            order_id: self.order_id.clone(),
            state: self.nav_state,
            destination: self.destination_view(),
            rider,
            path,
            current_step,
            stats,
            camera,
            updated_at: Utc::now(),
        }
    }

    fn destination_view(&self) -> DestinationView {
        match self.destination {
            DestinationStatus::Resolving => DestinationView::Resolving {
                address: self.address.clone(),
            },
            DestinationStatus::Failed => DestinationView::Failed {
                address: self.address.clone(),
            },
            DestinationStatus::Resolved(coordinate) => DestinationView::Resolved {
                address: self.address.clone(),
                coordinate,
            },
        }
    }

    fn camera(&self, rider: Option<RiderPose>, path: &[GeoPoint]) -> Option<CameraPose> {
        match self.nav_state {
            NavigationState::ActiveTurnByTurn => rider.map(|pose| CameraPose::Follow {
                center: pose.position,
                zoom: CAMERA_FOLLOW_ZOOM,
                pitch: CAMERA_FOLLOW_PITCH,
                heading: pose.heading,
            }),
            NavigationState::Overview | NavigationState::Paused => {
                let mut points: Vec<GeoPoint> = path.to_vec();
                if let Some(pose) = rider {
                    points.push(pose.position);
                }
                if let Some(destination) = self.destination_coordinate() {
                    points.push(destination);
                }
                GeoBounds::from_points(points).map(|bounds| CameraPose::Frame { bounds })
            }
            NavigationState::Idle => None,
        }
    }
}

/// Registers a new session and spawns its reducer task. Returns the initial
/// snapshot so the creating request has something to show immediately.
pub fn launch(state: &Arc<AppState>, seed: SessionSeed) -> NavigationSnapshot {
    let (cmd_tx, cmd_rx) = mpsc::channel(state.engine.command_queue_size);

    let handle = SessionHandle {
        order_id: seed.order_id.clone(),
        scan_kind: seed.scan_kind,
        cmd_tx: cmd_tx.clone(),
    };
    state.sessions.insert(seed.id, handle);
    state.metrics.active_sessions.set(state.sessions.len() as i64);

    let snapshot = SessionCore::new(seed.clone(), state.engine).snapshot();
    state.snapshots.insert(seed.id, snapshot.clone());

    tokio::spawn(run_navigation_session(state.clone(), seed, cmd_tx, cmd_rx));
    snapshot
}

pub async fn run_navigation_session(
    state: Arc<AppState>,
    seed: SessionSeed,
    cmd_tx: mpsc::Sender<SessionCommand>,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
) {
    let settings = state.engine;
    let mut session = SessionCore::new(seed, settings);
    info!(session_id = %session.id(), order_id = %session.order_id, "navigation session started");

    if let Some(ticket) = session.bootstrap() {
        spawn_geocode(&state, &cmd_tx, ticket);
    }
    publish(&state, &session);

    loop {
        let command = tokio::select! {
            received = cmd_rx.recv() => match received {
                Some(command) => command,
                None => break,
            },
            _ = sleep(settings.session_idle_timeout) => {
                info!(session_id = %session.id(), "navigation session idle timeout");
                break;
            }
        };

        match command {
            SessionCommand::Close => break,
            SessionCommand::Fix(fix) => match session.on_fix(fix) {
                FixOutcome::Filtered => {
                    state
                        .metrics
                        .location_fixes_total
                        .with_label_values(&["filtered"])
                        .inc();
                }
                FixOutcome::Accepted(ticket) => {
                    state
                        .metrics
                        .location_fixes_total
                        .with_label_values(&["accepted"])
                        .inc();
                    if let Some(ticket) = ticket {
                        spawn_directions(&state, &cmd_tx, ticket);
                    }
                }
            },
            SessionCommand::Start => {
                if let Some(ticket) = session.on_start() {
                    spawn_directions(&state, &cmd_tx, ticket);
                }
            }
            SessionCommand::Pause => session.on_pause(),
            SessionCommand::RetryResolve => {
                if let Some(ticket) = session.on_retry_resolve() {
                    spawn_geocode(&state, &cmd_tx, ticket);
                }
            }
            SessionCommand::RouteResult { token, result } => {
                match session.on_route_result(token, result) {
                    LookupOutcome::Applied => {
                        state
                            .metrics
                            .directions_requests_total
                            .with_label_values(&["applied"])
                            .inc();
                    }
                    LookupOutcome::Superseded => {
                        state
                            .metrics
                            .directions_requests_total
                            .with_label_values(&["superseded"])
                            .inc();
                        debug!(session_id = %session.id(), token, "superseded directions response discarded");
                    }
                    LookupOutcome::Failed(reason) => {
                        state
                            .metrics
                            .directions_requests_total
                            .with_label_values(&["error"])
                            .inc();
                        warn!(
                            session_id = %session.id(),
                            error = %reason,
                            "directions update failed; keeping previous route"
                        );
                    }
                }
            }
            SessionCommand::GeocodeResult { token, result } => {
                match session.on_geocode_result(token, result) {
                    LookupOutcome::Applied => {
                        state
                            .metrics
                            .geocode_requests_total
                            .with_label_values(&["applied"])
                            .inc();
                    }
                    LookupOutcome::Superseded => {
                        state
                            .metrics
                            .geocode_requests_total
                            .with_label_values(&["superseded"])
                            .inc();
                    }
                    LookupOutcome::Failed(reason) => {
                        state
                            .metrics
                            .geocode_requests_total
                            .with_label_values(&["error"])
                            .inc();
                        warn!(
                            session_id = %session.id(),
                            error = %reason,
                            "destination resolution failed"
                        );
                    }
                }
            }
        }

        publish(&state, &session);
    }

    state.sessions.remove(&session.id());
    state.snapshots.remove(&session.id());
    state
        .metrics
        .active_sessions
        .set(state.sessions.len() as i64);
    info!(session_id = %session.id(), "navigation session closed");
}

fn publish(state: &AppState, session: &SessionCore) {
    let snapshot = session.snapshot();
    state.snapshots.insert(snapshot.session_id, snapshot.clone());
    let _ = state.nav_events_tx.send(snapshot);
}

fn spawn_directions(
    state: &Arc<AppState>,
    cmd_tx: &mpsc::Sender<SessionCommand>,
    ticket: DirectionsTicket,
) {
    let provider = state.providers.directions.clone();
    let metrics = state.metrics.clone();
    let tx = cmd_tx.clone();

    tokio::spawn(async move {
        let started = Instant::now();
        let result = provider
            .driving_route(ticket.origin, ticket.destination)
            .await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics
            .directions_latency_seconds
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());

        let _ = tx
            .send(SessionCommand::RouteResult {
                token: ticket.token,
                result,
            })
            .await;
    });
}

fn spawn_geocode(
    state: &Arc<AppState>,
    cmd_tx: &mpsc::Sender<SessionCommand>,
    ticket: GeocodeTicket,
) {
    let provider = state.providers.geocoder.clone();
    let tx = cmd_tx.clone();

    tokio::spawn(async move {
        let result = provider.geocode(&ticket.address).await;
        let _ = tx
            .send(SessionCommand::GeocodeResult {
                token: ticket.token,
                result,
            })
            .await;
    });
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};
    use uuid::Uuid;

    use super::{FixOutcome, LookupOutcome, RoutePlan, SessionCore, SessionSeed};
    use crate::config::EngineSettings;
    use crate::models::geo::{GeoPoint, LocationFix};
    use crate::models::navigation::{CameraPose, NavigationState, RouteStep, ScanKind};
    use crate::polyline;
    use crate::services::directions::DrivingRoute;
    use crate::services::ProviderError;

    const ORIGIN: GeoPoint = GeoPoint {
        lat: 23.8103,
        lng: 90.4125,
    };
    const DEST: GeoPoint = GeoPoint {
        lat: 23.7808,
        lng: 90.2792,
    };

    fn seed(coordinate: Option<GeoPoint>) -> SessionSeed {
        SessionSeed {
            id: Uuid::from_u128(7),
            order_id: "ORD-100".to_string(),
            scan_kind: ScanKind::Delivery,
            address: "20 Oak Ave".to_string(),
            coordinate,
            utc_offset_minutes: 0,
        }
    }

    fn core(coordinate: Option<GeoPoint>) -> SessionCore {
        SessionCore::new(seed(coordinate), EngineSettings::default())
    }

    fn fix(lat: f64, lng: f64) -> LocationFix {
        LocationFix {
            coordinate: GeoPoint { lat, lng },
            heading: Some(90.0),
            recorded_at: None,
        }
    }

    fn route(duration_secs: i64) -> DrivingRoute {
        let encoded = polyline::encode(&[ORIGIN, DEST]);
        DrivingRoute {
            overview_polyline: encoded.clone(),
            steps: vec![RouteStep {
                instruction_html: "Head <b>west</b> on Airport Rd".to_string(),
                distance_text: "1.2 km".to_string(),
                polyline: encoded,
            }],
            duration_text: "25 mins".to_string(),
            duration_secs,
            distance_text: "14 km".to_string(),
        }
    }

    #[test]
    fn stays_idle_until_destination_resolves() {
        let mut session = core(None);
        let ticket = session.bootstrap().unwrap();
        assert_eq!(ticket.token, 1);

        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        assert_eq!(session.snapshot().state, NavigationState::Idle);

        let outcome = session.on_geocode_result(1, Ok(DEST));
        assert!(matches!(outcome, LookupOutcome::Applied));
        assert_eq!(session.snapshot().state, NavigationState::Overview);
    }

    #[test]
    fn first_fix_moves_resolved_session_to_overview() {
        let mut session = core(Some(DEST));
        assert!(session.bootstrap().is_none());
        assert_eq!(session.snapshot().state, NavigationState::Idle);

        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        assert_eq!(session.snapshot().state, NavigationState::Overview);
    }

    #[test]
    fn geocode_failure_then_retry() {
        let mut session = core(None);
        session.bootstrap().unwrap();
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));

        let outcome = session.on_geocode_result(1, Err(ProviderError::NoCandidates));
        assert!(matches!(outcome, LookupOutcome::Failed(_)));
        assert_eq!(session.snapshot().state, NavigationState::Idle);

        let retry = session.on_retry_resolve().unwrap();
        assert_eq!(retry.token, 2);
        session.on_geocode_result(2, Ok(DEST));
        assert_eq!(session.snapshot().state, NavigationState::Overview);
    }

    #[test]
    fn start_issues_an_immediate_recalculation() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));

        let ticket = session.on_start().unwrap();
        assert_eq!(ticket.token, 1);
        assert_eq!(ticket.origin, ORIGIN);
        assert_eq!(ticket.destination, DEST);
        assert_eq!(session.snapshot().state, NavigationState::ActiveTurnByTurn);
    }

    #[test]
    fn start_does_nothing_without_a_fix() {
        let mut session = core(Some(DEST));
        assert!(session.on_start().is_none());
        assert_eq!(session.snapshot().state, NavigationState::Idle);
    }

    #[test]
    fn small_displacement_does_not_recalculate() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        session.on_start().unwrap();

        // ~33 m: past the sensor filter, below the recalc threshold.
        let outcome = session.on_fix(fix(ORIGIN.lat + 0.0003, ORIGIN.lng));
        match outcome {
            FixOutcome::Accepted(ticket) => assert!(ticket.is_none()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn threshold_displacement_recalculates_once_per_crossing() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        session.on_start().unwrap();

        let outcome = session.on_fix(fix(ORIGIN.lat + 0.0006, ORIGIN.lng));
        let ticket = match outcome {
            FixOutcome::Accepted(Some(ticket)) => ticket,
            other => panic!("expected a recalculation, got {other:?}"),
        };
        assert_eq!(ticket.token, 2);
        assert_eq!(ticket.origin.lat, ORIGIN.lat + 0.0006);
    }

    #[test]
    fn sub_filter_jitter_is_dropped() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));

        // ~1 m of drift.
        let outcome = session.on_fix(fix(ORIGIN.lat + 0.00001, ORIGIN.lng));
        assert!(matches!(outcome, FixOutcome::Filtered));
    }

    #[test]
    fn superseded_route_responses_are_discarded() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        session.on_start().unwrap();
        session.on_fix(fix(ORIGIN.lat + 0.0006, ORIGIN.lng));

        // Token 1 arrives after token 2 was issued.
        let outcome = session.on_route_result(1, Ok(route(600)));
        assert!(matches!(outcome, LookupOutcome::Superseded));
        assert!(session.snapshot().path.is_empty());

        let outcome = session.on_route_result(2, Ok(route(1500)));
        assert!(matches!(outcome, LookupOutcome::Applied));
        assert_eq!(session.snapshot().path.len(), 2);
    }

    #[test]
    fn directions_failure_keeps_previous_route() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        session.on_start().unwrap();
        session.on_route_result(1, Ok(route(1500)));
        let stats_before = session.snapshot().stats;

        session.on_fix(fix(ORIGIN.lat + 0.0006, ORIGIN.lng));
        let outcome = session.on_route_result(2, Err(ProviderError::NoRoute));
        assert!(matches!(outcome, LookupOutcome::Failed(_)));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.path.len(), 2);
        assert_eq!(snapshot.stats, stats_before);
    }

    #[test]
    fn absurd_route_duration_is_a_failed_lookup() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        session.on_start().unwrap();

        let outcome = session.on_route_result(1, Ok(route(i64::MAX)));
        assert!(matches!(outcome, LookupOutcome::Failed(_)));
        assert!(session.snapshot().path.is_empty());

        // The session keeps working and a sane response still lands.
        session.on_fix(fix(ORIGIN.lat + 0.0006, ORIGIN.lng));
        let outcome = session.on_route_result(2, Ok(route(1500)));
        assert!(matches!(outcome, LookupOutcome::Applied));
        assert_eq!(session.snapshot().path.len(), 2);
    }

    #[test]
    fn pause_and_resume_reissue_directions() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        session.on_start().unwrap();
        session.on_route_result(1, Ok(route(1500)));

        session.on_pause();
        assert_eq!(session.snapshot().state, NavigationState::Paused);

        let ticket = session.on_start().unwrap();
        assert_eq!(ticket.token, 2);
        assert_eq!(session.snapshot().state, NavigationState::ActiveTurnByTurn);
    }

    #[test]
    fn camera_follows_while_active_and_frames_otherwise() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));

        match session.snapshot().camera {
            Some(CameraPose::Frame { bounds }) => {
                assert!(bounds.south_west.lng <= DEST.lng);
                assert!(bounds.north_east.lng >= ORIGIN.lng);
            }
            other => panic!("expected frame camera, got {other:?}"),
        }

        session.on_start().unwrap();
        match session.snapshot().camera {
            Some(CameraPose::Follow {
                center, heading, ..
            }) => {
                assert_eq!(center, ORIGIN);
                assert_eq!(heading, 90.0);
            }
            other => panic!("expected follow camera, got {other:?}"),
        }
    }

    #[test]
    fn current_step_is_first_step_with_tags_stripped() {
        let mut session = core(Some(DEST));
        session.on_fix(fix(ORIGIN.lat, ORIGIN.lng));
        session.on_start().unwrap();
        session.on_route_result(1, Ok(route(1500)));

        let step = session.snapshot().current_step.unwrap();
        assert_eq!(step.instruction, "Head west on Airport Rd");
        assert_eq!(step.distance_text, "1.2 km");
    }

    #[test]
    fn arrival_clock_uses_session_offset() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        let offset = FixedOffset::east_opt(6 * 3600).unwrap();

        let plan = RoutePlan::from_driving(route(720), now, offset).unwrap();
        assert_eq!(plan.stats.arrival_clock, "16:12");
        assert_eq!(plan.stats.duration_text, "25 mins");
    }

    #[test]
    fn extreme_utc_offset_falls_back_to_utc() {
        let mut wild = seed(Some(DEST));
        wild.utc_offset_minutes = i32::MAX;
        let session = SessionCore::new(wild, EngineSettings::default());
        assert_eq!(session.utc_offset.local_minus_utc(), 0);

        let mut wild = seed(Some(DEST));
        wild.utc_offset_minutes = i32::MIN;
        let session = SessionCore::new(wild, EngineSettings::default());
        assert_eq!(session.utc_offset.local_minus_utc(), 0);
    }
}
