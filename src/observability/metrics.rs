use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub active_sessions: IntGauge,
    pub location_fixes_total: IntCounterVec,
    pub directions_requests_total: IntCounterVec,
    pub directions_latency_seconds: HistogramVec,
    pub geocode_requests_total: IntCounterVec,
    pub open_route_drafts: IntGauge,
    pub route_saves_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let active_sessions =
            IntGauge::new("active_sessions", "Navigation sessions currently running")
                .expect("valid active_sessions metric");

        let location_fixes_total = IntCounterVec::new(
            Opts::new("location_fixes_total", "Location fixes by outcome"),
            &["outcome"],
        )
        .expect("valid location_fixes_total metric");

        let directions_requests_total = IntCounterVec::new(
            Opts::new(
                "directions_requests_total",
                "Directions responses by outcome",
            ),
            &["outcome"],
        )
        .expect("valid directions_requests_total metric");

        let directions_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "directions_latency_seconds",
                "Latency of directions provider calls in seconds",
            ),
            &["outcome"],
        )
        .expect("valid directions_latency_seconds metric");

        let geocode_requests_total = IntCounterVec::new(
            Opts::new("geocode_requests_total", "Geocode responses by outcome"),
            &["outcome"],
        )
        .expect("valid geocode_requests_total metric");

        let open_route_drafts = IntGauge::new("open_route_drafts", "Route drafts currently open")
            .expect("valid open_route_drafts metric");

        let route_saves_total = IntCounterVec::new(
            Opts::new("route_saves_total", "Route save attempts by outcome"),
            &["outcome"],
        )
        .expect("valid route_saves_total metric");

        registry
            .register(Box::new(active_sessions.clone()))
            .expect("register active_sessions");
        registry
            .register(Box::new(location_fixes_total.clone()))
            .expect("register location_fixes_total");
        registry
            .register(Box::new(directions_requests_total.clone()))
            .expect("register directions_requests_total");
        registry
            .register(Box::new(directions_latency_seconds.clone()))
            .expect("register directions_latency_seconds");
        registry
            .register(Box::new(geocode_requests_total.clone()))
            .expect("register geocode_requests_total");
        registry
            .register(Box::new(open_route_drafts.clone()))
            .expect("register open_route_drafts");
        registry
            .register(Box::new(route_saves_total.clone()))
            .expect("register route_saves_total");

        Self {
            registry,
            active_sessions,
            location_fixes_total,
            directions_requests_total,
            directions_latency_seconds,
            geocode_requests_total,
            open_route_drafts,
            route_saves_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
