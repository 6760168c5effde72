use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scheduler_ticks_total", "Scheduler ticks executed.");
        describe_counter!("cast_starts_total", "Successful cast start commands.");
        describe_counter!("cast_stops_total", "Successful cast stop commands.");
        describe_counter!("cast_refreshes_total", "Successful content re-casts.");
        describe_counter!("device_failures_total", "Failed device commands.");
        describe_gauge!("cast_active", "1 when event content is on screen.");
        describe_gauge!("scheduler_last_tick_ts", "Unix ts of the last tick.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and describe the scheduler series.
    pub fn init() -> Self {
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_described();

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
