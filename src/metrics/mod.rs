mod server;

use prometheus::{
    HistogramOpts, Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

pub use server::start_metrics_server;

// ============================================================================
// Placement Metrics - Prometheus metrics for observability
// ============================================================================
//
// - orders processed per outcome (placed, already_complete, stuck, failed)
// - line items capped against stock
// - per-order processing latency
// - notification and alert counts
// - notifier circuit breaker state
//
// Scraped via /metrics when the metrics server is enabled.
// ============================================================================

pub struct PlacementMetrics {
    registry: Registry,

    pub orders_total: IntCounterVec,
    pub line_items_capped_total: IntCounter,
    pub order_duration: Histogram,
    pub notifications_total: IntCounterVec,
    pub alerts_total: IntCounterVec,
    pub notifier_circuit_state: IntGauge,
}

impl PlacementMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_total = IntCounterVec::new(
            Opts::new("placement_orders_total", "Standing order proxy orders processed"),
            &["outcome"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let line_items_capped_total = IntCounter::new(
            "placement_line_items_capped_total",
            "Line items reduced to available stock",
        )?;
        registry.register(Box::new(line_items_capped_total.clone()))?;

        let order_duration = Histogram::with_opts(
            HistogramOpts::new("placement_duration_seconds", "Time spent placing one order")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(order_duration.clone()))?;

        let notifications_total = IntCounterVec::new(
            Opts::new("placement_notifications_total", "Placement notifications dispatched"),
            &["result"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let alerts_total = IntCounterVec::new(
            Opts::new("placement_alerts_total", "Operational alerts raised"),
            &["kind"],
        )?;
        registry.register(Box::new(alerts_total.clone()))?;

        let notifier_circuit_state = IntGauge::new(
            "notifier_circuit_breaker_state",
            "Notifier circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(notifier_circuit_state.clone()))?;

        Ok(Self {
            registry,
            orders_total,
            line_items_capped_total,
            order_duration,
            notifications_total,
            alerts_total,
            notifier_circuit_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order(&self, outcome: &str, duration_secs: f64) {
        self.orders_total.with_label_values(&[outcome]).inc();
        self.order_duration.observe(duration_secs);
    }

    pub fn record_capped(&self, count: usize) {
        self.line_items_capped_total.inc_by(count as u64);
    }

    pub fn record_notification(&self, delivered: bool) {
        let result = if delivered { "delivered" } else { "failed" };
        self.notifications_total.with_label_values(&[result]).inc();
    }

    pub fn record_alert(&self, kind: &str) {
        self.alerts_total.with_label_values(&[kind]).inc();
    }

    pub fn set_notifier_circuit_state(&self, code: i64) {
        self.notifier_circuit_state.set(code);
    }
}
