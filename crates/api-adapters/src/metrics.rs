//! Prometheus metrics, exposed in OpenMetrics text at `/metrics`.

use std::fmt;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    pub bookings_created: Counter,
    pub live_events_delivered: Counter,
    pub live_subscriptions: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("estate");
        let bookings_created = Counter::default();
        let live_events_delivered = Counter::default();
        let live_subscriptions = Gauge::default();

        registry.register(
            "bookings_created",
            "Booking requests written",
            bookings_created.clone(),
        );
        registry.register(
            "live_events_delivered",
            "Live events accepted by an open channel",
            live_events_delivered.clone(),
        );
        registry.register(
            "live_subscriptions",
            "Currently open live channels",
            live_subscriptions.clone(),
        );

        Self { registry, bookings_created, live_events_delivered, live_subscriptions }
    }

    pub fn render(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
