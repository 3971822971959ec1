//! Metric instrument factories for hubqueue.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op and recording is free.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter(super::SERVICE_NAME)
}

/// Counter: items created.
pub fn items_created() -> Counter<u64> {
    meter()
        .u64_counter("hubqueue.items.created")
        .with_description("Number of items added to the queue")
        .build()
}

/// Counter: item lifecycle transitions.
/// Labels: `event` ("claim" | "unclaim" | "complete" | "delete"), `result`.
pub fn transitions() -> Counter<u64> {
    meter()
        .u64_counter("hubqueue.items.transitions")
        .with_description("Number of item transitions attempted")
        .build()
}

/// Counter: fan-out notifications.
/// Labels: `event`, `result` ("ok" | "error").
pub fn notifications() -> Counter<u64> {
    meter()
        .u64_counter("hubqueue.fanout.notifications")
        .with_description("Number of fan-out notifications published")
        .build()
}

/// Counter: file store calls.
/// Labels: `operation` ("put" | "get"), `result`.
pub fn file_store_operations() -> Counter<u64> {
    meter()
        .u64_counter("hubqueue.filestore.operations")
        .with_description("Number of file store operations")
        .build()
}

/// Counter: requests turned away by admission.
/// Labels: `reason` ("maintenance" | "self_destructed").
pub fn admission_rejections() -> Counter<u64> {
    meter()
        .u64_counter("hubqueue.admission.rejections")
        .with_description("Requests rejected by maintenance mode or self-destruct")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("hubqueue.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
