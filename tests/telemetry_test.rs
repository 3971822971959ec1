//! Integration tests for telemetry initialization and span helpers.

use hubqueue::model::item::ItemId;
use hubqueue::telemetry::{self, SERVICE_NAME, TelemetryConfig, metrics};
use opentelemetry::KeyValue;

#[test]
fn telemetry_initializes_without_endpoint() {
    // Only one global subscriber can be set per process; a second init
    // returning an error is acceptable here.
    let config = TelemetryConfig {
        endpoint: None,
        service_name: "hubqueue-test".to_string(),
        log_level: "debug".to_string(),
    };
    if let Ok(guard) = telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
    }
}

#[test]
fn service_name_is_stable() {
    assert_eq!(SERVICE_NAME, "hubqueue");
}

#[test]
fn transition_span_records_outcome() {
    let id = ItemId::new();
    let span = telemetry::queue::start_transition_span("claim", &id, "alice");
    telemetry::queue::record_transition(&span, "applied");
}

#[test]
fn metric_instruments_record_without_a_provider() {
    metrics::items_created().add(1, &[]);
    metrics::transitions().add(
        1,
        &[
            KeyValue::new("event", "claim"),
            KeyValue::new("result", "noop"),
        ],
    );
    metrics::notifications().add(1, &[KeyValue::new("result", "ok")]);
    metrics::file_store_operations().add(1, &[KeyValue::new("operation", "get")]);
    metrics::admission_rejections().add(1, &[KeyValue::new("reason", "maintenance")]);
    metrics::operation_duration_ms().record(1.5, &[KeyValue::new("operation", "queue.claim")]);
}
