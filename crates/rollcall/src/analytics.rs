//! Analytics sinks.

use tracing::info;

use crate::ports::AnalyticsSink;

/// Emits each capture as a structured `tracing` event on the
/// `rollcall::analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn capture(&self, event: &str, properties: serde_json::Value) {
        info!(target: "rollcall::analytics", %event, %properties, "capture");
    }
}

/// Drops every capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnalytics;

impl AnalyticsSink for NullAnalytics {
    fn capture(&self, _event: &str, _properties: serde_json::Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sinks_accept_any_payload() {
        crate::logging::init_test_logging();
        let sinks: [&dyn AnalyticsSink; 2] = [&TracingAnalytics, &NullAnalytics];
        for sink in sinks {
            sink.capture("wizard_opened", json!({ "mode": "join", "restored": false }));
            sink.capture("profile_created", serde_json::Value::Null);
        }
    }
}
