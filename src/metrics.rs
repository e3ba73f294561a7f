//! Request metrics and tracing helpers.
//!
//! With the `metrics` feature, [`METRICS`] records request counts and
//! latencies, page fetches and precondition failures through OpenTelemetry,
//! exported in Prometheus format. With the `tracing` feature,
//! [`tracing_helpers`] opens one span per store request.

#[cfg(feature = "metrics")]
pub use self::otel::{KeyvalMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        metrics::{Counter, Histogram, MeterProvider},
        KeyValue,
    };
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<KeyvalMetrics> = Lazy::new(KeyvalMetrics::init);

    pub struct KeyvalMetrics {
        pub registry: Registry,
        pub provider: SdkMeterProvider,
        pub requests_total: Counter<u64>,
        pub request_duration: Histogram<f64>,
        pub pages_fetched: Counter<u64>,
        pub page_duration: Histogram<f64>,
        pub precondition_failures: Counter<u64>,
    }

    impl KeyvalMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let exporter = opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
                .expect("failed to build prometheus exporter");
            let provider = SdkMeterProvider::builder().with_reader(exporter).build();
            let meter = provider.meter("keyval");

            let requests_total = meter
                .u64_counter("keyval_requests_total")
                .with_description("Total store requests issued")
                .build();

            let request_duration = meter
                .f64_histogram("keyval_request_duration_seconds")
                .with_description("Duration of store requests")
                .build();

            let pages_fetched = meter
                .u64_counter("keyval_pages_fetched_total")
                .with_description("Pages fetched by lazy sequences")
                .build();

            let page_duration = meter
                .f64_histogram("keyval_page_fetch_seconds")
                .with_description("Duration of page fetches")
                .build();

            let precondition_failures = meter
                .u64_counter("keyval_precondition_failures_total")
                .with_description("Conditional requests rejected by the store")
                .build();

            Self {
                registry,
                provider,
                requests_total,
                request_duration,
                pages_fetched,
                page_duration,
                precondition_failures,
            }
        }

        pub fn record_request(&self, op: &'static str, elapsed: Duration) {
            let attrs = [KeyValue::new("op", op)];
            self.requests_total.add(1, &attrs);
            self.request_duration.record(elapsed.as_secs_f64(), &attrs);
        }

        pub fn record_page(&self, elapsed: Duration) {
            self.pages_fetched.add(1, &[]);
            self.page_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_precondition_failure(&self, op: &'static str) {
            self.precondition_failures.add(1, &[KeyValue::new("op", op)]);
        }

        /// Current metrics in the Prometheus text exposition format
        pub fn encode_text(&self) -> prometheus::Result<String> {
            let mut buf = Vec::new();
            TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_requests_are_exported() {
            METRICS.record_request("get", Duration::from_millis(3));
            METRICS.record_precondition_failure("put");

            let text = METRICS.encode_text().unwrap();
            assert!(text.contains("keyval_requests_total"));
            assert!(text.contains("keyval_precondition_failures_total"));
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    /// Span around a single store request
    pub fn request_span(op: &'static str, table: &str) -> Span {
        tracing::debug_span!("keyval.request", op, table)
    }

}
