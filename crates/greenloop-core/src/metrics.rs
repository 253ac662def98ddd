//! `OpenTelemetry` metrics for the reward ledger.
//!
//! Only compiled with the `metrics` Cargo feature. Sets up the OTLP exporter
//! for traces and metrics and exposes the ledger counters the server bumps
//! after each committed ledger write.

use opentelemetry::metrics::Counter;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Errors that can occur during metrics / tracing pipeline initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// Keeps the `OpenTelemetry` providers alive.
///
/// Dropping it does not flush; call [`MetricsGuard::shutdown`] before exit.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Gracefully shut down both providers, flushing buffered telemetry.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        self.tracer_provider.shutdown()?;
        self.meter_provider.shutdown()?;
        Ok(())
    }
}

/// Initialise the OTLP pipeline for traces and metrics.
///
/// * `endpoint` -- OTLP receiver URL, e.g. `"http://localhost:4317"` (gRPC).
pub fn init_metrics(endpoint: &str) -> Result<MetricsGuard, MetricsError> {
    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();

    global::set_meter_provider(meter_provider.clone());

    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}

/// Counters for committed ledger writes.
#[derive(Clone)]
pub struct LedgerMetrics {
    coins_awarded: Counter<u64>,
    vouchers_purchased: Counter<u64>,
    coins_exchanged: Counter<u64>,
}

impl LedgerMetrics {
    /// Register the counters on the global meter provider.
    pub fn new() -> Self {
        let meter = global::meter("greenloop");
        Self {
            coins_awarded: meter
                .u64_counter("greenloop.ledger.coins_awarded")
                .with_description("Green coins credited for completed bookings")
                .build(),
            vouchers_purchased: meter
                .u64_counter("greenloop.ledger.vouchers_purchased")
                .with_description("Vouchers bought with green coins")
                .build(),
            coins_exchanged: meter
                .u64_counter("greenloop.ledger.coins_exchanged")
                .with_description("Green coins converted to cash")
                .build(),
        }
    }

    pub fn record_award(&self, coins: i64, waste_type: &str) {
        self.coins_awarded.add(
            coins.unsigned_abs(),
            &[KeyValue::new("waste_type", waste_type.to_string())],
        );
    }

    pub fn record_purchase(&self, title: &str) {
        self.vouchers_purchased
            .add(1, &[KeyValue::new("voucher", title.to_string())]);
    }

    pub fn record_exchange(&self, coins: i64) {
        self.coins_exchanged.add(coins.unsigned_abs(), &[]);
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
