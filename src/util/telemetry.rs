//! Log subscriber and OpenTelemetry export.
//!
//! Logs always go to stderr through a `tracing-subscriber` fmt layer filtered
//! by `RUST_LOG` (default `info`); stdout is reserved for command output.
//!
//! With the `telemetry` feature and any `OTEL_EXPORTER_OTLP_*` variable set,
//! spans and metrics are also exported over OTLP, using
//! `OTEL_EXPORTER_OTLP_PROTOCOL` (`http/protobuf` or `grpc`).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn fmt_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer().with_writer(std::io::stderr)
}

/// Telemetry setup. Call [`Telemetry::register`] once, early in `main`.
#[derive(Debug, Clone)]
pub struct Telemetry {
    name: String,
    version: String,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    /// Installs the global subscriber. Keep the returned guard alive for the
    /// life of the process: dropping it flushes and shuts down exporters.
    pub fn register(self) -> TelemetryGuard {
        if let Some(guard) = self.register_otlp() {
            return guard;
        }
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer())
            .init();
        tracing::debug!("OpenTelemetry export is not enabled");
        TelemetryGuard::default()
    }

    #[cfg(not(feature = "telemetry"))]
    fn register_otlp(&self) -> Option<TelemetryGuard> {
        None
    }

    #[cfg(feature = "telemetry")]
    fn register_otlp(&self) -> Option<TelemetryGuard> {
        use opentelemetry::trace::TracerProvider as _;
        use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};

        let protocol = otlp::TelemetryProtocol::from_env()?;
        let providers = match otlp::Providers::init(protocol, &self.name, &self.version) {
            Ok(providers) => providers,
            Err(e) => {
                eprintln!("OpenTelemetry export disabled: {e}");
                return None;
            }
        };
        let tracer = providers.tracer.tracer(self.name.clone());
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer())
            .with(MetricsLayer::new(providers.meter.clone()))
            .with(OpenTelemetryLayer::new(tracer))
            .init();
        tracing::info!(?protocol, "OpenTelemetry export is enabled");
        Some(TelemetryGuard {
            providers: Some(providers),
        })
    }
}

/// Shuts exporters down on drop.
#[derive(Default)]
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    providers: Option<otlp::Providers>,
}

#[cfg(feature = "telemetry")]
impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(providers) = self.providers.take() {
            providers.shutdown();
        }
    }
}

#[cfg(feature = "telemetry")]
mod otlp {
    use opentelemetry::{KeyValue, global};
    use opentelemetry_otlp::ExporterBuildError;
    use opentelemetry_sdk::Resource;
    use opentelemetry_sdk::metrics::{MeterProviderBuilder, PeriodicReader, SdkMeterProvider};
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
    use opentelemetry_semantic_conventions::SCHEMA_URL;
    use opentelemetry_semantic_conventions::attribute::{
        DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_VERSION,
    };
    use std::env;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TelemetryProtocol {
        Http,
        Grpc,
    }

    impl TelemetryProtocol {
        /// `None` unless an OTLP exporter variable is set.
        pub fn from_env() -> Option<Self> {
            let enabled = [
                "OTEL_EXPORTER_OTLP_ENDPOINT",
                "OTEL_EXPORTER_OTLP_HEADERS",
                "OTEL_EXPORTER_OTLP_PROTOCOL",
            ]
            .iter()
            .any(|var| env::var(var).is_ok());
            if !enabled {
                return None;
            }
            match env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
                Ok("grpc") => Some(TelemetryProtocol::Grpc),
                _ => Some(TelemetryProtocol::Http),
            }
        }
    }

    fn resource(name: &str, version: &str) -> Resource {
        let deployment_env = env::var("DEPLOYMENT_ENV").unwrap_or_else(|_| "develop".to_string());
        Resource::builder()
            .with_service_name(name.to_string())
            .with_schema_url(
                [
                    KeyValue::new(SERVICE_VERSION, version.to_string()),
                    KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, deployment_env),
                ],
                SCHEMA_URL,
            )
            .build()
    }

    pub struct Providers {
        pub tracer: SdkTracerProvider,
        pub meter: SdkMeterProvider,
    }

    impl Providers {
        pub fn init(
            protocol: TelemetryProtocol,
            name: &str,
            version: &str,
        ) -> Result<Self, ExporterBuildError> {
            let spans = opentelemetry_otlp::SpanExporter::builder();
            let spans = match protocol {
                TelemetryProtocol::Http => spans.with_http().build()?,
                TelemetryProtocol::Grpc => spans.with_tonic().build()?,
            };
            let tracer = SdkTracerProvider::builder()
                .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource(name, version))
                .with_batch_exporter(spans)
                .build();

            let metrics = opentelemetry_otlp::MetricExporter::builder();
            let metrics = match protocol {
                TelemetryProtocol::Http => metrics.with_http().build()?,
                TelemetryProtocol::Grpc => metrics.with_tonic().build()?,
            };
            let reader = PeriodicReader::builder(metrics)
                .with_interval(Duration::from_secs(30))
                .build();
            let meter = MeterProviderBuilder::default()
                .with_resource(resource(name, version))
                .with_reader(reader)
                .build();
            global::set_meter_provider(meter.clone());

            Ok(Self { tracer, meter })
        }

        pub fn shutdown(self) {
            if let Err(err) = self.tracer.shutdown() {
                eprintln!("{err:?}");
            }
            if let Err(err) = self.meter.shutdown() {
                eprintln!("{err:?}");
            }
        }
    }
}
