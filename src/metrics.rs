use crate::pipeline::{ExecutionStrategy, PassReport};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Transformation counters, registered into a caller-owned registry.
#[derive(Clone)]
pub struct Metrics {
    pub transformations: IntCounterVec,
    pub literals_recoded: IntCounter,
    pub encoding_failures: IntCounter,
    pub delegated_failures: IntCounter,
}

impl Metrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let transformations = IntCounterVec::new(
            Opts::new("codeshield_transformations_total", "Completed transformations"),
            &["strategy"],
        )?;
        let literals_recoded = IntCounter::new(
            "codeshield_literals_recoded_total",
            "String literals replaced by decode expressions",
        )?;
        let encoding_failures = IntCounter::new(
            "codeshield_encoding_failures_total",
            "String literals left as-is because they could not be encoded",
        )?;
        let delegated_failures = IntCounter::new(
            "codeshield_delegated_failures_total",
            "Failed calls to the rewriting service",
        )?;

        registry.register(Box::new(transformations.clone()))?;
        registry.register(Box::new(literals_recoded.clone()))?;
        registry.register(Box::new(encoding_failures.clone()))?;
        registry.register(Box::new(delegated_failures.clone()))?;

        Ok(Self {
            transformations,
            literals_recoded,
            encoding_failures,
            delegated_failures,
        })
    }

    pub fn record_success(&self, strategy: ExecutionStrategy, report: Option<&PassReport>) {
        let label = strategy.to_string();
        self.transformations.with_label_values(&[label.as_str()]).inc();
        if let Some(report) = report {
            self.literals_recoded.inc_by(report.literals_recoded as u64);
            self.encoding_failures.inc_by(report.literals_failed as u64);
        }
    }

    pub fn record_delegated_failure(&self) {
        self.delegated_failures.inc();
    }
}

/// Text exposition of everything in `registry`.
pub fn render(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
