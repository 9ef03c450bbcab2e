//! Gauge samples, metric sinks and Prometheus exposition.
//!
//! Collectors push [`Sample`]s into a [`MetricSink`]. How samples are
//! aggregated or served is up to the sink: [`RegistrySink`] loads them into a
//! `prometheus::Registry` for text exposition, a plain `Vec` keeps them for
//! JSON output, and a multi-collector agent can hand each collector a channel
//! `Sender`.

use std::collections::HashMap;
use std::sync::mpsc::Sender;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use tracing::warn;

/// One labeled gauge observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Fully-qualified metric name.
    pub name: String,
    pub help: String,
    pub value: f64,
    pub labels: Vec<(String, String)>,
}

impl Sample {
    /// Creates a gauge sample named after `opts`.
    pub fn gauge(opts: &Opts, value: f64, labels: Vec<(String, String)>) -> Self {
        Self {
            name: opts.fq_name(),
            help: opts.help.clone(),
            value,
            labels,
        }
    }

    /// Returns the value of label `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Receiver of samples produced by a collection pass.
pub trait MetricSink {
    fn emit(&mut self, sample: Sample);
}

impl MetricSink for Vec<Sample> {
    fn emit(&mut self, sample: Sample) {
        self.push(sample);
    }
}

impl MetricSink for Sender<Sample> {
    fn emit(&mut self, sample: Sample) {
        if let Err(e) = self.send(sample) {
            warn!("Dropping sample {}: receiver disconnected", e.0.name);
        }
    }
}

/// Sink that records samples as `GaugeVec`s in a fresh Prometheus registry.
///
/// The first registration or labeling failure is kept and returned by
/// [`RegistrySink::into_text`]; later samples are still recorded.
pub struct RegistrySink {
    registry: Registry,
    gauges: HashMap<String, GaugeVec>,
    failure: Option<prometheus::Error>,
}

impl RegistrySink {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            gauges: HashMap::new(),
            failure: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn record(&mut self, sample: &Sample) -> prometheus::Result<()> {
        if !self.gauges.contains_key(&sample.name) {
            let label_names: Vec<&str> =
                sample.labels.iter().map(|(key, _)| key.as_str()).collect();
            let gauge = GaugeVec::new(
                Opts::new(sample.name.clone(), sample.help.clone()),
                &label_names,
            )?;
            self.registry.register(Box::new(gauge.clone()))?;
            self.gauges.insert(sample.name.clone(), gauge);
        }
        let gauge = &self.gauges[&sample.name];

        let label_values: Vec<&str> = sample
            .labels
            .iter()
            .map(|(_, value)| value.as_str())
            .collect();
        gauge
            .get_metric_with_label_values(&label_values)?
            .set(sample.value);
        Ok(())
    }

    /// Encodes everything recorded so far in the text exposition format.
    pub fn into_text(self) -> prometheus::Result<String> {
        if let Some(e) = self.failure {
            return Err(e);
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for RegistrySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSink for RegistrySink {
    fn emit(&mut self, sample: Sample) {
        if let Err(e) = self.record(&sample) {
            warn!("Failed to record sample {}: {}", sample.name, e);
            self.failure.get_or_insert(e);
        }
    }
}

/// Renders samples in the Prometheus text exposition format.
pub fn render_text(samples: &[Sample]) -> prometheus::Result<String> {
    let mut sink = RegistrySink::new();
    for sample in samples {
        sink.emit(sample.clone());
    }
    sink.into_text()
}
