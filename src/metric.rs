//! Metric value model
//!
//! A metric is either a **gauge** (a float that is overwritten on every
//! update) or a **counter** (an integer that accumulates by addition).
//! The kind is fixed when the metric is constructed, so the value can never
//! disagree with the type.
//!
//! ## Wire format
//!
//! On the wire (HTTP bodies and snapshot files) a metric is a flat object:
//!
//! ```json
//! { "id": "Alloc", "type": "gauge", "value": 120.5 }
//! { "id": "PollCount", "type": "counter", "delta": 3 }
//! ```
//!
//! Exactly one of `value` / `delta` is present. Decoding rejects payloads
//! that violate this.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(MetricError::UnknownKind(other.to_string())),
        }
    }
}

/// Current value of a metric, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Last reported value
    Gauge(f64),

    /// Accumulated delta
    Counter(i64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Gauge(value) => write!(f, "{value}"),
            MetricValue::Counter(delta) => write!(f, "{delta}"),
        }
    }
}

/// A single named metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricPayload", into = "MetricPayload")]
pub struct Metric {
    pub id: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Counter(delta),
        }
    }

    /// Parse a metric from the three path segments of a plain-text update
    /// (`/update/{type}/{name}/{value}`).
    pub fn parse(kind: &str, id: &str, raw: &str) -> Result<Self, MetricError> {
        let kind: MetricKind = kind.parse()?;
        let invalid = || MetricError::InvalidValue {
            kind,
            raw: raw.to_string(),
        };

        let value = match kind {
            MetricKind::Gauge => MetricValue::Gauge(raw.parse().map_err(|_| invalid())?),
            MetricKind::Counter => MetricValue::Counter(raw.parse().map_err(|_| invalid())?),
        };

        let metric = Self {
            id: id.to_string(),
            value,
        };
        metric.validate()?;
        Ok(metric)
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    /// Check the invariants that the type system cannot express
    ///
    /// Gauges must be finite: JSON has no representation for NaN or
    /// infinity, so such a value could be neither reported nor restored.
    pub fn validate(&self) -> Result<(), MetricError> {
        if self.id.is_empty() {
            return Err(MetricError::EmptyId);
        }
        if let MetricValue::Gauge(value) = self.value
            && !value.is_finite()
        {
            return Err(MetricError::InvalidValue {
                kind: MetricKind::Gauge,
                raw: value.to_string(),
            });
        }
        Ok(())
    }

    /// Merge an update for the same `(kind, id)` into this metric.
    ///
    /// Gauges take the incoming value, counters add the incoming delta.
    /// Counter addition wraps on overflow.
    pub fn merge(&mut self, incoming: &Metric) {
        debug_assert_eq!(self.id, incoming.id);

        match (&mut self.value, incoming.value) {
            (MetricValue::Counter(current), MetricValue::Counter(delta)) => {
                *current = current.wrapping_add(delta);
            }
            (value, incoming) => *value = incoming,
        }
    }
}

/// Flat JSON representation of a [`Metric`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: MetricKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl TryFrom<MetricPayload> for Metric {
    type Error = MetricError;

    fn try_from(payload: MetricPayload) -> Result<Self, Self::Error> {
        let value = match (payload.kind, payload.delta, payload.value) {
            (MetricKind::Gauge, None, Some(value)) => MetricValue::Gauge(value),
            (MetricKind::Counter, Some(delta), None) => MetricValue::Counter(delta),
            (kind, Some(_), Some(_)) => return Err(MetricError::UnexpectedValue(kind)),
            (MetricKind::Gauge, Some(_), None) => {
                return Err(MetricError::UnexpectedValue(MetricKind::Gauge));
            }
            (MetricKind::Counter, None, Some(_)) => {
                return Err(MetricError::UnexpectedValue(MetricKind::Counter));
            }
            (kind, None, None) => return Err(MetricError::MissingValue(kind)),
        };

        let metric = Metric {
            id: payload.id,
            value,
        };
        metric.validate()?;
        Ok(metric)
    }
}

impl From<Metric> for MetricPayload {
    fn from(metric: Metric) -> Self {
        let (delta, value) = match metric.value {
            MetricValue::Gauge(value) => (None, Some(value)),
            MetricValue::Counter(delta) => (Some(delta), None),
        };

        Self {
            id: metric.id,
            kind: metric.value.kind(),
            delta,
            value,
        }
    }
}

/// All metrics, grouped by kind and keyed by id
///
/// Serializes as `{ "gauge": { "<id>": <metric>, ... }, "counter": { ... } }`,
/// which is also the snapshot file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricCollection(BTreeMap<MetricKind, BTreeMap<String, Metric>>);

impl MetricCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: MetricKind, id: &str) -> Option<&Metric> {
        self.0.get(&kind)?.get(id)
    }

    /// Insert the metric, replacing whatever was stored under its key
    pub fn insert(&mut self, metric: Metric) {
        self.0
            .entry(metric.kind())
            .or_default()
            .insert(metric.id.clone(), metric);
    }

    /// Apply an update: merge into the existing entry or insert it as the
    /// initial value.
    pub fn apply(&mut self, metric: Metric) {
        let bucket = self.0.entry(metric.kind()).or_default();
        match bucket.get_mut(&metric.id) {
            Some(existing) => existing.merge(&metric),
            None => {
                bucket.insert(metric.id.clone(), metric);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all metrics, gauges first, ids in lexical order
    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.0.values().flat_map(BTreeMap::values)
    }

    /// First entry filed under a kind or id other than its own
    pub fn misplaced(&self) -> Option<(MetricKind, &str, &Metric)> {
        self.0
            .iter()
            .flat_map(|(kind, bucket)| {
                bucket
                    .iter()
                    .map(move |(id, metric)| (*kind, id.as_str(), metric))
            })
            .find(|(kind, id, metric)| metric.kind() != *kind || metric.id != *id)
    }
}

impl FromIterator<Metric> for MetricCollection {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        let mut collection = Self::new();
        for metric in iter {
            collection.insert(metric);
        }
        collection
    }
}

/// Errors raised while parsing or validating a metric
#[derive(Debug, Clone, PartialEq)]
pub enum MetricError {
    /// Metric id is empty
    EmptyId,

    /// Metric type is neither `gauge` nor `counter`
    UnknownKind(String),

    /// Raw value could not be parsed as the number type of the metric
    InvalidValue { kind: MetricKind, raw: String },

    /// The field carrying the value for this kind is absent
    MissingValue(MetricKind),

    /// The field that belongs to the other kind is populated
    UnexpectedValue(MetricKind),
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricError::EmptyId => write!(f, "metric id must not be empty"),
            MetricError::UnknownKind(kind) => write!(f, "unknown metric type: {kind}"),
            MetricError::InvalidValue { kind, raw } => {
                write!(f, "invalid {kind} value: {raw:?}")
            }
            MetricError::MissingValue(MetricKind::Gauge) => {
                write!(f, "gauge metric requires a value")
            }
            MetricError::MissingValue(MetricKind::Counter) => {
                write!(f, "counter metric requires a delta")
            }
            MetricError::UnexpectedValue(MetricKind::Gauge) => {
                write!(f, "gauge metric must not carry a delta")
            }
            MetricError::UnexpectedValue(MetricKind::Counter) => {
                write!(f, "counter metric must not carry a value")
            }
        }
    }
}

impl std::error::Error for MetricError {}
