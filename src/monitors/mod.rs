//! Metric sources of the agent

use crate::metric::Metric;

pub mod runtime;

pub use runtime::RuntimeSampler;

/// Something that can be polled for the current gauge readings
pub trait Sampler: Send + 'static {
    fn sample(&mut self) -> Vec<Metric>;
}
