//! Flamegraph tree, samplers, collector, and exporters: the in-process half
//! of the FlareGo profiling pipeline, upstream of the gateway.
#![allow(missing_docs)]

mod collector;
pub mod error;
pub mod exporter;
pub mod samplers;
pub mod tree;

pub use collector::Collector;
pub use error::{CoreError, ExportError, Result};
pub use exporter::Exporter;
pub use samplers::{Sampler, SamplerError, SamplerHandle};
pub use tree::Builder;
