mod builder;
mod node;

pub use builder::Builder;
/// Re-exported so callers need only depend on `flarego-core` for the whole
/// tree surface (build, snapshot, diff).
pub use flarego_model::diff;
