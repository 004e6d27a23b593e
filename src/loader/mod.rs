pub mod registry;
pub mod sample_loader;

pub use registry::SampleRegistry;
