pub mod clients;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod extractor;
pub mod flatten;
pub mod pipeline;
pub mod plugins;
pub mod prompts;
pub mod registry;
pub mod utils;

pub use error::{PipelineError, Result};
pub use pipeline::{run_pipeline, PipelineRequest, ResultEnvelope};
pub use registry::PluginRegistry;
