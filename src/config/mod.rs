//! Pipeline parameters and command-line handling for the binaries.

pub mod cli;
pub mod params;

pub use cli::{CliArgs, POSITIONAL_ARGS};
pub use params::{load_config, PipelineParams};
