//! Crate-wide error type.
//!
//! Every failure in the hole-filling pipeline is fatal for the run: there is
//! no recoverable path, so the variants exist to carry enough context for a
//! useful message before the process exits.
use crate::image::Region;
use crate::poisson::SolverError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),
    #[error("point cloud and mask must be the same size! cloud is {cloud} and mask is {mask}")]
    RegionMismatch { cloud: Region, mask: Region },
    #[error("raster dimensions differ: expected {expected}, found {found}")]
    DimensionMismatch { expected: Region, found: Region },
    #[error("channel index {index} out of range for a {channels}-channel raster")]
    ChannelOutOfRange { index: usize, channels: usize },
    #[error("expected a {expected}-channel raster, found {found} channels")]
    ChannelCount { expected: usize, found: usize },
    #[error("fill could not make progress with {remaining} hole cells left")]
    FillIncomplete { remaining: usize },
    #[error("depth reconstruction failed: {0}")]
    Solver(#[from] SolverError),
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
