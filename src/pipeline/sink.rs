//! Destinations for intermediate artifacts of a pipeline run.
//!
//! Drivers hand every intermediate result to a [`DiagnosticSink`] under a
//! fixed name (see [`names`]). The sink decides whether anything is
//! persisted, which keeps the pipelines free of filesystem side effects.
use crate::cloud::vtp::write_vtp;
use crate::cloud::GridCloud;
use crate::error::{Error, Result};
use crate::image::io::{save_rgb_png, write_meta_image};
use crate::image::{ImageView, Raster, Region};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed artifact names written by the reconstruction pipeline.
pub mod names {
    pub const ORIGINAL: &str = "Original";
    pub const RGBD: &str = "RGBD";
    pub const VALID: &str = "Valid";
    pub const INPAINTED_DEPTH_GRADIENTS: &str = "InpaintedDepthGradients";
    pub const INPAINTED_RGB: &str = "InpaintedRGB";
    pub const RECONSTRUCTED_DEPTH: &str = "ReconstructedDepth";
}

#[derive(Clone, Copy, Debug)]
pub enum Artifact<'a> {
    /// Any multi-channel float raster.
    Raster(&'a Raster),
    /// 3-channel colour raster with 0..=255 samples.
    Rgb(&'a Raster),
    /// A point set.
    Cloud(&'a GridCloud),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Raster,
    Rgb,
    Cloud,
}

impl Artifact<'_> {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Raster(_) => ArtifactKind::Raster,
            Artifact::Rgb(_) => ArtifactKind::Rgb,
            Artifact::Cloud(_) => ArtifactKind::Cloud,
        }
    }

    pub fn region(&self) -> Region {
        match self {
            Artifact::Raster(r) | Artifact::Rgb(r) => r.region(),
            Artifact::Cloud(c) => c.region(),
        }
    }
}

pub trait DiagnosticSink {
    fn emit(&mut self, name: &str, artifact: Artifact<'_>) -> Result<()>;
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _name: &str, _artifact: Artifact<'_>) -> Result<()> {
        Ok(())
    }
}

/// Writes `<dir>/<name>.mha` for rasters, `<dir>/<name>.png` for colour
/// rasters and `<dir>/<name>.vtp` for point sets.
#[derive(Clone, Debug)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str, kind: ArtifactKind) -> PathBuf {
        let ext = match kind {
            ArtifactKind::Raster => "mha",
            ArtifactKind::Rgb => "png",
            ArtifactKind::Cloud => "vtp",
        };
        self.dir.join(format!("{name}.{ext}"))
    }
}

impl DiagnosticSink for FileSink {
    fn emit(&mut self, name: &str, artifact: Artifact<'_>) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.path_for(name, artifact.kind());
        match artifact {
            Artifact::Raster(r) => write_meta_image(r, &path)?,
            Artifact::Rgb(r) => save_rgb_png(r, &path)?,
            Artifact::Cloud(c) => write_vtp(c, &path)?,
        }
        debug!("diagnostics: wrote {}", path.display());
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedArtifact {
    pub name: String,
    pub kind: ArtifactKind,
    pub region: Region,
}

/// Remembers what was emitted without keeping the data.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub records: Vec<RecordedArtifact>,
}

impl MemorySink {
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, name: &str, artifact: Artifact<'_>) -> Result<()> {
        self.records.push(RecordedArtifact {
            name: name.to_string(),
            kind: artifact.kind(),
            region: artifact.region(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_picks_extension_by_kind() {
        let sink = FileSink::new("out");
        assert_eq!(
            sink.path_for(names::RGBD, ArtifactKind::Raster),
            Path::new("out/RGBD.mha")
        );
        assert_eq!(
            sink.path_for(names::INPAINTED_RGB, ArtifactKind::Rgb),
            Path::new("out/InpaintedRGB.png")
        );
        assert_eq!(
            sink.path_for(names::VALID, ArtifactKind::Cloud),
            Path::new("out/Valid.vtp")
        );
    }

    #[test]
    fn file_sink_writes_into_its_directory() {
        let dir = std::env::temp_dir().join(format!("rgbd_sink_{}", std::process::id()));
        let mut sink = FileSink::new(&dir);
        let raster = Raster::filled(3, 2, 2, 1.5);
        sink.emit(names::RECONSTRUCTED_DEPTH, Artifact::Raster(&raster))
            .unwrap();
        assert!(dir.join("ReconstructedDepth.mha").is_file());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_sink_records_names_and_kinds() {
        let mut sink = MemorySink::default();
        let rgb = Raster::new(4, 2, 3);
        sink.emit(names::INPAINTED_RGB, Artifact::Rgb(&rgb)).unwrap();
        assert_eq!(sink.names(), ["InpaintedRGB"]);
        assert_eq!(sink.records[0].kind, ArtifactKind::Rgb);
        assert_eq!(sink.records[0].region, Region::new(4, 2));
        NullSink.emit(names::RGBD, Artifact::Rgb(&rgb)).unwrap();
    }
}
