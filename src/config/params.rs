use crate::error::{Error, Result};
use crate::fill::{SmallHoleOptions, TextureFillOptions};
use crate::poisson::SolverOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Tunables of both pipelines. Every group falls back to its defaults when
/// absent from a config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub texture: TextureFillOptions,
    pub small_holes: SmallHoleOptions,
    pub solver: SolverOptions,
}

impl PipelineParams {
    pub fn validate(&self) -> Result<()> {
        if self.texture.patch_size().is_none() {
            return Err(Error::Config(format!(
                "texture.patch_half_width {} is too large",
                self.texture.patch_half_width
            )));
        }
        if self.texture.knn_candidates == 0 {
            return Err(Error::Config("texture.knn_candidates must be positive".into()));
        }
        if self.small_holes.downsample_factor == 0 {
            return Err(Error::Config(
                "small_holes.downsample_factor must be at least 1".into(),
            ));
        }
        if self.small_holes.kernel_radius == 0 {
            return Err(Error::Config("small_holes.kernel_radius must be at least 1".into()));
        }
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            return Err(Error::Config("solver.tolerance must be a positive number".into()));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<PipelineParams> {
    let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let params: PipelineParams =
        serde_json::from_str(&data).map_err(|e| Error::parse(path, e.to_string()))?;
    params.validate()?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let params: PipelineParams =
            serde_json::from_str(r#"{ "texture": { "knn_candidates": 12 } }"#).unwrap();
        assert_eq!(params.texture.knn_candidates, 12);
        assert_eq!(params.texture.patch_half_width, 7);
        assert_eq!(params.small_holes, SmallHoleOptions::default());
        assert_eq!(params.solver.tolerance, 1e-6);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut params = PipelineParams::default();
        assert!(params.validate().is_ok());
        params.solver.tolerance = 0.0;
        assert!(matches!(params.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_kernel_radius_is_rejected() {
        let params: PipelineParams =
            serde_json::from_str(r#"{ "small_holes": { "kernel_radius": 0 } }"#).unwrap();
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("kernel_radius"));
    }

    #[test]
    fn overflowing_patch_half_width_is_rejected() {
        let params = PipelineParams {
            texture: TextureFillOptions::new(usize::MAX),
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(Error::Config(_))));
        let params = PipelineParams {
            texture: TextureFillOptions::new(15),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = load_config(Path::new("/nonexistent/params.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/params.json"));
    }
}
