use log::info;
use rgbd_hole_filling::cloud::ptx::{read_ptx, write_ptx};
use rgbd_hole_filling::cloud::vtp::write_vtp;
use rgbd_hole_filling::config::CliArgs;
use rgbd_hole_filling::image::io::{load_mask, write_json_file};
use rgbd_hole_filling::{Error, HoleFillingPipeline, Result};
use std::env;
use std::path::Path;

const REQUIRED: &str = "PointCloud.ptx imageMask.mask patchHalfWidth output";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse(env::args().skip(1), &["--config", "--report"])?;
    let [ptx_path, mask_path, half_width, output] = cli.expect_positional(REQUIRED)?;
    let patch_half_width: usize = half_width
        .parse()
        .map_err(|_| Error::Usage(format!("patchHalfWidth must be a non-negative integer, got {half_width}")))?;

    info!("Reading ptx: {ptx_path}");
    info!("Reading mask: {mask_path}");
    info!("Patch half width: {patch_half_width}");
    info!("Output: {output}");

    let mut params = cli.params()?;
    params.texture.patch_half_width = patch_half_width;
    params.validate()?;

    let cloud = read_ptx(Path::new(ptx_path))?;
    let mask = load_mask(Path::new(mask_path))?;
    let result = HoleFillingPipeline::new(params).run_full(&cloud, &mask)?;

    let output = Path::new(output);
    if output.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("ptx")) {
        write_ptx(&result.cloud, output)?;
    } else {
        write_vtp(&result.cloud, output)?;
    }
    if let Some(report) = &cli.report {
        write_json_file(report, &result.report)?;
    }
    info!(
        "Filled {} hole cells in {:.1} ms",
        result.report.hole_cells, result.report.timings.total_ms
    );
    Ok(())
}
