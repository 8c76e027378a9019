use log::info;
use rgbd_hole_filling::cloud::ptx::{read_ptx, write_ptx};
use rgbd_hole_filling::cloud::vtp::write_vtp;
use rgbd_hole_filling::config::CliArgs;
use rgbd_hole_filling::image::io::{load_mask, read_meta_image, write_json_file};
use rgbd_hole_filling::pipeline::FileSink;
use rgbd_hole_filling::{HoleFillingPipeline, Result};
use std::env;
use std::path::{Path, PathBuf};

const REQUIRED: &str = "PointCloud.ptx imageMask.mask RGBDxDy.mha outputPrefix";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse(
        env::args().skip(1),
        &["--config", "--report", "--diagnostics"],
    )?;
    let [ptx_path, mask_path, rgbdxdy_path, prefix] = cli.expect_positional(REQUIRED)?;

    info!("Reading ptx: {ptx_path}");
    info!("Reading mask: {mask_path}");
    info!("RGBDxDy: {rgbdxdy_path}");
    info!("Output prefix: {prefix}");

    let params = cli.params()?;
    let cloud = read_ptx(Path::new(ptx_path))?;
    let mask = load_mask(Path::new(mask_path))?;
    let filled = read_meta_image(Path::new(rgbdxdy_path))?;

    let mut sink = FileSink::new(cli.diagnostics.clone().unwrap_or_else(|| PathBuf::from(".")));
    let result =
        HoleFillingPipeline::new(params).run_reconstruction(&cloud, &mask, &filled, &mut sink)?;

    write_ptx(&result.cloud, Path::new(&format!("{prefix}.ptx")))?;
    write_vtp(&result.cloud, Path::new(&format!("{prefix}.vtp")))?;
    if let Some(report) = &cli.report {
        write_json_file(report, &result.report)?;
    }
    info!(
        "Reconstructed {} cells ({} solver iterations, residual {:.2e})",
        result.report.solve.unknowns, result.report.solve.iterations, result.report.solve.residual
    );
    Ok(())
}
