//! Command-line parsing shared by the binaries.
//!
//! Both tools take exactly four positional arguments. Option flags
//! (`--config`, `--report`, `--diagnostics`) take one value each and may
//! appear anywhere; they do not count as positionals.
use super::params::{load_config, PipelineParams};
use crate::error::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

pub const POSITIONAL_ARGS: usize = 4;

#[derive(Parser, Clone, Debug, Default, PartialEq)]
#[command(no_binary_name = true)]
pub struct CliArgs {
    /// Every argument as given, for echoing in usage errors.
    #[arg(skip)]
    pub raw: Vec<String>,
    /// Input and output paths, checked by [`CliArgs::expect_positional`].
    #[arg(value_name = "ARG")]
    pub positional: Vec<String>,
    /// JSON file with pipeline parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the run report as JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Directory for intermediate artifacts.
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,
}

impl CliArgs {
    /// Split `args` (without the program name) into flags and positionals.
    /// Only flags named in `accepted` are recognised.
    pub fn parse<I>(args: I, accepted: &[&str]) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let raw: Vec<String> = args.into_iter().collect();
        let mut out =
            <Self as Parser>::try_parse_from(&raw).map_err(|e| Error::Usage(e.to_string()))?;
        for (flag, given) in [
            ("--config", out.config.is_some()),
            ("--report", out.report.is_some()),
            ("--diagnostics", out.diagnostics.is_some()),
        ] {
            if given && !accepted.contains(&flag) {
                return Err(Error::Usage(format!("unknown option {flag}")));
            }
        }
        out.raw = raw;
        Ok(out)
    }

    /// The four positionals, or a usage error listing `required` and
    /// echoing what was given.
    pub fn expect_positional(&self, required: &str) -> Result<[&str; POSITIONAL_ARGS]> {
        match self.positional.as_slice() {
            [a, b, c, d] => Ok([a.as_str(), b.as_str(), c.as_str(), d.as_str()]),
            _ => Err(Error::Usage(format!(
                "Required arguments: {required}\nInput arguments: {}",
                self.raw.join(" ")
            ))),
        }
    }

    /// Parameters from `--config`, or the defaults.
    pub fn params(&self) -> Result<PipelineParams> {
        match &self.config {
            Some(path) => load_config(path),
            None => Ok(PipelineParams::default()),
        }
    }
}
