use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use disent_ada::{build_intercept_report, load_config, pair_from_json, ExperimentConfig};
use disent_core::{DisentError, ErrorInfo};
use tracing::info;

use super::{print_canonical, write_json};

#[derive(Args, Debug)]
pub struct InterceptArgs {
    /// JSON document holding the `first` and `second` posteriors.
    #[arg(long)]
    pub pair: PathBuf,
    /// YAML or JSON experiment configuration; defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory receiving `intercept_report.json`; the report is printed when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Runs the configured interceptor over a single posterior pair.
pub fn run(args: &InterceptArgs) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ExperimentConfig::default(),
    };
    let spec = config.framework.spec();
    let interceptor = config.framework.interceptor().ok_or_else(|| {
        DisentError::Config(
            ErrorInfo::new("no-interceptor", "framework does not intercept posteriors")
                .with_context("framework", spec.name)
                .with_hint("set `framework: ada_vae`"),
        )
    })?;

    let pair = pair_from_json(&fs::read_to_string(&args.pair)?)?;
    let report = build_intercept_report(&interceptor, pair)?;
    info!(
        batch = report.batch_size,
        unchanged = report.unchanged_count,
        hash = %report.report_hash,
        "intercept report ready"
    );

    match &args.out {
        Some(out) => {
            fs::create_dir_all(out)?;
            let path = out.join("intercept_report.json");
            write_json(&path, &report)?;
            info!(path = %path.display(), "wrote intercept report");
        }
        None => print_canonical(&report)?,
    }
    Ok(())
}
