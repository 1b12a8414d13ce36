use std::error::Error;
use std::process::Command;

use clap::Args;
use disent_ada::{AverageMode, ThresholdMode, REPORT_SCHEMA};
use disent_core::SchemaVersion;
use serde::Serialize;

use super::print_canonical;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Emit extended metadata including the report schema and toolchain.
    #[arg(long)]
    pub long: bool,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: String,
    report_schema: SchemaVersion,
    average_modes: Vec<&'static str>,
    thresh_modes: Vec<&'static str>,
    rustc: String,
}

pub fn run(args: &VersionArgs) -> Result<(), Box<dyn Error>> {
    if !args.long {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    print_canonical(&gather_info())
}

fn gather_info() -> VersionInfo {
    let rustc = Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .and_then(|out| {
            if out.status.success() {
                Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "rustc unavailable".into());
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").into(),
        report_schema: REPORT_SCHEMA,
        average_modes: AverageMode::keys(),
        thresh_modes: ThresholdMode::keys(),
        rustc,
    }
}
