use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    demo::{self, DemoArgs},
    frameworks::{self, FrameworksArgs},
    intercept::{self, InterceptArgs},
    version::{self, VersionArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "disent-sim", about = "Adaptive posterior averaging CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Intercept a posterior pair and emit the change estimate.
    Intercept(InterceptArgs),
    /// Sample synthetic pairs and report how well changed factors are recovered.
    Demo(DemoArgs),
    /// List the registered training frameworks.
    Frameworks(FrameworksArgs),
    /// Print version information.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so JSON on stdout stays machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Intercept(args) => intercept::run(&args),
        Command::Demo(args) => demo::run(&args),
        Command::Frameworks(args) => frameworks::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
