use std::error::Error;

use clap::Args;
use disent_ada::framework_registry;

use super::print_canonical;

#[derive(Args, Debug)]
pub struct FrameworksArgs {
    /// Print only the registry names, one per line.
    #[arg(long)]
    pub names: bool,
}

pub fn run(args: &FrameworksArgs) -> Result<(), Box<dyn Error>> {
    let registry = framework_registry();
    if args.names {
        for spec in &registry {
            println!("{}", spec.name);
        }
        return Ok(());
    }
    print_canonical(&registry)
}
