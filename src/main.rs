//! imph CLI entrypoint

use clap::Parser;

use import_helper::cli::Cli;
use import_helper::output;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}
