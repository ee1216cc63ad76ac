use clap::Parser;
use turtletrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
