use clap::Parser;
use fundscope::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
