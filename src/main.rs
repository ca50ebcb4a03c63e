use std::io;

use clap::Parser;

use plate_calibrate::app;
use plate_calibrate::cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    app::run(&cli, &mut input, &mut out)?;
    Ok(())
}
