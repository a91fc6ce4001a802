// src/main.rs

use onchange::config::LoopConfig;
use onchange::{cli, logging, run_blocking};

fn main() {
    if let Err(err) = run_main() {
        eprintln!("onchange error: {err:?}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let loop_config = LoopConfig::from_env()?;
    logging::init_logging(args.log_level, &loop_config)?;
    run_blocking(args, loop_config)
}
