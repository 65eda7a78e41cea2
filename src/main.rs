// src/main.rs

use autoapply::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    let debug = args.debug;

    if let Err(err) = run_main(args).await {
        if debug {
            eprintln!("autoapply error: {err:?}");
        } else {
            eprintln!("autoapply error: {err:#}");
        }
        std::process::exit(1);
    }
}

async fn run_main(args: cli::CliArgs) -> anyhow::Result<()> {
    logging::init_logging(args.log_level, args.debug)?;
    run(args).await
}
