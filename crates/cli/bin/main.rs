use clap::Parser;
use eyre::Result;
use litsafe_cli::{args::Litsafe, cmd, handler};
use litsafe_config::Config;

fn main() -> Result<()> {
    handler::install();
    litsafe_common::init_tracing();
    let args = Litsafe::parse();
    main_args(args)
}

#[tokio::main]
async fn main_args(args: Litsafe) -> Result<()> {
    let config = Config::load()?;
    cmd::run(args.cmd, config).await
}
