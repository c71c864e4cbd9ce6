use anyhow::Result;
use repo2md::{
    cli::{log_level, parse_args},
    run_repo2md,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = parse_args();
    env_logger::Builder::new()
        .filter_level(log_level(config.verbosity))
        .parse_default_env()
        .init();
    run_repo2md(config).await
}
