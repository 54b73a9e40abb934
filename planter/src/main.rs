use clap::Parser;
use cli::{Commands, GlobalArgs, LogLevel};
use commands::{
    bootstrap::bootstrap, join::join, post_join::post_join,
    update_client_secret::update_client_secret, upgrade::upgrade,
};
use env_logger::Target;
use log::LevelFilter;

use crate::cli::Cli;

mod cli;
mod commands;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&cli.global_args);

    match cli.command {
        Commands::Bootstrap => bootstrap(&cli.global_args).await?,
        Commands::Join => join(&cli.global_args).await?,
        Commands::PostJoin => post_join(&cli.global_args).await?,
        Commands::Upgrade => upgrade(&cli.global_args).await?,
        Commands::UpdateClientSecret(args) => update_client_secret(&args).await?,
    }

    Ok(())
}

fn configure_logging(global_args: &GlobalArgs) {
    let log_level = global_args.get_log_level();
    let mut logger = env_logger::builder();

    logger
        .format_timestamp(None)
        .format_module_path(matches!(log_level, LogLevel::Trace))
        .format_target(false)
        .format_level(false)
        .target(Target::Stderr);

    if let LogLevel::Normal = log_level {
        logger.filter(Some("planter"), LevelFilter::Info);
        logger.filter(Some("planter_core"), LevelFilter::Info);
    }

    if let LogLevel::Verbose = log_level {
        logger.filter(Some("planter"), LevelFilter::Debug);
        logger.filter(Some("planter_core"), LevelFilter::Debug);
    }

    if let LogLevel::Trace = log_level {
        logger.filter(None, LevelFilter::Debug);
    }

    logger.init();
}
