use std::fs;

use anyhow::Context;
use log::info;
use planter_core::{config::Config, steps::Plan};

use crate::cli::GlobalArgs;

pub mod bootstrap;
pub mod join;
pub mod post_join;
pub mod update_client_secret;
pub mod upgrade;

pub(crate) fn load_config(global_args: &GlobalArgs) -> anyhow::Result<Config> {
    Config::load(&global_args.config).context("Couldn't load the cluster membership config!")
}

pub(crate) fn emit_plan(global_args: &GlobalArgs, plan: &Plan) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(plan).context("Couldn't serialize the plan!")?;

    match &global_args.output {
        Some(path) => {
            fs::write(path, json)
                .context(format!("Couldn't write the plan to {}!", path.display()))?;
            info!(
                "Wrote '{}' ({} steps) to {}",
                plan.name,
                plan.steps.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}
