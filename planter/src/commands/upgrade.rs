use log::info;
use planter_core::compile;

use crate::{
    cli::GlobalArgs,
    commands::{emit_plan, load_config},
};

pub async fn upgrade(global_args: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_config(global_args)?;

    info!("Compiling the upgrade plan...");

    let plan = compile::upgrade_plan(&config, &global_args.data_dir)?;

    emit_plan(global_args, &plan)
}
