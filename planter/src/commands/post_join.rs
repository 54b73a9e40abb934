use log::info;
use planter_core::compile;

use crate::{
    cli::GlobalArgs,
    commands::{emit_plan, load_config},
};

pub async fn post_join(global_args: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_config(global_args)?;

    info!("Compiling the post-join reconciliation plan...");

    let plan = compile::post_join_plan(&config, &global_args.data_dir)?;

    emit_plan(global_args, &plan)
}
