use log::info;
use planter_core::{compile, identity::FsStorage};

use crate::{
    cli::GlobalArgs,
    commands::{emit_plan, load_config},
};

pub async fn bootstrap(global_args: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_config(global_args)?;

    info!("Compiling the bootstrap plan...");

    let mut store = FsStorage::default();
    let plan = compile::bootstrap_plan(&mut store, &config, &global_args.data_dir)?;

    emit_plan(global_args, &plan)
}
