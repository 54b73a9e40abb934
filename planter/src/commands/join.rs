use log::info;
use planter_core::{compile, identity::FsStorage, trust::HttpTrustFetcher};

use crate::{
    cli::GlobalArgs,
    commands::{emit_plan, load_config},
};

pub async fn join(global_args: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_config(global_args)?;

    info!("Compiling the join plan against {}...", config.server);

    let mut store = FsStorage::default();
    let trust = HttpTrustFetcher;
    let plan = compile::join_plan(&mut store, &trust, &config, &global_args.data_dir).await?;

    emit_plan(global_args, &plan)
}
