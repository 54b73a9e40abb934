use anyhow::Context;
use log::info;
use planter_core::{
    compile::CLUSTER_CLIENT_SECRET,
    identity::generate_token,
    kubernetes::operations::{create_local_client, rotate_client_secret_token},
    resources::bootstrap::FLEET_LOCAL_NAMESPACE,
};

use crate::cli::UpdateClientSecretArgs;

/// Runs on the node as a compiled plan step, after the wait step confirmed
/// the secret exists.
pub async fn update_client_secret(args: &UpdateClientSecretArgs) -> anyhow::Result<()> {
    let client = create_local_client(&args.kube_config, &args.kube_context)
        .await
        .context("Couldn't initialize k8s API client!")?;

    let token = generate_token();
    rotate_client_secret_token(&client, FLEET_LOCAL_NAMESPACE, CLUSTER_CLIENT_SECRET, &token)
        .await?;

    info!("Successfully rotated the cluster client secret!");

    Ok(())
}
