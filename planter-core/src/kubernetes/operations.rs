use anyhow::Context;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config,
};
use log::info;

pub async fn create_local_client(
    config_path: &Option<String>,
    context_name: &Option<String>,
) -> anyhow::Result<Client> {
    let config_options = KubeConfigOptions {
        context: context_name.to_owned(),
        ..Default::default()
    };

    let config = match config_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &config_options).await?
        }
        None => Config::from_kubeconfig(&config_options).await?,
    };

    let client = Client::try_from(config)?;

    Ok(client)
}

/// Replaces the `token` datum of the cluster client secret with a new value.
/// The secret must already exist; the compiled plan guards this with a wait
/// step.
pub async fn rotate_client_secret_token(
    client: &Client,
    namespace: &str,
    name: &str,
    token: &str,
) -> anyhow::Result<()> {
    let secret_api: Api<Secret> = Api::namespaced(client.clone(), namespace);

    info!("Rotating the token of secret '{namespace}/{name}'...");

    let patch = serde_json::json!({
        "stringData": {
            "token": token,
        }
    });
    secret_api
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .context(format!("Couldn't patch the '{name}' secret!"))?;

    Ok(())
}
