use std::{
    fs, io,
    time::{Duration, SystemTime},
};

use data_encoding::BASE64;
use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::Config,
    identity::{get_or_create_node_identity, resolve_join_token, Storage, StorageError},
    images::installer_image,
    kubectl,
    resources::{
        bootstrap::{bootstrap_documents, FLEET_LOCAL_NAMESPACE, LOCAL_CLUSTER_NAME},
        manifest_file,
        upgrade::{system_agent_upgrader_plan, SYSTEM_AGENT_UPGRADER, SYSTEM_NAMESPACE},
        Document, ResourceError,
    },
    retry::RetryPolicy,
    roles::{InvalidRoleError, RoleSet},
    self_exe::self_exe,
    steps::{File, Instruction, Plan, Step},
    trust::{TrustFetchError, TrustFetcher},
    versions::{KubernetesVersion, UnsupportedVersionError},
};

pub const CLUSTER_CLIENT_SECRET: &str = "local-kubeconfig";

const FLEET_NAMESPACE: &str = "cattle-fleet-system";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("classifying node role: {}", .0)]
    InvalidRole(#[from] InvalidRoleError),
    #[error("resolving kubernetes version: {}", .0)]
    UnsupportedVersion(#[from] UnsupportedVersionError),
    #[error("fetching trust material: {}", .0)]
    TrustFetch(#[from] TrustFetchError),
    #[error("persisting node state: {}", .0)]
    Storage(#[from] StorageError),
    #[error("building manifest: {}", .0)]
    Resource(#[from] ResourceError),
    #[error("looking up hostname: {}", .0)]
    Hostname(io::Error),
    #[error("resolving location of the running executable: {}", .0)]
    SelfExe(io::Error),
    #[error("invalid server url ({0})")]
    InvalidServer(String),
}

pub fn install_script_path(data_dir: &str) -> String {
    format!("{data_dir}/install.sh")
}

pub fn bootstrap_manifests_path(data_dir: &str) -> String {
    format!("{data_dir}/bootstrapmanifests/rancherd.yaml")
}

pub fn upgrader_manifests_path(data_dir: &str) -> String {
    format!("{data_dir}/bootstrapmanifests/system-agent-upgrader.yaml")
}

fn env_entry(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

/// Stages the install script fetched from the server under the data
/// directory. Must be applied before the join instruction that invokes it.
pub async fn install_script_file(
    trust: &impl TrustFetcher,
    config: &Config,
    data_dir: &str,
) -> Result<File, CompileError> {
    let script = trust.install_script(&config.server, &config.token).await?;

    Ok(File {
        content: BASE64.encode(&script),
        path: install_script_path(data_dir),
    })
}

/// The join instruction. Role classification fails before any network
/// access; an unreachable trust endpoint is a hard compilation failure since
/// the install script cannot pin trust without the checksum.
pub async fn join_instruction(
    trust: &impl TrustFetcher,
    config: &Config,
    data_dir: &str,
) -> Result<Instruction, CompileError> {
    let roles: RoleSet = config.role.parse()?;

    let ca_checksum = trust
        .ca_checksum(&config.server, &config.token, true)
        .await?;

    let env = vec![
        env_entry("CATTLE_SERVER", &config.server),
        env_entry("CATTLE_TOKEN", &config.token),
        env_entry("CATTLE_CA_CHECKSUM", &ca_checksum),
        env_entry("CATTLE_ADDRESS", &config.address),
        env_entry("CATTLE_INTERNAL_ADDRESS", &config.internal_address),
        env_entry("CATTLE_LABELS", &config.labels.join(",")),
        env_entry("CATTLE_TAINTS", &config.taints.join(",")),
        env_entry("CATTLE_ROLE_ETCD", &roles.etcd.to_string()),
        env_entry("CATTLE_ROLE_CONTROLPLANE", &roles.control_plane.to_string()),
        env_entry("CATTLE_ROLE_WORKER", &roles.worker.to_string()),
    ];

    Ok(Instruction {
        name: "join".to_owned(),
        image: None,
        env,
        args: vec!["sh".to_owned(), install_script_path(data_dir)],
        command: "/usr/bin/env".to_owned(),
        save_output: true,
        retry: None,
    })
}

/// Renders the bootstrap manifest for the first node. The token seeds the
/// cluster state secret; when the config carries none a fresh one is
/// generated here and lives only inside the manifest.
pub fn bootstrap_manifest_file(config: &Config, path: &str) -> Result<Option<File>, CompileError> {
    let node_name = if config.node_name.is_empty() {
        local_hostname().map_err(CompileError::Hostname)?
    } else {
        config.node_name.clone()
    };

    let k8s_version = KubernetesVersion::resolve(&config.kubernetes_version)?;
    let token = resolve_join_token(config);

    let documents = bootstrap_documents(&node_name, &k8s_version, &token, &config.resources);

    Ok(manifest_file(&documents, path)?)
}

fn local_hostname() -> io::Result<String> {
    let hostname = fs::read_to_string("/proc/sys/kernel/hostname")?;

    Ok(hostname
        .trim()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_owned())
}

/// The static upgrader manifest, staged next to the bootstrap one.
pub fn upgrader_manifest_file(path: &str) -> Result<Option<File>, CompileError> {
    let documents = [Document::UpgradePlan(system_agent_upgrader_plan())];

    Ok(manifest_file(&documents, path)?)
}

pub fn bootstrap_instruction(config: &Config, data_dir: &str) -> Result<Instruction, CompileError> {
    apply_instruction(config, "bootstrap", &bootstrap_manifests_path(data_dir))
}

pub fn upgrader_instruction(config: &Config, data_dir: &str) -> Result<Instruction, CompileError> {
    apply_instruction(
        config,
        SYSTEM_AGENT_UPGRADER,
        &upgrader_manifests_path(data_dir),
    )
}

/// Manifest application runs inside the version-pinned installer image.
/// `--validate=false` tolerates custom resource definitions that are not
/// registered yet on the first pass; re-application is declarative and safe.
fn apply_instruction(
    config: &Config,
    name: &str,
    manifest_path: &str,
) -> Result<Instruction, CompileError> {
    let version = KubernetesVersion::resolve(&config.kubernetes_version)?;

    Ok(Instruction {
        name: name.to_owned(),
        image: Some(installer_image(
            &config.runtime_installer_image,
            &config.system_default_registry,
            &version,
        )),
        env: kubectl::env(&version),
        args: vec![
            "apply".to_owned(),
            "--validate=false".to_owned(),
            "-f".to_owned(),
            manifest_path.to_owned(),
        ],
        command: kubectl::command(&version),
        save_output: true,
        retry: Some(RetryPolicy::default()),
    })
}

fn kubectl_instruction(name: &str, version: &KubernetesVersion, args: &[&str]) -> Instruction {
    Instruction {
        name: name.to_owned(),
        image: None,
        env: kubectl::env(version),
        args: args.iter().map(|arg| (*arg).to_owned()).collect(),
        command: kubectl::command(version),
        save_output: true,
        retry: Some(RetryPolicy::default()),
    }
}

pub fn wait_rancher_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "wait-rancher",
        version,
        &[
            "-n",
            SYSTEM_NAMESPACE,
            "rollout",
            "status",
            "-w",
            "deploy/rancher",
        ],
    )
}

pub fn wait_rancher_webhook_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "wait-rancher-webhook",
        version,
        &[
            "-n",
            SYSTEM_NAMESPACE,
            "rollout",
            "status",
            "-w",
            "deploy/rancher-webhook",
        ],
    )
}

pub fn wait_system_upgrade_controller_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "wait-system-upgrade-controller",
        version,
        &[
            "-n",
            SYSTEM_NAMESPACE,
            "rollout",
            "status",
            "-w",
            "deploy/system-upgrade-controller",
        ],
    )
}

pub fn wait_suc_plan_resolved_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "wait-suc-plan-resolved",
        version,
        &[
            "-n",
            SYSTEM_NAMESPACE,
            "wait",
            "--for=condition=LatestResolved=true",
            "plans.upgrade.cattle.io",
            SYSTEM_AGENT_UPGRADER,
        ],
    )
}

pub fn wait_cluster_client_secret_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "wait-cluster-client-secret-resolved",
        version,
        &[
            "-n",
            FLEET_LOCAL_NAMESPACE,
            "get",
            "secret",
            CLUSTER_CLIENT_SECRET,
        ],
    )
}

/// Re-invokes this binary's rotation subcommand. The only step left that
/// needs the self-location collaborator.
pub fn update_client_secret_instruction(
    version: &KubernetesVersion,
) -> Result<Instruction, CompileError> {
    let command = self_exe().map_err(CompileError::SelfExe)?;

    Ok(Instruction {
        name: "update-client-secret".to_owned(),
        image: None,
        env: kubectl::env(version),
        args: vec!["update-client-secret".to_owned()],
        command,
        save_output: true,
        retry: None,
    })
}

pub fn scale_down_fleet_controller_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "scale-down-fleet-controller",
        version,
        &[
            "-n",
            FLEET_NAMESPACE,
            "scale",
            "--replicas",
            "0",
            "deploy/fleet-controller",
        ],
    )
}

pub fn scale_up_fleet_controller_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "scale-up-fleet-controller",
        version,
        &[
            "-n",
            FLEET_NAMESPACE,
            "scale",
            "--replicas",
            "1",
            "deploy/fleet-controller",
        ],
    )
}

pub fn delete_rancher_webhook_validation_configuration_instruction(
    version: &KubernetesVersion,
) -> Instruction {
    kubectl_instruction(
        "delete-rancher-webhook-validation-configuration",
        version,
        &[
            "delete",
            "validatingwebhookconfiguration",
            "rancher.cattle.io",
        ],
    )
}

pub fn restart_rancher_webhook_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "restart-rancher-webhook",
        version,
        &[
            "-n",
            SYSTEM_NAMESPACE,
            "rollout",
            "restart",
            "deploy/rancher-webhook",
        ],
    )
}

/// The fleet workspace name lives in a status subresource, out of reach of
/// a plain apply.
pub fn patch_provisioning_cluster_status_instruction(version: &KubernetesVersion) -> Instruction {
    kubectl_instruction(
        "patch-provisioning-cluster-status",
        version,
        &[
            "-n",
            FLEET_LOCAL_NAMESPACE,
            "patch",
            "cluster.provisioning",
            LOCAL_CLUSTER_NAME,
            "--subresource=status",
            "--type=merge",
            "--patch",
            "{\"status\":{\"fleetWorkspaceName\": \"fleet-local\"}}",
        ],
    )
}

#[derive(Serialize)]
struct Rke2JoinConfig {
    server: String,
    token: String,
}

/// RKE2 drop-in config pointing the local runtime at the cluster's
/// supervisor port instead of the public one.
pub fn rke2_config_file(config: &Config) -> Result<File, CompileError> {
    let url = reqwest::Url::parse(&config.server)
        .map_err(|_| CompileError::InvalidServer(config.server.clone()))?;
    let host = url
        .host_str()
        .ok_or_else(|| CompileError::InvalidServer(config.server.clone()))?;

    let join_config = Rke2JoinConfig {
        server: format!("{}://{}:9345", url.scheme(), host),
        token: config.token.clone(),
    };
    let data = serde_yaml::to_string(&join_config).map_err(ResourceError::Serialization)?;

    Ok(File {
        content: BASE64.encode(data.as_bytes()),
        path: "/etc/rancher/rke2/config.yaml.d/50-rke2.yaml".to_owned(),
    })
}

fn restart_stamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

/// Installs the RKE2 agent runtime through the version-pinned installer
/// image. The restart stamp changes per compilation so a re-applied plan
/// restarts the agent.
pub fn install_rke2_agent_instruction(config: &Config) -> Result<Instruction, CompileError> {
    let version = KubernetesVersion::resolve(&config.kubernetes_version)?;

    Ok(Instruction {
        name: "install-rke2-agent".to_owned(),
        image: Some(installer_image(
            "",
            &config.system_default_registry,
            &version,
        )),
        env: vec![
            env_entry("RESTART_STAMP", &restart_stamp().to_string()),
            env_entry("INSTALL_RKE2_EXEC", &config.role),
        ],
        args: vec!["-c".to_owned(), "run.sh".to_owned()],
        command: "sh".to_owned(),
        save_output: false,
        retry: None,
    })
}

/// First-node plan: stage the bootstrap manifest, then apply it. Also
/// ensures the node identity exists on durable storage so a crash between
/// compilation and execution cannot fork identities.
pub fn bootstrap_plan(
    store: &mut impl Storage,
    config: &Config,
    data_dir: &str,
) -> Result<Plan, CompileError> {
    let _: RoleSet = config.role.parse()?;
    get_or_create_node_identity(store)?;

    let mut steps = Vec::new();
    if let Some(manifest) = bootstrap_manifest_file(config, &bootstrap_manifests_path(data_dir))? {
        steps.push(Step::File(manifest));
    } else {
        debug!("No bootstrap resources, skipping the manifest step");
    }
    steps.push(Step::Instruction(bootstrap_instruction(config, data_dir)?));

    info!("Compiled bootstrap-plan ({} steps)", steps.len());

    Ok(Plan {
        name: "bootstrap-plan".to_owned(),
        steps,
    })
}

/// Join plan for a subsequent node: stage the install script, then run it
/// with the role and trust environment.
pub async fn join_plan(
    store: &mut impl Storage,
    trust: &impl TrustFetcher,
    config: &Config,
    data_dir: &str,
) -> Result<Plan, CompileError> {
    let _: RoleSet = config.role.parse()?;
    get_or_create_node_identity(store)?;

    let script = install_script_file(trust, config, data_dir).await?;
    let join = join_instruction(trust, config, data_dir).await?;

    info!("Compiled join-plan");

    Ok(Plan {
        name: "join-plan".to_owned(),
        steps: vec![Step::File(script), Step::Instruction(join)],
    })
}

/// Post-join reconciliation: wait for the controllers, install the system
/// agent upgrader, rotate the cluster client secret, and settle the webhook
/// configuration. Each wait carries a retry policy because its target
/// resource only eventually exists.
pub fn post_join_plan(config: &Config, data_dir: &str) -> Result<Plan, CompileError> {
    let version = KubernetesVersion::resolve(&config.kubernetes_version)?;

    let mut steps = vec![
        Step::Instruction(wait_rancher_instruction(&version)),
        Step::Instruction(wait_rancher_webhook_instruction(&version)),
        Step::Instruction(wait_system_upgrade_controller_instruction(&version)),
    ];
    if let Some(manifest) = upgrader_manifest_file(&upgrader_manifests_path(data_dir))? {
        steps.push(Step::File(manifest));
    }
    steps.push(Step::Instruction(upgrader_instruction(config, data_dir)?));
    steps.push(Step::Instruction(wait_suc_plan_resolved_instruction(
        &version,
    )));
    steps.push(Step::Instruction(scale_down_fleet_controller_instruction(
        &version,
    )));
    steps.push(Step::Instruction(wait_cluster_client_secret_instruction(
        &version,
    )));
    steps.push(Step::Instruction(update_client_secret_instruction(
        &version,
    )?));
    steps.push(Step::Instruction(scale_up_fleet_controller_instruction(
        &version,
    )));
    steps.push(Step::Instruction(
        delete_rancher_webhook_validation_configuration_instruction(&version),
    ));
    steps.push(Step::Instruction(restart_rancher_webhook_instruction(
        &version,
    )));
    steps.push(Step::Instruction(
        patch_provisioning_cluster_status_instruction(&version),
    ));

    info!("Compiled post-join-plan ({} steps)", steps.len());

    Ok(Plan {
        name: "post-join-plan".to_owned(),
        steps,
    })
}

/// Re-applies the upgrader manifest and waits for the upgrade controller to
/// resolve it.
pub fn upgrade_plan(config: &Config, data_dir: &str) -> Result<Plan, CompileError> {
    let version = KubernetesVersion::resolve(&config.kubernetes_version)?;

    let mut steps = Vec::new();
    if let Some(manifest) = upgrader_manifest_file(&upgrader_manifests_path(data_dir))? {
        steps.push(Step::File(manifest));
    }
    steps.push(Step::Instruction(upgrader_instruction(config, data_dir)?));
    steps.push(Step::Instruction(wait_suc_plan_resolved_instruction(
        &version,
    )));

    info!("Compiled upgrade-plan ({} steps)", steps.len());

    Ok(Plan {
        name: "upgrade-plan".to_owned(),
        steps,
    })
}
