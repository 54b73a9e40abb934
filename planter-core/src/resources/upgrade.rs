use kube::{core::ObjectMeta, CustomResource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const SYSTEM_NAMESPACE: &str = "cattle-system";
pub const SYSTEM_AGENT_UPGRADER: &str = "system-agent-upgrader";

const SYSTEM_AGENT_IMAGE: &str = "rancher/system-agent";
const SYSTEM_AGENT_VERSION: &str = "v0.3.9-suc";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(group = "upgrade.cattle.io", version = "v1", kind = "Plan", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct PlanSpec {
    pub concurrency: i64,
    pub node_selector: NodeSelector,
    pub service_account_name: String,
    pub tolerations: Vec<Toleration>,
    pub upgrade: ContainerSpec,
    pub version: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelector {
    pub match_expressions: Vec<MatchExpression>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct MatchExpression {
    pub key: String,
    pub operator: String,
    pub values: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct Toleration {
    pub operator: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct ContainerSpec {
    pub envs: Vec<EnvVar>,
    pub image: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}

/// The upgrade-controller plan keeping the system agent current on every
/// linux node. A static template, no configuration flows into it.
pub fn system_agent_upgrader_plan() -> Plan {
    Plan {
        metadata: ObjectMeta {
            name: Some(SYSTEM_AGENT_UPGRADER.to_owned()),
            namespace: Some(SYSTEM_NAMESPACE.to_owned()),
            ..Default::default()
        },
        spec: PlanSpec {
            concurrency: 10,
            node_selector: NodeSelector {
                match_expressions: vec![MatchExpression {
                    key: "kubernetes.io/os".to_owned(),
                    operator: "In".to_owned(),
                    values: vec!["linux".to_owned()],
                }],
            },
            service_account_name: "system-upgrade-controller".to_owned(),
            tolerations: vec![Toleration {
                operator: "Exists".to_owned(),
            }],
            upgrade: ContainerSpec {
                envs: vec![
                    env_var("CATTLE_AGENT_LOGLEVEL", "debug"),
                    env_var("CATTLE_REMOTE_ENABLED", "false"),
                    env_var("CATTLE_LOCAL_ENABLED", "true"),
                ],
                image: SYSTEM_AGENT_IMAGE.to_owned(),
            },
            version: SYSTEM_AGENT_VERSION.to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrader_plan_is_constant() {
        let first = serde_yaml::to_string(&system_agent_upgrader_plan()).unwrap();
        let second = serde_yaml::to_string(&system_agent_upgrader_plan()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn upgrader_plan_disables_remote_mode() {
        let plan = system_agent_upgrader_plan();

        assert_eq!(plan.metadata.namespace.as_deref(), Some(SYSTEM_NAMESPACE));
        assert_eq!(plan.spec.concurrency, 10);
        assert!(plan
            .spec
            .upgrade
            .envs
            .iter()
            .any(|env| env.name == "CATTLE_REMOTE_ENABLED" && env.value == "false"));
    }
}
