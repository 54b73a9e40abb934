use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Content to stage on disk before any instruction that references it runs.
/// `content` is base64 so plans survive transports that mangle raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub content: String,
    pub path: String,
}

/// A command for the executor to spawn. `env` entries are `KEY=VALUE` lines
/// merged into the process environment. When `image` is set the executor runs
/// the command inside that container image. A present `retry` policy tells the
/// executor to re-invoke the command until it succeeds or the policy is spent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    pub args: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub save_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    File(File),
    Instruction(Instruction),
}

/// An ordered step sequence for one workflow. Ordering is load-bearing: step
/// N assumes steps 0..N-1 have completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: String,
    pub steps: Vec<Step>,
}
