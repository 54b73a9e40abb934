use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use planter_core::{DEFAULT_CONFIG_FILE, DEFAULT_DATA_DIR};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// path to the cluster membership config
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
    /// node state directory holding staged scripts and manifests
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,
    /// write the compiled plan to this path instead of stdout
    #[arg(short = 'o', long, global = true)]
    pub output: Option<PathBuf>,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace", global = true)]
    pub trace_logging: bool,
}

impl GlobalArgs {
    pub fn get_log_level(&self) -> LogLevel {
        if self.trace_logging {
            return LogLevel::Trace;
        }

        if self.verbose_logging {
            return LogLevel::Verbose;
        }

        LogLevel::Normal
    }
}

pub enum LogLevel {
    Normal,
    Verbose,
    Trace,
}

#[derive(Debug, Subcommand)]
#[command(arg_required_else_help = true)]
pub enum Commands {
    /// compile the plan that bootstraps the first node
    #[command(alias = "b")]
    Bootstrap,
    /// compile the plan that joins this node to an existing cluster
    #[command(alias = "j")]
    Join,
    /// compile the post-join reconciliation plan
    #[command(alias = "p")]
    PostJoin,
    /// compile the system agent upgrade plan
    #[command(alias = "u")]
    Upgrade,
    /// rotate the cluster client secret token (invoked from compiled plans)
    UpdateClientSecret(UpdateClientSecretArgs),
}

#[derive(Debug, Args)]
pub struct UpdateClientSecretArgs {
    /// override default kubeconfig
    #[arg(long)]
    pub kube_config: Option<String>,
    /// override default kubeconfig context
    #[arg(long)]
    pub kube_context: Option<String>,
}
