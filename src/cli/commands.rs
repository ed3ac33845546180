// CLI command definitions

use super::sync::SyncCommand;
use crate::shared::ShutdownRx;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "kube-fzf-cache",
    version,
    about = "Keep local snapshots of Kubernetes resources in sync",
    long_about = "Watches and polls Kubernetes resources and keeps one plain-text snapshot per resource type, ready for fuzzy completion"
)]
pub struct CliArgs {
    #[command(flatten)]
    pub sync: SyncCommand,

    /// Log debug messages
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl CliArgs {
    pub async fn execute(&self, shutdown: ShutdownRx) -> anyhow::Result<()> {
        self.sync.execute(shutdown).await
    }
}
