//! `itk prefetch`: run the protocol against the current kube context.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use itk_prefetch::{PrefetchConfig, Prefetcher};
use itk_shell::ShellRunner;

use crate::error::CliError;
use crate::output::{print_info, print_success};

#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Readiness timeout in seconds.
    #[arg(long, env = "ITK_WAIT_TIMEOUT", default_value_t = 600, value_name = "SECS")]
    timeout: u64,

    /// kubectl binary.
    #[arg(long, env = "ITK_KUBECTL", default_value = "kubectl")]
    kubectl: String,

    /// Parent directory for the temporary manifest workspace.
    #[arg(long, env = "ITK_WORKSPACE", value_name = "DIR")]
    workspace: Option<PathBuf>,
}

pub fn run(config: PrefetchConfig, args: PrefetchArgs) -> Result<()> {
    let mut config = config
        .with_wait_timeout(Duration::from_secs(args.timeout))
        .with_kubectl(args.kubectl);
    if let Some(dir) = args.workspace {
        config = config.with_workspace_parent(dir);
    }

    let report = Prefetcher::new(config, ShellRunner::new())
        .prefetch()
        .map_err(CliError::Prefetch)?;

    if !report.distributed {
        print_info("No images found; nothing was applied.");
        return Ok(());
    }
    if report.dropped > 0 {
        print_info(&format!("Skipped {} malformed references", report.dropped));
    }
    print_success(&format!(
        "Prefetched {} images on every node in {:.1}s",
        report.images.len(),
        report.elapsed.as_secs_f64()
    ));
    Ok(())
}
