//! `itk render`: write the prefetch manifests for inspection.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use itk_prefetch::{PrefetchConfig, Prefetcher};
use itk_shell::ShellRunner;

use crate::output::{print_info, print_success};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Directory to write the manifests into; created if missing.
    #[arg(long, value_name = "DIR", default_value = "prefetch")]
    out: PathBuf,
}

pub fn run(config: PrefetchConfig, args: RenderArgs) -> Result<()> {
    let prefetcher = Prefetcher::new(config, ShellRunner::new());
    let inventory = prefetcher.inventory()?;
    if inventory.images.is_empty() {
        print_info("No images found; the manifests will pull nothing.");
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let written = prefetcher
        .manifests(&inventory.images)?
        .write_to(&args.out)
        .with_context(|| format!("failed to write manifests to {}", args.out.display()))?;

    for path in &written {
        print_info(&path.display().to_string());
    }
    print_success(&format!(
        "Rendered {} manifests for {} images; apply with `kubectl apply -k {}`",
        written.len(),
        inventory.images.len(),
        args.out.display()
    ));
    Ok(())
}
