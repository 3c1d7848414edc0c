//! `itk images`: list the distribution set.

use anyhow::Result;
use clap::Args;
use itk_imageref::ImageRef;
use itk_prefetch::{PrefetchConfig, Prefetcher};
use itk_shell::ShellRunner;
use serde::Serialize;

use crate::output::print_json;

#[derive(Debug, Args)]
pub struct ImagesArgs {
    /// Print JSON instead of one reference per line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ImagesOutput<'a> {
    images: Vec<&'a ImageRef>,
    scanned: usize,
    dropped: usize,
}

pub fn run(config: PrefetchConfig, args: ImagesArgs) -> Result<()> {
    let inventory = Prefetcher::new(config, ShellRunner::new()).inventory()?;

    if args.json {
        return print_json(&ImagesOutput {
            images: inventory.images.iter().collect(),
            scanned: inventory.scanned,
            dropped: inventory.dropped,
        });
    }

    for image in &inventory.images {
        println!("{image}");
    }
    Ok(())
}
