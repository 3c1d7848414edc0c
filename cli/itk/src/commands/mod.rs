//! CLI commands.

mod images;
mod prefetch;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use itk_prefetch::{PrefetchConfig, SourceLocator};
use tracing::debug;

use crate::error::CliError;

/// itk - prefetch the images of a deployment repository onto every node.
#[derive(Debug, Parser)]
#[command(name = "itk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true, env = "ITK_JSON_LOGS")]
    json_logs: bool,

    #[command(flatten)]
    scan: ScanArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the canonical images the manifests reference.
    Images(images::ImagesArgs),

    /// Write the prefetch manifests to a directory without applying them.
    Render(render::RenderArgs),

    /// Pull every image onto every node of the current cluster.
    Prefetch(prefetch::PrefetchArgs),
}

/// Where images come from and how the prefetch resources are named.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Deployment repository checkout; scans its `apps` and `examples/spire`.
    #[arg(long, global = true, env = "ITK_REPO", value_name = "DIR")]
    repo: Option<PathBuf>,

    /// Extra manifest root (repeatable).
    #[arg(
        long = "root",
        global = true,
        env = "ITK_ROOTS",
        value_delimiter = ',',
        value_name = "DIR"
    )]
    roots: Vec<PathBuf>,

    /// Directory name to skip while scanning (repeatable).
    #[arg(
        long,
        global = true,
        env = "ITK_EXCLUDE",
        value_delimiter = ',',
        value_name = "NAME"
    )]
    exclude: Vec<String>,

    /// Extra image list, `file://<path>` or a bare path (repeatable).
    #[arg(
        long = "source",
        global = true,
        env = "ITK_SOURCES",
        value_delimiter = ',',
        value_name = "LOCATOR"
    )]
    sources: Vec<SourceLocator>,

    /// Namespace for the prefetch resources.
    #[arg(long, global = true, env = "ITK_NAMESPACE")]
    namespace: Option<String>,
}

impl ScanArgs {
    /// Build the prefetch configuration from the flags.
    pub fn config(&self) -> Result<PrefetchConfig> {
        let mut config = match &self.repo {
            Some(repo) => PrefetchConfig::for_deployment_repo(repo),
            None => PrefetchConfig::default(),
        };

        config.manifest_roots.extend(self.roots.iter().cloned());
        config.extra_sources.extend(self.sources.iter().cloned());
        for name in &self.exclude {
            config = config.exclude(name.as_str());
        }
        if let Some(namespace) = &self.namespace {
            config = config.with_namespace(namespace.as_str());
        }

        if config.manifest_roots.is_empty() && config.extra_sources.is_empty() {
            return Err(CliError::NoRoots.into());
        }
        config.validate()?;
        debug!(
            roots = ?config.manifest_roots,
            sources = config.extra_sources.len(),
            namespace = %config.namespace,
            "Configuration loaded"
        );
        Ok(config)
    }
}

impl Cli {
    pub fn json_logs(&self) -> bool {
        self.json_logs
    }

    /// Run the CLI command.
    pub fn run(self) -> Result<()> {
        let config = self.scan.config()?;

        match self.command {
            Commands::Images(args) => images::run(config, args),
            Commands::Render(args) => render::run(config, args),
            Commands::Prefetch(args) => prefetch::run(config, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repo_roots() {
        let cli =
            Cli::try_parse_from(["itk", "--repo", "/work/deployments-k8s", "images"]).unwrap();
        let config = cli.scan.config().unwrap();
        assert_eq!(
            config.manifest_roots,
            vec![
                PathBuf::from("/work/deployments-k8s/apps"),
                PathBuf::from("/work/deployments-k8s/examples/spire"),
            ]
        );
    }

    #[test]
    fn test_roots_sources_and_exclusions() {
        let cli = Cli::try_parse_from([
            "itk",
            "images",
            "--root",
            "/a",
            "--root",
            "/b",
            "--exclude",
            "vendor",
            "--source",
            "file:///debug-images.yaml",
            "--namespace",
            "prefetch-ci",
        ])
        .unwrap();
        let config = cli.scan.config().unwrap();
        assert_eq!(
            config.manifest_roots,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(config.excluded_dirs.contains("vendor"));
        assert!(config.excluded_dirs.contains(".git"));
        assert_eq!(
            config.extra_sources[0].path(),
            PathBuf::from("/debug-images.yaml")
        );
        assert_eq!(config.namespace, "prefetch-ci");
    }

    #[test]
    fn test_remote_source_rejected() {
        let result = Cli::try_parse_from([
            "itk",
            "images",
            "--source",
            "https://example.com/external-images.yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_requires_roots() {
        let cli = Cli::try_parse_from(["itk", "images"]).unwrap();
        let err = cli.scan.config().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::NoRoots)
        ));
    }
}
