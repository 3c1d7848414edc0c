//! # itk-prefetch
//!
//! Pulls every container image referenced by a deployment manifest tree onto
//! every node of the target cluster, once per test process.
//!
//! ## Pipeline
//!
//! ```text
//! Scanner ──► raw references ──► ImageRef::canonicalize ──► DistributionSet
//!                                                               │
//! extra sources ────────────────────────────────────────────────┘
//!                                                               ▼
//!                     cluster ◄── Prefetcher (apply/wait/delete) ◄── render
//! ```
//!
//! - `scanner`: walks manifest roots and extracts `image:` values
//! - `sources`: loads caller-supplied image lists from local files
//! - `distribution`: deduplicated set of canonical references
//! - `render`: namespace, config map, daemon set and kustomization manifests
//! - `guard`: run-once state shared by every suite in a process
//! - `orchestrator`: the apply/wait/cleanup protocol

pub mod config;
pub mod distribution;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod render;
pub mod scanner;
pub mod sources;

pub use config::PrefetchConfig;
pub use distribution::DistributionSet;
pub use error::{PrefetchError, ProtocolStep};
pub use guard::{ExecutionGuard, GuardState, PrefetchOutcome};
pub use orchestrator::{Inventory, PrefetchReport, Prefetcher};
pub use render::{render, Manifest, ManifestSet, RenderError, RenderOptions};
pub use scanner::{extract_reference, manifest_files, scan_references, ScanError, Scanner};
pub use sources::{parse_source, SourceError, SourceLocator};
