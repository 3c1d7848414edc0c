//! # itk-suite
//!
//! Composition of integration suites from ordered lifecycle components.
//!
//! A suite is an explicit list of [`Lifecycle`] components. Set-up runs in
//! order and stops at the first failure; tear-down runs in reverse for every
//! component whose set-up was started, and keeps going past failures.
//!
//! ```no_run
//! use itk_prefetch::{PrefetchConfig, Prefetcher};
//! use itk_shell::ShellRunner;
//! use itk_suite::{PrefetchStep, ScriptStep, Suite};
//!
//! let config = PrefetchConfig::for_deployment_repo("../deployments-k8s");
//! let mut suite = Suite::new("spire/single_cluster")
//!     .with(PrefetchStep::new(Prefetcher::new(config, ShellRunner::new())))
//!     .with(
//!         ScriptStep::new("spire", "../deployments-k8s/examples/spire/single_cluster", ShellRunner::new())
//!             .run("kubectl apply -k .")
//!             .run("kubectl wait -n spire --timeout=3m --for=condition=ready pod -l app=spire-server")
//!             .cleanup("kubectl delete ns spire"),
//!     );
//!
//! suite.run(|| { /* test body */ }).unwrap();
//! ```

mod error;
mod lifecycle;
mod steps;

pub use error::{SuiteError, TearDownFailure};
pub use lifecycle::{Lifecycle, Suite};
pub use steps::{PrefetchStep, ScriptStep};
