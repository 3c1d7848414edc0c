//! Error types for suite composition.

use std::fmt;
use std::sync::Arc;

use itk_prefetch::PrefetchError;
use itk_shell::RunError;
use thiserror::Error;

/// Errors from setting up or tearing down a suite.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// The shared prefetch run failed.
    #[error("image prefetch failed: {0}")]
    Prefetch(#[source] Arc<PrefetchError>),

    /// A setup or cleanup command failed.
    #[error(transparent)]
    Command(#[from] RunError),

    /// A component failed to set up; later components were not started.
    #[error("suite '{suite}': set-up of '{component}' failed: {source}")]
    SetUp {
        suite: String,
        component: String,
        #[source]
        source: Box<SuiteError>,
    },

    /// One or more components failed to tear down.
    #[error("suite '{suite}': tear-down failed for {}", component_list(.failures))]
    TearDown {
        suite: String,
        failures: Vec<TearDownFailure>,
    },
}

impl From<Arc<PrefetchError>> for SuiteError {
    fn from(err: Arc<PrefetchError>) -> Self {
        SuiteError::Prefetch(err)
    }
}

/// A component that failed to tear down.
#[derive(Debug)]
pub struct TearDownFailure {
    pub component: String,
    pub error: SuiteError,
}

impl fmt::Display for TearDownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.error)
    }
}

fn component_list(failures: &[TearDownFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.component.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
