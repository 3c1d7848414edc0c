//! The lifecycle trait and the ordered suite.

use tracing::{debug, info, warn};

use crate::error::{SuiteError, TearDownFailure};

/// A suite component with set-up and tear-down hooks.
pub trait Lifecycle {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Prepare the component.
    fn set_up(&mut self) -> Result<(), SuiteError>;

    /// Undo [`Lifecycle::set_up`].
    ///
    /// Also called when `set_up` itself failed part-way, so it must cope
    /// with partially created state.
    fn tear_down(&mut self) -> Result<(), SuiteError> {
        Ok(())
    }
}

/// An ordered list of lifecycle components.
pub struct Suite {
    name: String,
    components: Vec<Box<dyn Lifecycle>>,
    /// Number of leading components whose set-up was started.
    started: usize,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            started: 0,
        }
    }

    /// Append a component.
    pub fn with(mut self, component: impl Lifecycle + 'static) -> Self {
        self.push(component);
        self
    }

    /// Append a component.
    pub fn push(&mut self, component: impl Lifecycle + 'static) {
        self.components.push(Box::new(component));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component names in set-up order.
    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Set up every component not yet started, in order.
    ///
    /// Stops at the first failure. The failing component still counts as
    /// started and is torn down by [`Suite::tear_down`].
    pub fn set_up(&mut self) -> Result<(), SuiteError> {
        info!(suite = %self.name, components = self.components.len(), "Setting up suite");

        while self.started < self.components.len() {
            let component = &mut self.components[self.started];
            self.started += 1;

            debug!(suite = %self.name, component = %component.name(), "Setting up component");
            if let Err(err) = component.set_up() {
                warn!(
                    suite = %self.name,
                    component = %component.name(),
                    error = %err,
                    "Component set-up failed"
                );
                return Err(SuiteError::SetUp {
                    suite: self.name.clone(),
                    component: component.name().to_string(),
                    source: Box::new(err),
                });
            }
        }
        Ok(())
    }

    /// Tear down every started component in reverse order.
    ///
    /// Every component is attempted; failures are collected into one error.
    pub fn tear_down(&mut self) -> Result<(), SuiteError> {
        let mut failures = Vec::new();

        for component in self.components[..self.started].iter_mut().rev() {
            debug!(suite = %self.name, component = %component.name(), "Tearing down component");
            if let Err(error) = component.tear_down() {
                warn!(
                    suite = %self.name,
                    component = %component.name(),
                    error = %error,
                    "Component tear-down failed"
                );
                failures.push(TearDownFailure {
                    component: component.name().to_string(),
                    error,
                });
            }
        }
        self.started = 0;

        if failures.is_empty() {
            info!(suite = %self.name, "Suite torn down");
            Ok(())
        } else {
            Err(SuiteError::TearDown {
                suite: self.name.clone(),
                failures,
            })
        }
    }

    /// Set up, run `test`, then tear down.
    ///
    /// Tear-down runs even when set-up fails; the set-up error takes
    /// precedence over tear-down errors.
    pub fn run<T>(&mut self, test: impl FnOnce() -> T) -> Result<T, SuiteError> {
        if let Err(err) = self.set_up() {
            if let Err(teardown) = self.tear_down() {
                warn!(
                    suite = %self.name,
                    error = %teardown,
                    "Tear-down after failed set-up also failed"
                );
            }
            return Err(err);
        }

        let output = test();
        self.tear_down()?;
        Ok(output)
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("components", &self.component_names())
            .field("started", &self.started)
            .finish()
    }
}
