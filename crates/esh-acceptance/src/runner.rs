//! Scenario runner.
//!
//! The runner owns the session for the whole scenario. However the body
//! ends (success, failed expectation, assertion, cancellation) the process
//! group is force-killed and reaped before the outcome is returned, and the
//! reporter hears about successes only.

use std::future::Future;

use esh_expect::Session;

use crate::definitions::Definitions;
use crate::error::{Result, ScenarioError};
use crate::report::Reporter;
use crate::scenarios::Scenario;

/// Runs scenarios against the shell named in the definitions.
#[derive(Debug)]
pub struct Runner<R> {
    definitions: Definitions,
    reporter: R,
}

impl<R: Reporter> Runner<R> {
    /// Create a runner.
    pub const fn new(definitions: Definitions, reporter: R) -> Self {
        Self {
            definitions,
            reporter,
        }
    }

    /// The definitions in use.
    pub const fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// The reporter.
    pub const fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Run one scenario; Ctrl-C cancels it.
    pub async fn run(&mut self, scenario: &Scenario) -> Result<()> {
        self.run_until(scenario, interrupted()).await
    }

    /// Run one scenario, cancelling it if `cancel` resolves first.
    pub async fn run_until(&mut self, scenario: &Scenario, cancel: impl Future<Output = ()>) -> Result<()> {
        let config = self.definitions.session_config(scenario.uses_plugins());
        tracing::debug!(scenario = scenario.name(), shell = %config.command, args = ?config.args, "starting scenario");

        let mut session = Session::spawn(config).await?;

        let outcome = tokio::select! {
            outcome = scenario.run(&mut session, &self.definitions) => outcome,
            () = cancel => Err(ScenarioError::Interrupted),
        };

        // Errors here must not mask the scenario's own outcome.
        if let Err(e) = session.close(true).await {
            tracing::warn!(scenario = scenario.name(), error = %e, "cleanup failed");
        }

        match outcome {
            Ok(()) => {
                self.reporter.success(scenario.name());
                Ok(())
            }
            Err(e) => {
                tracing::debug!(scenario = scenario.name(), kind = e.kind(), "scenario failed");
                Err(e)
            }
        }
    }

    /// Run `scenarios` in order, stopping at the first failure.
    ///
    /// Returns the name of the failed scenario with its error.
    pub async fn run_all<'s>(
        &mut self,
        scenarios: impl IntoIterator<Item = &'s Scenario>,
    ) -> std::result::Result<(), (&'static str, ScenarioError)> {
        for scenario in scenarios {
            self.run(scenario).await.map_err(|e| (scenario.name(), e))?;
        }
        Ok(())
    }

    /// Consume the runner, returning the reporter.
    pub fn into_reporter(self) -> R {
        self.reporter
    }
}

/// Resolves on Ctrl-C; never, if the signal cannot be watched.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot watch for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
