//! The acceptance scenarios.
//!
//! Each scenario drives one freshly spawned shell through a fixed sequence
//! of sends and expects. The runner owns spawning and cleanup; a scenario
//! only talks to the session it is handed.

mod ctof;
mod dice;
mod fortune;
mod io_append;
mod pokedex;

use std::fmt;

use esh_expect::{Match, Pattern, PatternSet, Session};
use futures::future::BoxFuture;

use crate::definitions::Definitions;
use crate::error::{Result, ScenarioError};

/// Body of a scenario.
pub type ScenarioFn = for<'a> fn(&'a mut Session, &'a Definitions) -> BoxFuture<'a, Result<()>>;

/// A named acceptance scenario.
#[derive(Clone, Copy)]
pub struct Scenario {
    name: &'static str,
    description: &'static str,
    plugins: bool,
    body: ScenarioFn,
}

impl Scenario {
    /// Create a scenario.
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str, plugins: bool, body: ScenarioFn) -> Self {
        Self {
            name,
            description,
            plugins,
            body,
        }
    }

    /// Scenario name, as used on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// One-line description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.description
    }

    /// Whether the shell must be started with its plugin directory.
    #[must_use]
    pub const fn uses_plugins(&self) -> bool {
        self.plugins
    }

    /// Run the body against `session`.
    pub fn run<'a>(&self, session: &'a mut Session, definitions: &'a Definitions) -> BoxFuture<'a, Result<()>> {
        (self.body)(session, definitions)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

/// Every built-in scenario, in run order.
pub const ALL: &[Scenario] = &[
    Scenario::new("fortune", "fortune prints a sentence, five times", true, fortune::run),
    Scenario::new("ctof", "CtoF converts 0 C to 32 F", true, ctof::run),
    Scenario::new("pokedex", "pokedex names valid numbers and rejects the rest", true, pokedex::run),
    Scenario::new("dice", "roll stays within its bound and validates input", true, dice::run),
    Scenario::new("io_append", ">> appends and cat shows the cumulative file", false, io_append::run),
];

/// Look up a built-in scenario by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Scenario> {
    ALL.iter().find(|s| s.name == name)
}

/// Expect `alternatives` and require that the first one is what matched.
///
/// The remaining alternatives name outputs that mean the shell went wrong;
/// listing them turns a would-be timeout into an immediate mismatch.
pub(crate) async fn expect_first(session: &mut Session, alternatives: Vec<Pattern>, context: &str) -> Result<Match> {
    let patterns = PatternSet::from(alternatives);
    let found = session.expect(patterns.clone()).await?;

    if found.pattern_index == 0 {
        return Ok(found);
    }

    match (patterns.get(0), patterns.get(found.pattern_index)) {
        (Some(expected), Some(actual)) => Err(ScenarioError::mismatch(context, expected, actual, &found.matched)),
        _ => Err(ScenarioError::assertion(format!("{context}: no alternatives"))),
    }
}

/// Fail with an assertion error unless `condition` holds.
pub(crate) fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::assertion(message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_findable() {
        for (i, scenario) in ALL.iter().enumerate() {
            assert!(ALL[i + 1..].iter().all(|other| other.name() != scenario.name()));
            assert_eq!(find(scenario.name()).map(Scenario::name), Some(scenario.name()));
        }
        assert!(find("nope").is_none());
    }

    #[test]
    fn only_io_append_runs_without_plugins() {
        let plain: Vec<_> = ALL.iter().filter(|s| !s.uses_plugins()).map(Scenario::name).collect();
        assert_eq!(plain, vec!["io_append"]);
    }

    #[test]
    fn ensure_reports_message() {
        assert!(ensure(true, || unreachable!()).is_ok());
        let err = ensure(false, || "d2 out of range".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "assertion failed: d2 out of range");
    }
}
