//! esh-acceptance: acceptance scenarios for interactive shells
//!
//! This crate runs end-to-end scenarios against a shell under test: each
//! scenario spawns the shell on a pseudo-terminal, types commands and checks
//! what comes back. The shell is always reaped, together with every job it
//! started, before a scenario's outcome is reported.
//!
//! The `esh-run` binary runs scenarios from the command line; `test-esh` is
//! a small stand-in shell the scenarios pass against.

pub mod definitions;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenarios;

pub use definitions::{Definitions, DefinitionsError};
pub use error::{Result, ScenarioError};
pub use report::{Reporter, StdoutReporter};
pub use runner::Runner;
pub use scenarios::{ALL, Scenario, ScenarioFn};
