//! Reporting of passed scenarios.

use std::io::Write;

/// Receives one notification per scenario that passed.
///
/// Failures are never reported here; they surface as the runner's error.
pub trait Reporter {
    /// Called once after `scenario` finished and its shell was reaped.
    fn success(&mut self, scenario: &str);
}

/// Prints `PASS <scenario>` lines to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn success(&mut self, scenario: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "PASS {scenario}").and_then(|()| out.flush()) {
            tracing::warn!(scenario, error = %e, "could not write report");
        }
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn success(&mut self, scenario: &str) {
        (**self).success(scenario);
    }
}

/// Collects the names of passed scenarios.
impl Reporter for Vec<String> {
    fn success(&mut self, scenario: &str) {
        self.push(scenario.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_twice(mut reporter: impl Reporter) {
        reporter.success("a");
        reporter.success("b");
    }

    #[test]
    fn vec_collects_in_order() {
        let mut passed = Vec::new();
        report_twice(&mut passed);
        assert_eq!(passed, vec!["a", "b"]);
    }
}
