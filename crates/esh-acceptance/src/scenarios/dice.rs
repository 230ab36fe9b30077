//! `roll N` rolls an N-sided die.

use esh_expect::{Pattern, Session};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::{ensure, expect_first};
use crate::definitions::Definitions;
use crate::error::{Result, ScenarioError};

/// Two numbers after "Rolling": the die's sides, then the result.
const ROLL: &str = r".*(\d+).*(\d+)";

const INVALID: &str = "Please enter a valid number.";

fn number(capture: Option<&str>, what: &str) -> Result<u32> {
    capture
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ScenarioError::assertion(format!("{what} is not a number: {capture:?}")))
}

pub(super) fn run<'a>(session: &'a mut Session, _definitions: &'a Definitions) -> BoxFuture<'a, Result<()>> {
    async move {
        session.send_line("roll 6").await?;
        expect_first(
            session,
            vec![Pattern::literal("Rolling"), Pattern::literal(INVALID)],
            "roll 6",
        )
        .await?;

        let m = session.expect_regex(ROLL).await?;
        let sides = number(m.capture(0), "die size")?;
        let rolled = number(m.capture(1), "roll")?;
        tracing::debug!(sides, rolled, "rolled");

        ensure(rolled <= sides, || format!("rolled {rolled} on a {sides}-sided die"))?;
        ensure(rolled >= 1, || format!("rolled {rolled}, below 1"))?;

        session.send_line("roll 0").await?;
        expect_first(
            session,
            vec![Pattern::literal(INVALID), Pattern::literal("Rolling")],
            "roll 0",
        )
        .await?;

        session.send_line("exit").await?;
        session.expect_exact("exit\r\n").await?;

        Ok(())
    }
    .boxed()
}
