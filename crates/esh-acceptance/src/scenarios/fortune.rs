//! `fortune` prints one sentence per invocation.

use esh_expect::Session;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::definitions::Definitions;
use crate::error::Result;

/// A single sentence terminated by a period and a line break.
const FORTUNE: &str = r".+?\.\r\n";

const RUNS: usize = 5;

pub(super) fn run<'a>(session: &'a mut Session, _definitions: &'a Definitions) -> BoxFuture<'a, Result<()>> {
    async move {
        for run in 1..=RUNS {
            session.send_line("fortune").await?;
            let m = session.expect_regex(FORTUNE).await?;
            tracing::debug!(run, fortune = m.matched.trim_end(), "fortune");
        }

        Ok(())
    }
    .boxed()
}
