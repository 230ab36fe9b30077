//! `CtoF` converts Celsius to Fahrenheit.

use esh_expect::{Pattern, Session};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::expect_first;
use crate::definitions::Definitions;
use crate::error::Result;

pub(super) fn run<'a>(session: &'a mut Session, _definitions: &'a Definitions) -> BoxFuture<'a, Result<()>> {
    async move {
        session.send_line("CtoF 0").await?;
        expect_first(
            session,
            vec![Pattern::literal("32.000000 F"), Pattern::literal("command not found")],
            "CtoF 0",
        )
        .await?;

        Ok(())
    }
    .boxed()
}
