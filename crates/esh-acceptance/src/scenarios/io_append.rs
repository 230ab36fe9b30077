//! `>>` appends to a file across commands of one shell.

use esh_expect::Session;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::definitions::Definitions;
use crate::error::Result;

pub(super) fn run<'a>(session: &'a mut Session, definitions: &'a Definitions) -> BoxFuture<'a, Result<()>> {
    async move {
        session.expect(definitions.prompt_pattern()?).await?;

        session.send_line("echo how are you >> test3").await?;
        session.send_line("cat test3").await?;
        session.expect_exact("how are you").await?;

        session.send_line("echo quite well >> test3").await?;
        session.send_line("cat test3").await?;
        session.expect_exact("quite well\r\n").await?;

        session.send_line("exit").await?;
        session.expect_exact("exit\r\n").await?;

        Ok(())
    }
    .boxed()
}
