//! `pokedex N` names the N-th first generation pokemon.

use esh_expect::{Pattern, Session};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::expect_first;
use crate::definitions::Definitions;
use crate::error::Result;

/// Printed for any number outside 1..=151.
const INVALID: &str = "missingno";

pub(super) fn run<'a>(session: &'a mut Session, _definitions: &'a Definitions) -> BoxFuture<'a, Result<()>> {
    async move {
        for (command, name) in [
            ("pokedex 1", "bulbasaur"),
            ("pokedex 150", "mewtwo"),
            ("pokedex 155", INVALID),
            ("pokedex", INVALID),
        ] {
            session.send_line(command).await?;
            let mut alternatives = vec![Pattern::literal(name)];
            if name != INVALID {
                alternatives.push(Pattern::literal(INVALID));
            }
            expect_first(session, alternatives, command).await?;
        }

        // Nothing may follow the echoed command once the shell exits.
        session.send_line("exit").await?;
        session.expect_exact("exit\r\n").await?;

        Ok(())
    }
    .boxed()
}
