//! Pattern matching engine for expect operations.
//!
//! The matcher scans the whole unconsumed buffer against every alternative
//! and, on success, consumes the buffer up to the end of the winning match.
//! Scan and consume happen under one borrow of the buffer, so output that
//! arrives in between cannot be skipped.

use super::buffer::OutputBuffer;
use super::pattern::PatternSet;
use crate::types::Match;

/// Scans an [`OutputBuffer`] for one of a set of alternatives.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    patterns: &'a PatternSet,
}

impl<'a> Matcher<'a> {
    /// Create a matcher over `patterns`.
    #[must_use]
    pub const fn new(patterns: &'a PatternSet) -> Self {
        Self { patterns }
    }

    /// The alternatives this matcher looks for.
    #[must_use]
    pub const fn patterns(&self) -> &'a PatternSet {
        self.patterns
    }

    /// Try to match against the buffered output.
    ///
    /// On success the matched region and everything before it is removed
    /// from `buffer`; bytes after the match stay for the next call. On
    /// failure the buffer is left untouched.
    pub fn try_match(&self, buffer: &mut OutputBuffer) -> Option<Match> {
        let (pattern_index, found) = self.patterns.find_match(buffer.as_bytes())?;

        let start_offset = buffer.offset();
        let consumed = buffer.consume(found.end);

        let before = String::from_utf8_lossy(&consumed[..found.start]).into_owned();
        let matched = String::from_utf8_lossy(&consumed[found.start..]).into_owned();

        Some(Match {
            pattern_index,
            matched,
            captures: found.captures,
            before,
            consumed: start_offset..buffer.offset(),
        })
    }
}
