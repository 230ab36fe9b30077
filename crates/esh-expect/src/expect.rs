//! Expect pattern matching module.
//!
//! This module provides the pattern types, the output buffer they are
//! matched against and the matcher that ties the two together.

mod buffer;
mod matcher;
mod pattern;

pub use buffer::{DEFAULT_CAPACITY, OutputBuffer};
pub use matcher::Matcher;
pub use pattern::{CompiledRegex, Pattern, PatternMatch, PatternSet};
