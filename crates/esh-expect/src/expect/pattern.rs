//! Pattern types for expect operations.
//!
//! A pattern is either an exact literal or a regular expression. Both are
//! matched against raw output bytes; nothing is trimmed or normalized, so a
//! caller waiting for a line terminator spells it out (`"\r\n"`).

use std::borrow::Cow;
use std::fmt;

use regex::bytes::{Regex, RegexBuilder};

/// A pattern that can be matched against terminal output.
#[derive(Clone)]
pub enum Pattern {
    /// Match an exact byte sequence.
    Literal(Vec<u8>),

    /// Match a regular expression.
    Regex(CompiledRegex),
}

impl Pattern {
    /// Create a literal pattern from text or raw bytes.
    #[must_use]
    pub fn literal(bytes: impl AsRef<[u8]>) -> Self {
        Self::Literal(bytes.as_ref().to_vec())
    }

    /// Create a regex pattern.
    ///
    /// The expression works on bytes: `.` matches any single byte, line
    /// terminators and bytes outside UTF-8 included, and classes such as
    /// `\d` and `\w` are ASCII-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .unicode(false)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self::Regex(CompiledRegex::new(pattern.to_string(), regex)))
    }

    /// Get the pattern source for display purposes.
    #[must_use]
    pub fn source(&self) -> Cow<'_, str> {
        match self {
            Self::Literal(bytes) => String::from_utf8_lossy(bytes),
            Self::Regex(r) => Cow::Borrowed(r.pattern()),
        }
    }

    /// Number of capture groups a match of this pattern reports.
    #[must_use]
    pub fn capture_count(&self) -> usize {
        match self {
            Self::Literal(_) => 0,
            Self::Regex(r) => r.group_count(),
        }
    }

    /// Find the leftmost match of this pattern in `haystack`.
    #[must_use]
    pub fn matches(&self, haystack: &[u8]) -> Option<PatternMatch> {
        match self {
            Self::Literal(needle) => find_literal(haystack, needle).map(|start| PatternMatch {
                start,
                end: start + needle.len(),
                captures: Vec::new(),
            }),
            Self::Regex(r) => r.find(haystack),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(bytes) => write!(f, "Literal(\"{}\")", bytes.escape_ascii()),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(bytes) => write!(f, "\"{}\"", bytes.escape_ascii()),
            Self::Regex(r) => write!(f, "/{}/", r.pattern()),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::literal(s)
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Literal(s.into_bytes())
    }
}

impl From<&[u8]> for Pattern {
    fn from(bytes: &[u8]) -> Self {
        Self::literal(bytes)
    }
}

impl From<Vec<u8>> for Pattern {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Literal(bytes)
    }
}

fn find_literal(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// A compiled regular expression with its source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    regex: Regex,
}

impl CompiledRegex {
    /// Create a new compiled regex.
    #[must_use]
    pub const fn new(pattern: String, regex: Regex) -> Self {
        Self { pattern, regex }
    }

    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of declared capture groups, excluding the whole match.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Find the leftmost match and its capture groups.
    #[must_use]
    pub fn find(&self, haystack: &[u8]) -> Option<PatternMatch> {
        let caps = self.regex.captures(haystack)?;
        let whole = caps.get(0)?;

        let captures = caps
            .iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| String::from_utf8_lossy(m.as_bytes()).into_owned()))
            .collect();

        Some(PatternMatch {
            start: whole.start(),
            end: whole.end(),
            captures,
        })
    }
}

/// Location of a pattern match within a scanned span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Start position of the match in the text.
    pub start: usize,
    /// End position of the match in the text.
    pub end: usize,
    /// Capture groups (for regex patterns).
    pub captures: Vec<String>,
}

impl PatternMatch {
    /// Get the length of the match.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the match is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// An ordered set of alternative patterns.
///
/// The position of a pattern in the set is the index reported when it fires.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Create a new empty pattern set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern set from a vector of patterns.
    #[must_use]
    pub const fn from_patterns(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }

    /// Add a pattern to the set.
    pub fn add(&mut self, pattern: impl Into<Pattern>) -> &mut Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Get the number of patterns in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Get a pattern by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    /// Get iterator over patterns.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Find the match that starts earliest in `haystack`.
    ///
    /// Every pattern is tested against the whole span. When two patterns
    /// match at the same offset the one with the lower index wins.
    #[must_use]
    pub fn find_match(&self, haystack: &[u8]) -> Option<(usize, PatternMatch)> {
        let mut best: Option<(usize, PatternMatch)> = None;

        for (idx, pattern) in self.patterns.iter().enumerate() {
            if let Some(m) = pattern.matches(haystack) {
                match &best {
                    Some((_, current)) if m.start >= current.start => {}
                    _ => best = Some((idx, m)),
                }
            }
        }

        best
    }

    /// Render the alternatives for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        self.patterns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl From<Pattern> for PatternSet {
    fn from(pattern: Pattern) -> Self {
        Self::from_patterns(vec![pattern])
    }
}

impl From<Vec<Pattern>> for PatternSet {
    fn from(patterns: Vec<Pattern>) -> Self {
        Self::from_patterns(patterns)
    }
}

impl From<&str> for PatternSet {
    fn from(s: &str) -> Self {
        Pattern::from(s).into()
    }
}

impl From<String> for PatternSet {
    fn from(s: String) -> Self {
        Pattern::from(s).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches() {
        let m = Pattern::literal("hello").matches(b"say hello world").unwrap();
        assert_eq!((m.start, m.end), (4, 9));
        assert!(m.captures.is_empty());
    }

    #[test]
    fn literal_keeps_control_bytes() {
        let pattern = Pattern::literal("exit\r\n");
        assert!(pattern.matches(b"exit\n").is_none());
        let m = pattern.matches(b"esh> exit\r\n").unwrap();
        assert_eq!(m.start, 5);
        assert_eq!(m.len(), 6);
    }

    #[test]
    fn empty_literal_matches_immediately() {
        let m = Pattern::literal("").matches(b"anything").unwrap();
        assert!(m.is_empty());
        assert_eq!(m.start, 0);
    }

    #[test]
    fn regex_captures_in_declaration_order() {
        let pattern = Pattern::regex(r"(\w+)@(\w+)").unwrap();
        let m = pattern.matches(b"email: user@domain here").unwrap();
        assert_eq!(m.captures, vec!["user", "domain"]);
        assert_eq!(pattern.capture_count(), 2);
    }

    #[test]
    fn non_participating_group_is_empty() {
        let pattern = Pattern::regex(r"(a)|(b)").unwrap();
        let m = pattern.matches(b"b").unwrap();
        assert_eq!(m.captures, vec![String::new(), "b".to_string()]);
    }

    #[test]
    fn regex_dot_spans_lines() {
        let pattern = Pattern::regex(r"Rolling.*?(\d+)").unwrap();
        let m = pattern.matches(b"Rolling a die\r\n4\r\n").unwrap();
        assert_eq!(m.captures, vec!["4"]);
    }

    #[test]
    fn regex_dot_matches_bytes_outside_utf8() {
        let pattern = Pattern::regex(r".+?\.\r\n").unwrap();
        let m = pattern.matches(b"caf\xe9 ok.\r\n").unwrap();
        assert_eq!((m.start, m.end), (0, 10));
    }

    #[test]
    fn regex_classes_are_ascii() {
        let pattern = Pattern::regex(r"(\d+)").unwrap();
        let m = pattern.matches("\u{0663}7".as_bytes()).unwrap();
        assert_eq!(m.captures, vec!["7"]);
    }

    #[test]
    fn literal_matches_raw_bytes() {
        let pattern = Pattern::from(&b"\xff\xfe"[..]);
        let m = pattern.matches(b"ab\xff\xfecd").unwrap();
        assert_eq!((m.start, m.end), (2, 4));
        assert_eq!(pattern.to_string(), r#""\xff\xfe""#);
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(Pattern::regex("(unclosed").is_err());
    }

    #[test]
    fn earliest_match_wins() {
        let mut set = PatternSet::new();
        set.add("world").add("hello");

        let (idx, m) = set.find_match(b"hello world").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(m.start, 0);
    }

    #[test]
    fn tie_goes_to_lower_index() {
        let set = PatternSet::from_patterns(vec![
            Pattern::literal("esh"),
            Pattern::literal("esh> "),
            Pattern::regex("e.h").unwrap(),
        ]);

        let (idx, m) = set.find_match(b"...esh> ").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(m.end, 6);
    }

    #[test]
    fn no_match_in_empty_set() {
        assert!(PatternSet::new().find_match(b"data").is_none());
    }

    #[test]
    fn describe_lists_alternatives() {
        let set = PatternSet::from_patterns(vec![Pattern::literal("a\r\n"), Pattern::regex(r"\d+").unwrap()]);
        assert_eq!(set.describe(), r#""a\r\n" | /\d+/"#);
    }
}
