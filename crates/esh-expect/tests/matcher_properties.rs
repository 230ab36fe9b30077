//! Property tests for the matching engine.

use esh_expect::{Matcher, OutputBuffer, Pattern, PatternSet};
use proptest::prelude::*;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

proptest! {
    #[test]
    fn earliest_start_then_lowest_index(
        haystack in "[ab]{0,40}",
        needles in prop::collection::vec("[ab]{1,3}", 1..4),
    ) {
        let patterns = PatternSet::from(needles.iter().map(Pattern::literal).collect::<Vec<_>>());

        let expected = needles
            .iter()
            .enumerate()
            .filter_map(|(i, n)| find(haystack.as_bytes(), n.as_bytes()).map(|start| (start, i)))
            .min();

        let got = patterns.find_match(haystack.as_bytes()).map(|(i, m)| (m.start, i));
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn chunked_arrival_matches_like_whole_buffer(
        haystack in "[abc]{1,60}",
        needle in "[abc]{1,4}",
        cuts in prop::collection::vec(0usize..60, 0..6),
    ) {
        let patterns = PatternSet::from(Pattern::literal(needle.clone()));
        let matcher = Matcher::new(&patterns);

        let mut whole = OutputBuffer::new();
        whole.append(haystack.as_bytes());
        let expected = matcher.try_match(&mut whole);

        let mut bounds: Vec<usize> = cuts.into_iter().map(|c| c.min(haystack.len())).collect();
        bounds.push(haystack.len());
        bounds.sort_unstable();

        let mut chunked = OutputBuffer::new();
        let mut from = 0;
        let mut got = None;
        for to in bounds {
            chunked.append(&haystack.as_bytes()[from..to]);
            from = to;
            if got.is_none() {
                got = matcher.try_match(&mut chunked);
            }
        }

        prop_assert_eq!(got.as_ref().map(|m| m.consumed.clone()), expected.as_ref().map(|m| m.consumed.clone()));
        prop_assert_eq!(chunked.as_bytes(), whole.as_bytes());
    }

    #[test]
    fn consumption_preserves_stream_offsets(haystack in "[ab]{0,40}", needle in "[ab]{1,3}") {
        let patterns = PatternSet::from(Pattern::literal(needle));
        let mut buffer = OutputBuffer::new();
        buffer.append(haystack.as_bytes());

        match Matcher::new(&patterns).try_match(&mut buffer) {
            Some(m) => {
                prop_assert_eq!(m.consumed.start, 0);
                prop_assert_eq!(m.consumed.end, buffer.offset());
                prop_assert_eq!(buffer.as_bytes(), &haystack.as_bytes()[m.consumed.end..]);
                prop_assert_eq!(m.before.len() + m.matched.len(), m.consumed.len());
            }
            None => prop_assert_eq!(buffer.as_bytes(), haystack.as_bytes()),
        }
        prop_assert_eq!(buffer.total_received(), haystack.len());
    }
}
