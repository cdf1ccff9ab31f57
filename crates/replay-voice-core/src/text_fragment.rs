//! Traversal of caller-owned text fragment chains.
//!
//! The host hands the engine a singly linked list of annotated UTF-16 spans.
//! The engine never owns, mutates or frees any node; it only follows `next`
//! links for the duration of one call.
//!
//! A chain must terminate. A cyclic list is a violation of the caller's
//! contract and makes traversal loop forever; it is not detected here.

use tracing::debug;

/// Read-only view of one node in a caller-owned fragment chain
pub trait FragmentLink {
    /// Number of UTF-16 code units in the fragment
    fn text_len(&self) -> u32;

    /// Offset of the fragment within the original source text
    fn source_offset(&self) -> u32;

    /// Next node in the chain, if any
    fn next_fragment(&self) -> Option<&Self>;
}

/// A text fragment borrowing its text and successor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFragment<'a> {
    text: &'a [u16],
    length: u32,
    source_offset: u32,
    next: Option<&'a TextFragment<'a>>,
}

impl<'a> TextFragment<'a> {
    /// Create a terminal fragment over `text`
    #[must_use]
    pub fn new(text: &'a [u16], source_offset: u32) -> Self {
        Self {
            text,
            length: u32::try_from(text.len()).unwrap_or(u32::MAX),
            source_offset,
            next: None,
        }
    }

    /// Link this fragment to a successor
    #[must_use]
    pub const fn with_next(self, next: &'a TextFragment<'a>) -> Self {
        Self {
            next: Some(next),
            ..self
        }
    }

    /// The fragment's UTF-16 text
    #[must_use]
    pub const fn text(&self) -> &'a [u16] {
        self.text
    }

    /// The fragment's text decoded for diagnostics
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf16_lossy(self.text)
    }
}

impl FragmentLink for TextFragment<'_> {
    fn text_len(&self) -> u32 {
        self.length
    }

    fn source_offset(&self) -> u32 {
        self.source_offset
    }

    fn next_fragment(&self) -> Option<&Self> {
        self.next
    }
}

/// Iterator over a fragment chain
#[derive(Debug)]
pub struct Fragments<'a, F> {
    next: Option<&'a F>,
}

impl<'a, F: FragmentLink> Iterator for Fragments<'a, F> {
    type Item = &'a F;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next_fragment();
        Some(current)
    }
}

/// Iterate the chain starting at `head`
#[must_use]
pub const fn fragments<F: FragmentLink>(head: Option<&F>) -> Fragments<'_, F> {
    Fragments { next: head }
}

/// Sum of fragment lengths across the chain, 0 for an absent head.
///
/// Saturates at `u32::MAX`.
#[must_use]
pub fn measure_total_length<F: FragmentLink>(head: Option<&F>) -> u32 {
    fragments(head).fold(0u32, |total, fragment| total.saturating_add(fragment.text_len()))
}

/// Emit per-fragment diagnostics and return the total length
pub(crate) fn log_fragments<F: FragmentLink>(head: Option<&F>) -> u32 {
    let mut total = 0u32;
    for (index, fragment) in fragments(head).enumerate() {
        debug!(
            "fragment {}: text_len={}, source_offset={}",
            index,
            fragment.text_len(),
            fragment.source_offset()
        );
        total = total.saturating_add(fragment.text_len());
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utf16(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_absent_head_measures_zero() {
        assert_eq!(measure_total_length::<TextFragment<'_>>(None), 0);
        assert_eq!(fragments::<TextFragment<'_>>(None).count(), 0);
    }

    #[test]
    fn test_single_fragment() {
        let text = utf16("Hello");
        let fragment = TextFragment::new(&text, 0);
        assert_eq!(measure_total_length(Some(&fragment)), 5);
        assert_eq!(fragment.text_lossy(), "Hello");
    }

    #[test]
    fn test_three_fragment_chain() {
        let (a, b, c) = (utf16("aaaaa"), utf16("bbbbbbbbbb"), utf16("ccccccc"));
        let third = TextFragment::new(&c, 15);
        let second = TextFragment::new(&b, 5).with_next(&third);
        let first = TextFragment::new(&a, 0).with_next(&second);

        assert_eq!(measure_total_length(Some(&first)), 22);
        let offsets: Vec<u32> = fragments(Some(&first)).map(FragmentLink::source_offset).collect();
        assert_eq!(offsets, vec![0, 5, 15]);
        assert_eq!(log_fragments(Some(&first)), 22);
    }

    #[test]
    fn test_empty_text_fragment() {
        let empty: Vec<u16> = Vec::new();
        let fragment = TextFragment::new(&empty, 3);
        assert_eq!(measure_total_length(Some(&fragment)), 0);
        assert_eq!(fragments(Some(&fragment)).count(), 1);
    }

    /// Node with an explicit length, mirroring a host fragment whose
    /// declared length is independent of any Rust slice
    struct RawNode {
        len: u32,
        next: Option<Box<RawNode>>,
    }

    impl FragmentLink for RawNode {
        fn text_len(&self) -> u32 {
            self.len
        }

        fn source_offset(&self) -> u32 {
            0
        }

        fn next_fragment(&self) -> Option<&Self> {
            self.next.as_deref()
        }
    }

    fn chain(lengths: &[u32]) -> Option<Box<RawNode>> {
        lengths.iter().rev().fold(None, |next, &len| Some(Box::new(RawNode { len, next })))
    }

    #[test]
    fn test_measure_saturates() {
        let head = chain(&[u32::MAX, 10]);
        assert_eq!(measure_total_length(head.as_deref()), u32::MAX);
    }

    proptest! {
        #[test]
        fn prop_measure_is_exact_sum(lengths in proptest::collection::vec(0u32..100_000, 0..32)) {
            let head = chain(&lengths);
            let expected: u32 = lengths.iter().sum();
            prop_assert_eq!(measure_total_length(head.as_deref()), expected);
            prop_assert_eq!(fragments(head.as_deref()).count(), lengths.len());
        }
    }
}
