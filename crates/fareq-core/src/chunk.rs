// SPDX-License-Identifier: MIT

//! Chunk grammar engine: evaluates ordered tag-level pattern grammars over a
//! tagged token sequence, producing a flat tree of labeled spans with
//! unmatched tokens left as top-level leaves.
//!
//! Patterns are a small tagged-variant language matched by a hand-rolled
//! backtracking matcher; tag matching never goes through a string regex
//! engine.

use crate::tags::{PennTag, TaggedToken};

/// The grammar alphabet: classes of part-of-speech tags a pattern can ask
/// for. `ProperNoun` covers both the singular and plural proper-noun tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    ProperNoun,
    Numeral,
    Direction,
    Conjunction,
}

impl TagClass {
    pub fn matches(self, tag: PennTag) -> bool {
        match self {
            TagClass::ProperNoun => matches!(tag, PennTag::NNP | PennTag::NNPS),
            TagClass::Numeral => matches!(tag, PennTag::CD),
            TagClass::Direction => matches!(tag, PennTag::TO),
            TagClass::Conjunction => matches!(tag, PennTag::CC),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    One,
    ZeroOrOne,
    OneOrMore,
    ZeroOrMore,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternItem {
    pub class: TagClass,
    pub repeat: Repeat,
}

impl PatternItem {
    pub const fn new(class: TagClass, repeat: Repeat) -> Self {
        Self { class, repeat }
    }
}

/// Labels a grammar rule attaches to matched spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanLabel {
    Route,
    Origin,
    TravelDates,
    FlexibleDates,
}

#[derive(Debug, Clone)]
pub struct ChunkRule {
    pub label: SpanLabel,
    pub pattern: Vec<PatternItem>,
}

impl ChunkRule {
    pub fn new(label: SpanLabel, pattern: Vec<PatternItem>) -> Self {
        Self { label, pattern }
    }
}

/// A node of the parse result: a raw token, or a labeled span wrapping the
/// tokens a rule matched. Trees are never mutated after construction;
/// re-parsing produces a new tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanNode {
    Leaf(TaggedToken),
    Span {
        label: SpanLabel,
        children: Vec<SpanNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanTree {
    nodes: Vec<SpanNode>,
}

impl SpanTree {
    pub fn nodes(&self) -> &[SpanNode] {
        &self.nodes
    }

    /// All top-level spans carrying `label`, in left-to-right order.
    pub fn spans(&self, label: SpanLabel) -> impl Iterator<Item = &[SpanNode]> {
        self.nodes.iter().filter_map(move |node| match node {
            SpanNode::Span { label: l, children } if *l == label => Some(children.as_slice()),
            _ => None,
        })
    }

    /// "The" span of a label. When several spans carry the label, the last
    /// one in left-to-right order wins. Flipping this tie-break changes
    /// output for any query with repeated date-like fragments, so it stays
    /// an explicit fold over all candidates.
    pub fn last_span(&self, label: SpanLabel) -> Option<&[SpanNode]> {
        self.spans(label).fold(None, |_, span| Some(span))
    }
}

/// Direct leaf tokens of a node slice, skipping nested spans.
pub fn direct_leaves(nodes: &[SpanNode]) -> impl Iterator<Item = &TaggedToken> {
    nodes.iter().filter_map(|node| match node {
        SpanNode::Leaf(token) => Some(token),
        SpanNode::Span { .. } => None,
    })
}

/// Applies `rules` to `tokens` as a sequential chunker: at each position the
/// first rule with a non-empty greedy match wins and its tokens become a
/// labeled span; tokens no rule matches stay leaves.
pub fn parse(tokens: &[TaggedToken], rules: &[ChunkRule]) -> SpanTree {
    let mut nodes = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let hit = rules.iter().find_map(|rule| {
            match_pattern(&rule.pattern, &tokens[pos..])
                .filter(|&len| len > 0)
                .map(|len| (rule.label, len))
        });
        match hit {
            Some((label, len)) => {
                let children = tokens[pos..pos + len]
                    .iter()
                    .cloned()
                    .map(SpanNode::Leaf)
                    .collect();
                nodes.push(SpanNode::Span { label, children });
                pos += len;
            }
            None => {
                nodes.push(SpanNode::Leaf(tokens[pos].clone()));
                pos += 1;
            }
        }
    }
    SpanTree { nodes }
}

/// Longest prefix of `tokens` matching the whole pattern, if any.
/// Each repetition starts greedy and backs off until the rest of the
/// pattern fits.
fn match_pattern(pattern: &[PatternItem], tokens: &[TaggedToken]) -> Option<usize> {
    fn step(pattern: &[PatternItem], tokens: &[TaggedToken], pos: usize) -> Option<usize> {
        let Some((item, rest)) = pattern.split_first() else {
            return Some(pos);
        };
        let (min, max) = match item.repeat {
            Repeat::One => (1, 1),
            Repeat::ZeroOrOne => (0, 1),
            Repeat::OneOrMore => (1, usize::MAX),
            Repeat::ZeroOrMore => (0, usize::MAX),
        };
        let mut count = 0;
        while count < max
            && pos + count < tokens.len()
            && item.class.matches(tokens[pos + count].tag)
        {
            count += 1;
        }
        loop {
            if count < min {
                return None;
            }
            if let Some(end) = step(rest, tokens, pos + count) {
                return Some(end);
            }
            if count == 0 {
                return None;
            }
            count -= 1;
        }
    }
    step(pattern, tokens, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::PennTag::*;

    fn tok(text: &str, tag: PennTag) -> TaggedToken {
        TaggedToken::new(text, tag)
    }

    fn route_rule() -> ChunkRule {
        ChunkRule::new(
            SpanLabel::Route,
            vec![
                PatternItem::new(TagClass::ProperNoun, Repeat::OneOrMore),
                PatternItem::new(TagClass::Direction, Repeat::One),
                PatternItem::new(TagClass::ProperNoun, Repeat::ZeroOrMore),
            ],
        )
    }

    #[test]
    fn test_greedy_longest_match() {
        let tokens = vec![
            tok("New", NNP),
            tok("York", NNP),
            tok("to", TO),
            tok("Los", NNP),
            tok("Angeles", NNP),
        ];
        let tree = parse(&tokens, &[route_rule()]);
        let span = tree.last_span(SpanLabel::Route).expect("route span");
        assert_eq!(span.len(), 5);
    }

    #[test]
    fn test_unmatched_tokens_stay_leaves() {
        let tokens = vec![
            tok("Flights", NNS),
            tok("from", IN),
            tok("Jfk", NNP),
            tok("to", TO),
            tok("Lax", NNP),
        ];
        let tree = parse(&tokens, &[route_rule()]);
        assert_eq!(tree.nodes().len(), 3); // two leaves + the span
        assert!(matches!(tree.nodes()[0], SpanNode::Leaf(_)));
        assert!(matches!(tree.nodes()[1], SpanNode::Leaf(_)));
        assert!(matches!(tree.nodes()[2], SpanNode::Span { .. }));
    }

    #[test]
    fn test_repetition_backs_off_for_tail() {
        // CD+ followed by exactly one CD: the leading repetition must give a
        // token back for the tail to match.
        let rule = ChunkRule::new(
            SpanLabel::FlexibleDates,
            vec![
                PatternItem::new(TagClass::Numeral, Repeat::OneOrMore),
                PatternItem::new(TagClass::Numeral, Repeat::One),
            ],
        );
        let tokens = vec![tok("8", CD), tok("11", CD)];
        let tree = parse(&tokens, &[rule]);
        let span = tree.last_span(SpanLabel::FlexibleDates).expect("span");
        assert_eq!(span.len(), 2);
    }

    #[test]
    fn test_zero_length_match_is_no_match() {
        let rule = ChunkRule::new(
            SpanLabel::TravelDates,
            vec![PatternItem::new(TagClass::Numeral, Repeat::ZeroOrMore)],
        );
        let tokens = vec![tok("Boston", NNP), tok("bound", VBN)];
        let tree = parse(&tokens, &[rule]);
        assert!(tree.last_span(SpanLabel::TravelDates).is_none());
        assert_eq!(tree.nodes().len(), 2);
    }

    #[test]
    fn test_last_span_wins_over_earlier_ones() {
        let rule = ChunkRule::new(
            SpanLabel::TravelDates,
            vec![PatternItem::new(TagClass::Numeral, Repeat::OneOrMore)],
        );
        let tokens = vec![
            tok("8", CD),
            tok("or", CC),
            tok("11", CD),
        ];
        let tree = parse(&tokens, &[rule]);
        assert_eq!(tree.spans(SpanLabel::TravelDates).count(), 2);
        let last = tree.last_span(SpanLabel::TravelDates).expect("span");
        let texts: Vec<_> = direct_leaves(last).map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["11"]);
    }

    #[test]
    fn test_optional_direction_in_date_pattern() {
        let rule = ChunkRule::new(
            SpanLabel::TravelDates,
            vec![
                PatternItem::new(TagClass::ProperNoun, Repeat::ZeroOrMore),
                PatternItem::new(TagClass::Numeral, Repeat::OneOrMore),
                PatternItem::new(TagClass::Direction, Repeat::ZeroOrMore),
                PatternItem::new(TagClass::ProperNoun, Repeat::ZeroOrMore),
                PatternItem::new(TagClass::Numeral, Repeat::ZeroOrMore),
            ],
        );
        let tokens = vec![
            tok("October", NNP),
            tok("2Nd", CD),
            tok("to", TO),
            tok("November", NNP),
            tok("21St", CD),
        ];
        let tree = parse(&tokens, &[rule]);
        let span = tree.last_span(SpanLabel::TravelDates).expect("span");
        assert_eq!(span.len(), 5);
    }

    #[test]
    fn test_no_span_of_missing_label() {
        let tokens = vec![tok("hello", UH)];
        let tree = parse(&tokens, &[route_rule()]);
        assert!(tree.last_span(SpanLabel::Route).is_none());
        assert_eq!(tree.spans(SpanLabel::Route).count(), 0);
    }
}
