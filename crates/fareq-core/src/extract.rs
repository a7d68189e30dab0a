//! Entity extractors over the chunk engine: route splitting, travel-date
//! spans, and the flexibility flag.

use crate::chunk::{
    self, ChunkRule, PatternItem, Repeat, SpanLabel, SpanNode, SpanTree, TagClass,
};
use crate::tags::{TaggedSequence, TaggedToken};

/// Entity texts pulled from one query, before code resolution and date
/// normalization. Every populated field is the space-joined text of a
/// contiguous span of the tagged sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub origin_text: Option<String>,
    pub destination_text: Option<String>,
    pub departure_text: Option<String>,
    pub return_text: Option<String>,
    pub is_flexible: bool,
}

/// Process-wide grammar configuration. Built once at startup and passed
/// into the engine explicitly; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub route: Vec<ChunkRule>,
    pub origin: Vec<ChunkRule>,
    pub dates: Vec<ChunkRule>,
    pub flexible: Vec<ChunkRule>,
}

const fn item(class: TagClass, repeat: Repeat) -> PatternItem {
    PatternItem::new(class, repeat)
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            // NNP+ TO NNP*
            route: vec![ChunkRule::new(
                SpanLabel::Route,
                vec![
                    item(TagClass::ProperNoun, Repeat::OneOrMore),
                    item(TagClass::Direction, Repeat::One),
                    item(TagClass::ProperNoun, Repeat::ZeroOrMore),
                ],
            )],
            // NNP+ TO, applied inside a Route span to find the boundary
            origin: vec![ChunkRule::new(
                SpanLabel::Origin,
                vec![
                    item(TagClass::ProperNoun, Repeat::OneOrMore),
                    item(TagClass::Direction, Repeat::One),
                ],
            )],
            // NNP* CD+ TO* NNP* CD*
            dates: vec![ChunkRule::new(
                SpanLabel::TravelDates,
                vec![
                    item(TagClass::ProperNoun, Repeat::ZeroOrMore),
                    item(TagClass::Numeral, Repeat::OneOrMore),
                    item(TagClass::Direction, Repeat::ZeroOrMore),
                    item(TagClass::ProperNoun, Repeat::ZeroOrMore),
                    item(TagClass::Numeral, Repeat::ZeroOrMore),
                ],
            )],
            // CD+ CC CD+, e.g. "October 8 or 11"
            flexible: vec![ChunkRule::new(
                SpanLabel::FlexibleDates,
                vec![
                    item(TagClass::Numeral, Repeat::OneOrMore),
                    item(TagClass::Conjunction, Repeat::One),
                    item(TagClass::Numeral, Repeat::OneOrMore),
                ],
            )],
        }
    }
}

/// Splits the last `Route` span into origin and destination text at the
/// direction marker, by re-parsing the span's own tokens with the inner
/// origin grammar. The inner pass only ever sees tokens inside the outer
/// match. Origin is the sub-span text minus the marker itself; destination
/// is everything after the sub-span.
pub fn origin_destination(
    tree: &SpanTree,
    rules: &ExtractionRules,
) -> (Option<String>, Option<String>) {
    let Some(route) = tree.last_span(SpanLabel::Route) else {
        return (None, None);
    };
    let tokens: Vec<TaggedToken> = chunk::direct_leaves(route).cloned().collect();
    let inner = chunk::parse(&tokens, &rules.origin);

    let mut origin = None;
    for (i, node) in inner.nodes().iter().enumerate() {
        if let SpanNode::Span {
            label: SpanLabel::Origin,
            children,
        } = node
        {
            origin = Some((i, children.as_slice()));
        }
    }
    let Some((idx, children)) = origin else {
        return (None, None);
    };

    let origin_texts: Vec<&str> = chunk::direct_leaves(children)
        .map(|t| t.text.as_str())
        .collect();
    let Some((_marker, before)) = origin_texts.split_last() else {
        return (None, None);
    };
    let origin_text = before.join(" ");
    let destination_text = chunk::direct_leaves(&inner.nodes()[idx + 1..])
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    (non_empty(origin_text), non_empty(destination_text))
}

/// Pulls departure and return fragments from the last `TravelDates` span.
/// The layout is fixed and positional: leaves 0 and 1 form the departure
/// fragment, leaves 3 and 4 the return fragment. Date mentions with a
/// different token count (an inline year, a bare numeral) come out
/// misaligned or missing; callers see that as absence, not as an error.
pub fn travel_dates(tree: &SpanTree) -> (Option<String>, Option<String>) {
    let Some(span) = tree.last_span(SpanLabel::TravelDates) else {
        return (None, None);
    };
    let leaves: Vec<&str> = chunk::direct_leaves(span).map(|t| t.text.as_str()).collect();
    if leaves.len() < 2 {
        return (None, None);
    }
    let departure = format!("{} {}", leaves[0], leaves[1]);
    let ret = if leaves.len() < 5 {
        None
    } else {
        Some(format!("{} {}", leaves[3], leaves[4]))
    };
    (Some(departure), ret)
}

/// Strictly boolean flexibility signal: the literal word "flexible"
/// anywhere in the query, or a numeral-conjunction-numeral span.
pub fn is_flexible(sequence: &TaggedSequence, rules: &ExtractionRules) -> bool {
    if sequence
        .iter()
        .any(|t| t.text.eq_ignore_ascii_case("flexible"))
    {
        return true;
    }
    let tree = chunk::parse(sequence, &rules.flexible);
    tree.last_span(SpanLabel::FlexibleDates).is_some()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
