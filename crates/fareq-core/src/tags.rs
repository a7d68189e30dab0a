// SPDX-License-Identifier: MIT

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Penn Treebank part-of-speech tag set, as emitted by the external
/// annotation service. `PRPS`/`WPS` stand in for the possessive tags
/// `PRP$`/`WP$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PennTag {
    CC, // coordinating conjunction
    CD, // cardinal number
    DT,
    EX,
    FW,
    IN,
    JJ,
    JJR,
    JJS,
    LS,
    MD,
    NN,
    NNS,
    NNP,  // proper noun, singular
    NNPS, // proper noun, plural
    PDT,
    POS,
    PRP,
    PRPS,
    RB,
    RBR,
    RBS,
    RP,
    SYM,
    TO, // infinitive/direction marker
    UH,
    VB,
    VBD,
    VBG,
    VBN,
    VBP,
    VBZ,
    WDT,
    WP,
    WPS,
    WRB,
}

#[derive(Error, Debug)]
#[error("unknown part-of-speech tag: {0}")]
pub struct UnknownTag(String);

impl std::str::FromStr for PennTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = match s.to_ascii_uppercase().as_str() {
            "CC" => PennTag::CC,
            "CD" => PennTag::CD,
            "DT" => PennTag::DT,
            "EX" => PennTag::EX,
            "FW" => PennTag::FW,
            "IN" => PennTag::IN,
            "JJ" => PennTag::JJ,
            "JJR" => PennTag::JJR,
            "JJS" => PennTag::JJS,
            "LS" => PennTag::LS,
            "MD" => PennTag::MD,
            "NN" => PennTag::NN,
            "NNS" => PennTag::NNS,
            "NNP" => PennTag::NNP,
            "NNPS" => PennTag::NNPS,
            "PDT" => PennTag::PDT,
            "POS" => PennTag::POS,
            "PRP" => PennTag::PRP,
            "PRP$" => PennTag::PRPS,
            "RB" => PennTag::RB,
            "RBR" => PennTag::RBR,
            "RBS" => PennTag::RBS,
            "RP" => PennTag::RP,
            "SYM" => PennTag::SYM,
            "TO" => PennTag::TO,
            "UH" => PennTag::UH,
            "VB" => PennTag::VB,
            "VBD" => PennTag::VBD,
            "VBG" => PennTag::VBG,
            "VBN" => PennTag::VBN,
            "VBP" => PennTag::VBP,
            "VBZ" => PennTag::VBZ,
            "WDT" => PennTag::WDT,
            "WP" => PennTag::WP,
            "WP$" => PennTag::WPS,
            "WRB" => PennTag::WRB,
            _ => return Err(UnknownTag(s.to_string())),
        };
        Ok(tag)
    }
}

/// A single token with its part-of-speech tag. Produced by the tagging
/// adapter; read-only downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub text: String,
    pub tag: PennTag,
}

impl TaggedToken {
    pub fn new(text: impl Into<String>, tag: PennTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }
}

/// One query's worth of tagged tokens, in surface order.
pub type TaggedSequence = Vec<TaggedToken>;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("tagging service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The external tokenizer/tagger, seen through its interface boundary.
pub trait Tagger {
    fn tag(&self, text: &str) -> Result<TaggedSequence, TagError>;
}

/// Immutable stop-word configuration, constructed once at startup.
/// Matching is case-sensitive: only the exact lowercase forms are stop
/// words, which is what keeps "to"/"from" markers lowercase through
/// `prepare` while everything else is title-cased.
#[derive(Debug, Clone)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    pub fn english() -> Self {
        Self::from_words(ENGLISH_STOP_WORDS.iter().copied())
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(words.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }
}

/// Normalizes a raw query for the tagger: strips punctuation, then
/// title-cases every whitespace token that is not a stop word. The
/// title-casing is what makes the tagger see place names as proper nouns;
/// it also mangles airport codes ("JFK" becomes "Jfk"), which the location
/// resolver undoes by upper-casing.
pub fn prepare(raw: &str, stop_words: &StopWords) -> String {
    static PUNCT_RE: OnceLock<Regex> = OnceLock::new();
    let punct_re = PUNCT_RE.get_or_init(|| Regex::new(r"[^\w\s]").unwrap());

    let stripped = punct_re.replace_all(raw, "");
    stripped
        .split_whitespace()
        .map(|word| {
            if stop_words.contains(word) {
                word.to_string()
            } else {
                title_case(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title-cases a token: every letter at the start or following a non-letter
/// is upper-cased, the rest lower-cased. Digits reset the boundary, so
/// "2nd" comes out as "2Nd".
pub(crate) fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_is_alpha = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if prev_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(c);
            prev_is_alpha = false;
        }
    }
    out
}

/// Tagging adapter backed by an HTTP annotation service.
///
/// Wire format: `POST {url}` with `{"text": "..."}`, answered by
/// `{"tokens": [{"token": "...", "tag": "NNP"}, ...]}`. Tag strings the
/// Penn set does not know normalize to `SYM`.
pub struct HttpTagger {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTagger {
    pub fn new(url: impl Into<String>) -> Result<Self, TagError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct WireToken {
    token: String,
    tag: String,
}

#[derive(Deserialize)]
struct TagResponse {
    tokens: Vec<WireToken>,
}

impl Tagger for HttpTagger {
    fn tag(&self, text: &str) -> Result<TaggedSequence, TagError> {
        let response: TagResponse = self
            .client
            .post(&self.url)
            .json(&TagRequest { text })
            .send()?
            .error_for_status()?
            .json()?;

        let sequence = response
            .tokens
            .into_iter()
            .map(|wire| {
                let tag = wire.tag.parse().unwrap_or_else(|_| {
                    debug!(
                        "unrecognized tag {:?} on token {:?}, normalizing to SYM",
                        wire.tag, wire.token
                    );
                    PennTag::SYM
                });
                TaggedToken {
                    text: wire.token,
                    tag,
                }
            })
            .collect();
        Ok(sequence)
    }
}

/// The standard English stop-word list (nltk's `stopwords` corpus).
/// Contraction entries can never match post-`prepare` input, since
/// punctuation is stripped before the stop-word check; they are kept so the
/// list stays verbatim.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_title_cases_non_stop_words() {
        let stop = StopWords::english();
        let prepared = prepare(
            "Flights from JFK to LAX between October 2nd to November 21st",
            &stop,
        );
        assert_eq!(
            prepared,
            "Flights from Jfk to Lax between October 2Nd to November 21St"
        );
    }

    #[test]
    fn test_prepare_strips_punctuation() {
        let stop = StopWords::english();
        assert_eq!(prepare("fly to J.F.K!", &stop), "Fly to Jfk");
        assert_eq!(prepare("what's the fare?", &stop), "Whats the Fare");
    }

    #[test]
    fn test_prepare_keeps_stop_words_verbatim() {
        let stop = StopWords::english();
        // "To" with a capital is not in the (lowercase) stop set, so it gets
        // title-cased like any other word; lowercase "to" passes through.
        assert_eq!(prepare("To go to Boston", &stop), "To Go to Boston");
    }

    #[test]
    fn test_penn_tag_parse() {
        assert_eq!("NNP".parse::<PennTag>().unwrap(), PennTag::NNP);
        assert_eq!("nnps".parse::<PennTag>().unwrap(), PennTag::NNPS);
        assert_eq!("PRP$".parse::<PennTag>().unwrap(), PennTag::PRPS);
        assert!(".".parse::<PennTag>().is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("october"), "October");
        assert_eq!(title_case("JFK"), "Jfk");
        assert_eq!(title_case("2nd"), "2Nd");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_custom_stop_words() {
        let stop = StopWords::from_words(["nach", "von"]);
        assert!(stop.contains("nach"));
        assert!(!stop.contains("to"));
    }
}
