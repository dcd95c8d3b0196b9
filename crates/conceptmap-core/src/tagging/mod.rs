//! Text-tagging capability
//!
//! Entity extraction needs two things from a tagger: spans tagged as
//! person/place/organization names, and spans tagged as nouns. Hosts with a
//! real NLP model implement [`TextTagger`]; [`HeuristicTagger`] is a
//! dependency-free fallback good enough for plain study notes.

mod heuristic;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use heuristic::HeuristicTagger;

/// Tag assigned to a span of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    PersonName,
    PlaceName,
    OrganizationName,
    Noun,
    Other,
}

impl Tag {
    /// Whether this is one of the named-entity tags
    pub fn is_named_entity(&self) -> bool {
        matches!(
            self,
            Self::PersonName | Self::PlaceName | Self::OrganizationName
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonName => "person-name",
            Self::PlaceName => "place-name",
            Self::OrganizationName => "organization-name",
            Self::Noun => "noun",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tagged byte range of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSpan {
    pub span: Range<usize>,
    pub tag: Tag,
}

impl TaggedSpan {
    pub fn new(span: Range<usize>, tag: Tag) -> Self {
        Self { span, tag }
    }

    /// The tagged text, if the span is valid for `text`
    pub fn surface<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.span.clone())
    }
}

/// Opaque text-tagging capability
pub trait TextTagger: Send + Sync {
    /// Tag `text`, returning spans in any order
    ///
    /// Errors are treated as upstream failures and abort map generation.
    fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>>;

    /// Tag applied to the single token at `span`
    ///
    /// The token is tagged in isolation; anything other than one span
    /// covering the whole token yields [`Tag::Other`].
    fn tag_at(&self, text: &str, span: Range<usize>) -> Result<Tag> {
        let token = text.get(span.clone()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "span {}..{} is not a valid range of the text",
                span.start, span.end
            ))
        })?;

        let covering = self
            .tag(token)?
            .into_iter()
            .filter(|t| t.span == (0..token.len()))
            .map(|t| t.tag)
            .find(|tag| *tag != Tag::Other);

        Ok(covering.unwrap_or(Tag::Other))
    }
}
