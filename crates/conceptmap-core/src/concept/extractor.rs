//! Entity extraction from tagged source text
//!
//! Frequency is the only signal: a concept has to be mentioned at least
//! twice to count, and only the most frequent [`MAX_NODES`] survive.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::tagging::{Tag, TextTagger};

use super::entity::{Entity, EntityType, NamedTagTally, canonicalize};
use super::map::MAX_NODES;

/// Minimum occurrences for a string to be treated as a concept
pub const MIN_FREQUENCY: usize = 2;

/// Nouns must be longer than this many characters to be counted
const MIN_NOUN_CHARS: usize = 3;

/// Running tally for one distinct concept string
#[derive(Debug)]
struct Occurrences {
    /// Surface form of the first occurrence
    surface: String,
    /// Order of first appearance in the text
    first_seen: usize,
    count: usize,
    named: NamedTagTally,
}

/// Extracts ranked concept entities from text via a [`TextTagger`]
#[derive(Clone)]
pub struct EntityExtractor {
    tagger: Arc<dyn TextTagger>,
}

impl EntityExtractor {
    pub fn new(tagger: Arc<dyn TextTagger>) -> Self {
        Self { tagger }
    }

    /// Extract entities ranked by descending frequency
    ///
    /// Ties keep first-occurrence order, so the result is deterministic for
    /// a given text and tagger output. Empty text yields an empty list.
    pub fn extract(&self, text: &str) -> Result<Vec<Entity>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut spans = self.tagger.tag(text)?;
        spans.sort_by_key(|s| s.span.start);

        let mut tallies: HashMap<String, Occurrences> = HashMap::new();

        for span in &spans {
            let Some(surface) = span.surface(text).map(str::trim) else {
                debug!(start = span.span.start, end = span.span.end, "Skipping out-of-range span");
                continue;
            };
            if surface.is_empty() || !counts_toward_frequency(surface, span.tag) {
                continue;
            }

            let next_rank = tallies.len();
            let entry = tallies
                .entry(canonicalize(surface))
                .or_insert_with(|| Occurrences {
                    surface: surface.to_string(),
                    first_seen: next_rank,
                    count: 0,
                    named: NamedTagTally::default(),
                });
            entry.count += 1;
            entry.named.record(span.tag);
        }

        let mut retained: Vec<Occurrences> = tallies
            .into_values()
            .filter(|o| o.count >= MIN_FREQUENCY)
            .collect();

        retained.sort_by_key(|o| o.first_seen);
        retained.sort_by(|a, b| b.count.cmp(&a.count));
        retained.truncate(MAX_NODES);

        let entities: Vec<Entity> = retained
            .into_iter()
            .map(|o| {
                let entity_type = EntityType::classify(&o.surface, &o.named, o.count);
                Entity::new(o.surface, entity_type, o.count)
            })
            .collect();

        info!(
            spans = spans.len(),
            entities = entities.len(),
            "Extracted entities from text"
        );

        Ok(entities)
    }
}

/// Named-entity hits always count; nouns only when long enough
fn counts_toward_frequency(surface: &str, tag: Tag) -> bool {
    match tag {
        Tag::PersonName | Tag::PlaceName | Tag::OrganizationName => true,
        Tag::Noun => surface.chars().count() > MIN_NOUN_CHARS,
        Tag::Other => false,
    }
}
