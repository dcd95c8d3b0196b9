//! Relationship inference between extracted entities
//!
//! The completion service is asked for pipe-delimited lines:
//!
//! ```text
//! SOURCE | RELATION | TARGET | STRENGTH
//! ```
//!
//! Parsing is a chain of filters. Lines that are malformed, or that name an
//! entity we did not extract, are dropped without error; only a failure of
//! the completion call itself is reported.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::llm::CompletionService;

use super::builder::truncate_chars;
use super::entity::{Entity, canonicalize};

/// Source text included in the relationship prompt
const MAX_PROMPT_TEXT_CHARS: usize = 2000;

/// Completion budget for the relationship listing
pub const RELATIONSHIP_MAX_TOKENS: usize = 400;

/// Strength used when the model's value does not parse
pub const DEFAULT_STRENGTH: f32 = 0.5;

/// A relationship proposed by the completion service
///
/// `source` and `target` carry the matched entity's own spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedRelationship {
    pub source: String,
    pub relationship_type: String,
    pub target: String,
    pub strength: f32,
}

/// Asks the completion service how extracted entities relate
#[derive(Clone)]
pub struct RelationshipInferencer {
    completion: Arc<dyn CompletionService>,
}

impl RelationshipInferencer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Propose relationships among `entities` using one completion call
    pub async fn infer_relationships(
        &self,
        entities: &[Entity],
        text: &str,
    ) -> Result<Vec<ProposedRelationship>> {
        let prompt = build_relationship_prompt(entities, text);
        let response = self
            .completion
            .complete(&prompt, RELATIONSHIP_MAX_TOKENS)
            .await?;

        let relationships = parse_relationships(&response, entities);

        info!(
            entities = entities.len(),
            relationships = relationships.len(),
            "Inferred relationships"
        );

        Ok(relationships)
    }
}

fn build_relationship_prompt(entities: &[Entity], text: &str) -> String {
    let names = entities
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Identify relationships between these concepts from a study text.

CONCEPTS: {names}

TEXT:
{text}

Use only the concepts listed above. Output one relationship per line in exactly this format:
SOURCE | RELATION | TARGET | STRENGTH

RELATION is a short verb phrase (e.g. "produces", "is part of").
STRENGTH is a number between 0.0 and 1.0."#,
        text = truncate_chars(text, MAX_PROMPT_TEXT_CHARS),
    )
}

/// Parse completion output into relationships between known entities
///
/// Results keep the order in which lines appear in `response`.
pub fn parse_relationships(response: &str, entities: &[Entity]) -> Vec<ProposedRelationship> {
    let known: HashMap<String, &str> = entities
        .iter()
        .map(|e| (e.key(), e.name.as_str()))
        .collect();

    let mut relationships = Vec::new();
    let mut dropped = 0usize;

    for line in response.lines().filter(|l| l.contains('|')) {
        match parse_line(line, &known) {
            Some(rel) => relationships.push(rel),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "Discarded malformed or unknown-entity relationship lines");
    }

    relationships
}

fn parse_line(line: &str, known: &HashMap<String, &str>) -> Option<ProposedRelationship> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 4 {
        return None;
    }

    let source = known.get(&canonicalize(fields[0]))?;
    let target = known.get(&canonicalize(fields[2]))?;

    Some(ProposedRelationship {
        source: source.to_string(),
        relationship_type: fields[1].to_string(),
        target: target.to_string(),
        strength: parse_strength(fields[3]),
    })
}

/// Parse a strength value, falling back to [`DEFAULT_STRENGTH`]
///
/// Parsed values are clamped to 0.0-1.0.
fn parse_strength(field: &str) -> f32 {
    match field.parse::<f32>() {
        Ok(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => DEFAULT_STRENGTH,
    }
}
