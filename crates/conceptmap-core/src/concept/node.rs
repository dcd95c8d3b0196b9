//! Concept nodes and edges of the knowledge map

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{EntityType, canonicalize};

/// A named vertex in the concept map
///
/// Name and definition are fixed at construction. Importance and layout
/// coordinates are filled in later by the scorer and the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: String,
    name: String,
    pub entity_type: EntityType,
    definition: String,
    /// Flashcards whose text mentions this concept
    pub related_flashcard_ids: BTreeSet<String>,
    /// Corpus chunks whose text mentions this concept
    pub related_chunk_ids: BTreeSet<String>,
    /// Importance score (0.0 to 1.0)
    pub importance: f32,
    pub layout_x: f64,
    pub layout_y: f64,
}

impl ConceptNode {
    pub fn new(
        name: impl Into<String>,
        entity_type: EntityType,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            entity_type,
            definition: definition.into(),
            related_flashcard_ids: BTreeSet::new(),
            related_chunk_ids: BTreeSet::new(),
            importance: 0.0,
            layout_x: 0.0,
            layout_y: 0.0,
        }
    }

    pub fn with_flashcards(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.related_flashcard_ids.extend(ids);
        self
    }

    pub fn with_chunks(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.related_chunk_ids.extend(ids);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Case-insensitive key of the node name
    pub fn key(&self) -> String {
        canonicalize(&self.name)
    }

    /// Set importance (clamped to 0.0-1.0)
    pub fn set_importance(&mut self, importance: f32) {
        self.importance = if importance.is_nan() {
            0.0
        } else {
            importance.clamp(0.0, 1.0)
        };
    }

    /// Number of supporting records (flashcards plus chunks)
    pub fn related_count(&self) -> usize {
        self.related_flashcard_ids.len() + self.related_chunk_ids.len()
    }

    pub fn position(&self) -> (f64, f64) {
        (self.layout_x, self.layout_y)
    }
}

/// A directed, typed, weighted relationship between two nodes
///
/// Edges reference nodes by id, never by pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEdge {
    pub source_node_id: String,
    pub target_node_id: String,
    /// Free-text label such as "produces"
    pub relationship_type: String,
    /// Strength of the relationship (0.0 to 1.0)
    pub strength: f32,
}

impl ConceptEdge {
    pub fn new(
        source_node_id: impl Into<String>,
        target_node_id: impl Into<String>,
        relationship_type: impl Into<String>,
        strength: f32,
    ) -> Self {
        Self {
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            relationship_type: relationship_type.into(),
            strength: if strength.is_nan() {
                0.5
            } else {
                strength.clamp(0.0, 1.0)
            },
        }
    }

    /// Whether `node_id` is either endpoint
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}
