//! Node importance scoring

use std::collections::HashMap;

use super::map::ConceptMap;

/// Connections needed for a full connectivity score
const CONNECTION_SATURATION: f32 = 5.0;

/// Related records needed for a full evidence score
const RELATED_SATURATION: f32 = 10.0;

/// Scores each node from graph connectivity and supporting evidence
///
/// `importance = (min(1, connections / 5) + min(1, related / 10)) / 2`,
/// where `related` sums the flashcard and chunk set sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportanceScorer;

impl ImportanceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Overwrite `importance` on every node of `map`
    pub fn score(&self, map: &mut ConceptMap) {
        let mut connections: HashMap<String, usize> = HashMap::new();
        for edge in &map.edges {
            *connections.entry(edge.source_node_id.clone()).or_default() += 1;
            if edge.target_node_id != edge.source_node_id {
                *connections.entry(edge.target_node_id.clone()).or_default() += 1;
            }
        }

        for node in &mut map.nodes {
            let connection_count = connections.get(&node.id).copied().unwrap_or(0);
            node.set_importance(importance(connection_count, node.related_count()));
        }
    }
}

fn importance(connection_count: usize, related_count: usize) -> f32 {
    let connection_score = (connection_count as f32 / CONNECTION_SATURATION).min(1.0);
    let related_score = (related_count as f32 / RELATED_SATURATION).min(1.0);
    (connection_score + related_score) / 2.0
}
