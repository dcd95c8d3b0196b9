//! The concept map aggregate

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::entity::canonicalize;
use super::node::{ConceptEdge, ConceptNode};

/// Hard ceiling on nodes per map; layout cost is quadratic in node count
pub const MAX_NODES: usize = 30;

/// Distance kept between laid-out nodes and the canvas edge
pub const CANVAS_MARGIN: f64 = 50.0;

/// Root aggregate owning every node and edge of one generated map
///
/// Nodes are kept in entity rank order (descending frequency).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptMap {
    pub id: String,
    pub title: String,
    pub source_document_ids: Vec<String>,
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
    pub created_at: DateTime<Utc>,
}

impl ConceptMap {
    /// Create an empty map
    pub fn new(title: impl Into<String>, source_document_ids: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            source_document_ids,
            nodes: Vec::new(),
            edges: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<ConceptNode>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_edges(mut self, edges: Vec<ConceptEdge>) -> Self {
        self.edges = edges;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ConceptNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by name, ignoring case
    pub fn node_by_name(&self, name: &str) -> Option<&ConceptNode> {
        let key = canonicalize(name);
        self.nodes.iter().find(|n| n.key() == key)
    }

    /// Edges where `node_id` is source or target
    pub fn edges_for<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ConceptEdge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    /// Index of each node id in `nodes`
    pub fn index_by_id(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.as_str(), idx))
            .collect()
    }

    /// Check the structural invariants
    ///
    /// - at most [`MAX_NODES`] nodes
    /// - node names unique ignoring case
    /// - importance and strength within 0.0-1.0
    /// - every edge endpoint resolves to a node in this map
    pub fn validate(&self) -> Result<()> {
        if self.nodes.len() > MAX_NODES {
            return Err(Error::InvalidInput(format!(
                "map has {} nodes, limit is {}",
                self.nodes.len(),
                MAX_NODES
            )));
        }

        let mut names = HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.key()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate node name '{}'",
                    node.name()
                )));
            }
            if !(0.0..=1.0).contains(&node.importance) {
                return Err(Error::InvalidInput(format!(
                    "node '{}' importance {} outside 0.0-1.0",
                    node.name(),
                    node.importance
                )));
            }
        }

        let index = self.index_by_id();
        for edge in &self.edges {
            for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                if !index.contains_key(endpoint.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "edge '{}' references unknown node '{}'",
                        edge.relationship_type, endpoint
                    )));
                }
            }
            if !(0.0..=1.0).contains(&edge.strength) {
                return Err(Error::InvalidInput(format!(
                    "edge '{}' strength {} outside 0.0-1.0",
                    edge.relationship_type, edge.strength
                )));
            }
        }

        Ok(())
    }

    /// Check every node lies inside a `width` x `height` canvas less the margin
    pub fn validate_layout(&self, width: f64, height: f64) -> Result<()> {
        let (x_min, x_max) = margin_range(width);
        let (y_min, y_max) = margin_range(height);

        for node in &self.nodes {
            let (x, y) = node.position();
            if !(x_min..=x_max).contains(&x) || !(y_min..=y_max).contains(&y) {
                return Err(Error::InvalidInput(format!(
                    "node '{}' at ({:.1}, {:.1}) is outside the canvas",
                    node.name(),
                    x,
                    y
                )));
            }
        }
        Ok(())
    }
}

/// Allowed coordinate range along one axis of the canvas
///
/// Collapses to the centre when the canvas is narrower than both margins.
pub fn margin_range(extent: f64) -> (f64, f64) {
    inset_range(extent, CANVAS_MARGIN)
}

/// `[inset, extent - inset]`, or the centre point when that range is empty
pub fn inset_range(extent: f64, inset: f64) -> (f64, f64) {
    let (lo, hi) = (inset, extent - inset);
    if hi >= lo {
        (lo, hi)
    } else {
        let mid = extent / 2.0;
        (mid, mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::entity::EntityType;

    fn sample_map() -> ConceptMap {
        let a = ConceptNode::new("Mitochondria", EntityType::Concept, "Powerhouse");
        let b = ConceptNode::new("ATP", EntityType::Organization, "Energy");
        let edge = ConceptEdge::new(&a.id, &b.id, "produces", 0.9);
        ConceptMap::new("Biology", vec!["doc-1".into()])
            .with_nodes(vec![a, b])
            .with_edges(vec![edge])
    }

    #[test]
    fn test_lookup() {
        let map = sample_map();
        let node = map.node_by_name("mitochondria").unwrap();
        assert_eq!(node.name(), "Mitochondria");
        assert!(map.node(&node.id).is_some());
        assert_eq!(map.edges_for(&node.id).count(), 1);
        assert!(map.node_by_name("nucleus").is_none());
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_map().validate().is_ok());
        assert!(ConceptMap::new("empty", vec![]).validate().is_ok());
    }

    #[test]
    fn test_validate_dangling_edge() {
        let mut map = sample_map();
        map.edges.push(ConceptEdge::new("ghost", &map.nodes[0].id, "haunts", 0.5));
        let err = map.validate().unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let mut map = sample_map();
        map.nodes
            .push(ConceptNode::new("atp", EntityType::Concept, "again"));
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_validate_node_cap() {
        let nodes = (0..=MAX_NODES)
            .map(|i| ConceptNode::new(format!("concept {i}"), EntityType::Concept, "x"))
            .collect();
        let map = ConceptMap::new("big", vec![]).with_nodes(nodes);
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_validate_layout() {
        let mut map = sample_map();
        for node in &mut map.nodes {
            node.layout_x = 500.0;
            node.layout_y = 950.0;
        }
        assert!(map.validate_layout(1000.0, 1000.0).is_ok());

        map.nodes[1].layout_x = 20.0;
        assert!(map.validate_layout(1000.0, 1000.0).is_err());
    }

    #[test]
    fn test_inset_range_degenerate_canvas() {
        assert_eq!(inset_range(1000.0, 100.0), (100.0, 900.0));
        assert_eq!(inset_range(80.0, 50.0), (40.0, 40.0));
    }

    #[test]
    fn test_serialization_roundtrip_keeps_order() {
        let map = sample_map();
        let json = serde_json::to_string(&map).unwrap();
        let back: ConceptMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes, map.nodes);
        assert_eq!(back.edges, map.edges);
    }
}
