//! Concept map generation service
//!
//! Runs the whole pipeline for one set of documents:
//! 1. Extract ranked entities from the combined text
//! 2. Build one node per entity (definitions requested concurrently)
//! 3. Infer relationships with a single completion call
//! 4. Resolve relationships to edges, dropping any with a missing endpoint
//! 5. Score importance, then lay the graph out

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::config::{Config, GenerationConfig, LayoutConfig};
use crate::error::Result;
use crate::llm::CompletionService;
use crate::tagging::TextTagger;

use super::builder::ConceptNodeBuilder;
use super::corpus::{Flashcard, SourceDocument, chunk_documents, combined_text};
use super::entity::canonicalize;
use super::extractor::EntityExtractor;
use super::layout::LayoutEngine;
use super::map::ConceptMap;
use super::node::{ConceptEdge, ConceptNode};
use super::relationship::{ProposedRelationship, RelationshipInferencer};
use super::scorer::ImportanceScorer;

/// Builds complete concept maps from study documents
///
/// Each call to [`generate_concept_map`](Self::generate_concept_map) works on
/// its own entity, node and edge set; the builder itself can be shared.
#[derive(Clone)]
pub struct ConceptMapBuilder {
    extractor: EntityExtractor,
    node_builder: ConceptNodeBuilder,
    inferencer: RelationshipInferencer,
    scorer: ImportanceScorer,
    layout: LayoutEngine,
    generation: GenerationConfig,
}

impl ConceptMapBuilder {
    /// Create a builder with default generation and layout settings
    pub fn new(tagger: Arc<dyn TextTagger>, completion: Arc<dyn CompletionService>) -> Self {
        Self {
            extractor: EntityExtractor::new(tagger),
            node_builder: ConceptNodeBuilder::new(completion.clone()),
            inferencer: RelationshipInferencer::new(completion),
            scorer: ImportanceScorer::new(),
            layout: LayoutEngine::default(),
            generation: GenerationConfig::default(),
        }
    }

    /// Create a builder using the generation and layout sections of `config`
    pub fn from_config(
        config: &Config,
        tagger: Arc<dyn TextTagger>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self::new(tagger, completion)
            .with_generation_config(config.generation.clone())
            .with_layout_config(config.layout.clone())
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_layout_config(mut self, layout: LayoutConfig) -> Self {
        self.layout = LayoutEngine::new(layout);
        self
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        self.layout.config()
    }

    /// Generate a map titled `title` from `documents`
    ///
    /// Text without any recurring concept yields an empty map. A tagging or
    /// completion failure fails the whole call; no partial map is returned.
    pub async fn generate_concept_map(
        &self,
        title: &str,
        documents: &[SourceDocument],
        flashcards: &[Flashcard],
    ) -> Result<ConceptMap> {
        let document_ids = documents.iter().map(|d| d.id.clone()).collect();
        let map = ConceptMap::new(title, document_ids);

        info!(
            map_id = %map.id,
            documents = documents.len(),
            flashcards = flashcards.len(),
            "Generating concept map"
        );

        let text = combined_text(documents);
        let entities = self.extractor.extract(&text)?;
        if entities.is_empty() {
            info!(map_id = %map.id, "No recurring concepts found, returning empty map");
            return Ok(map);
        }

        let chunks = chunk_documents(documents);
        let concurrency = self.generation.definition_concurrency.max(1);

        // `buffered` yields in input order, so nodes keep entity rank order
        let nodes: Vec<ConceptNode> = stream::iter(
            entities
                .iter()
                .map(|entity| self.node_builder.build_node(entity, &chunks, flashcards)),
        )
        .buffered(concurrency)
        .try_collect()
        .await?;

        debug!(nodes = nodes.len(), concurrency, "Built concept nodes");

        let proposed = self.inferencer.infer_relationships(&entities, &text).await?;
        let edges = resolve_edges(&nodes, proposed);

        let mut map = map.with_nodes(nodes).with_edges(edges);
        self.scorer.score(&mut map);
        self.layout.layout(&mut map);

        info!(
            map_id = %map.id,
            nodes = map.nodes.len(),
            edges = map.edges.len(),
            "Concept map generated"
        );

        Ok(map)
    }
}

/// Turn proposed relationships into edges between existing nodes
fn resolve_edges(nodes: &[ConceptNode], proposed: Vec<ProposedRelationship>) -> Vec<ConceptEdge> {
    let ids: HashMap<String, &str> = nodes.iter().map(|n| (n.key(), n.id.as_str())).collect();
    let total = proposed.len();

    let edges: Vec<ConceptEdge> = proposed
        .into_iter()
        .filter_map(|rel| {
            let source = ids.get(&canonicalize(&rel.source))?;
            let target = ids.get(&canonicalize(&rel.target))?;
            Some(ConceptEdge::new(
                *source,
                *target,
                rel.relationship_type,
                rel.strength,
            ))
        })
        .collect();

    if edges.len() < total {
        warn!(
            dropped = total - edges.len(),
            "Dropped relationships without a matching node"
        );
    }

    edges
}
