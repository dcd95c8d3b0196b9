//! Concept map domain
//!
//! Turns study text into a laid-out knowledge graph:
//!
//! - **Entity extraction**: recurring concepts ranked by frequency
//! - **Node building**: one node per concept with a generated definition
//! - **Relationship inference**: typed, weighted edges proposed by the LLM
//! - **Importance scoring**: connectivity plus supporting evidence
//! - **Layout**: force-directed 2-D placement
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  SourceDocument → EntityExtractor → ConceptNodeBuilder         │
//! │                                   → RelationshipInferencer     │
//! │                 → ImportanceScorer → LayoutEngine → ConceptMap │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use conceptmap_core::concept::{ConceptMapBuilder, SourceDocument};
//! use conceptmap_core::tagging::HeuristicTagger;
//!
//! let builder = ConceptMapBuilder::new(Arc::new(HeuristicTagger::new()), Arc::new(llm_client));
//! let docs = vec![SourceDocument::new("bio", "Biology", text)];
//! let map = builder.generate_concept_map("Biology", &docs, &[]).await?;
//! println!("{} concepts, {} links", map.nodes.len(), map.edges.len());
//! ```

mod builder;
mod corpus;
mod entity;
mod extractor;
mod layout;
mod map;
mod node;
mod relationship;
mod scorer;
mod service;

pub use builder::{ConceptNodeBuilder, DEFINITION_MAX_TOKENS};
pub use corpus::{CorpusChunk, Flashcard, SourceDocument, chunk_documents, combined_text};
pub use entity::{Entity, EntityType, NamedTagTally, canonicalize};
pub use extractor::{EntityExtractor, MIN_FREQUENCY};
pub use layout::LayoutEngine;
pub use map::{CANVAS_MARGIN, ConceptMap, MAX_NODES};
pub use node::{ConceptEdge, ConceptNode};
pub use relationship::{
    DEFAULT_STRENGTH, ProposedRelationship, RELATIONSHIP_MAX_TOKENS, RelationshipInferencer,
    parse_relationships,
};
pub use scorer::ImportanceScorer;
pub use service::ConceptMapBuilder;
