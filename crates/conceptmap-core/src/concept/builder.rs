//! Concept node construction with LLM-written definitions

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::llm::CompletionService;

use super::corpus::{CorpusChunk, Flashcard};
use super::entity::Entity;
use super::node::ConceptNode;

/// Number of excerpts gathered as definition context
const MAX_EXCERPTS: usize = 3;

/// Each excerpt is cut to this many characters before joining
const MAX_EXCERPT_CHARS: usize = 300;

/// Cap on the joined context sent with the definition prompt
const MAX_CONTEXT_CHARS: usize = 800;

/// Completion budget for a definition
pub const DEFINITION_MAX_TOKENS: usize = 100;

/// Builds one [`ConceptNode`] per entity
#[derive(Clone)]
pub struct ConceptNodeBuilder {
    completion: Arc<dyn CompletionService>,
}

impl ConceptNodeBuilder {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Build the node for `entity`
    ///
    /// Without any mentioning excerpt the entity name doubles as the
    /// definition and no completion request is made. A failed completion
    /// request is returned as an error.
    pub async fn build_node(
        &self,
        entity: &Entity,
        corpus: &[CorpusChunk],
        flashcards: &[Flashcard],
    ) -> Result<ConceptNode> {
        let needle = entity.key();

        let mentioning: Vec<&CorpusChunk> = corpus.iter().filter(|c| c.mentions(&needle)).collect();

        let definition = match build_context(&mentioning) {
            Some(context) => {
                let prompt = definition_prompt(&entity.name, &context);
                let response = self.completion.complete(&prompt, DEFINITION_MAX_TOKENS).await?;
                let definition = response.trim();
                if definition.is_empty() {
                    entity.name.clone()
                } else {
                    definition.to_string()
                }
            }
            None => {
                debug!(entity = %entity.name, "No context excerpts, using name as definition");
                entity.name.clone()
            }
        };

        let chunk_ids = mentioning.iter().map(|c| c.id.clone());
        let flashcard_ids = flashcards
            .iter()
            .filter(|f| f.mentions(&needle))
            .map(|f| f.id.clone());

        Ok(ConceptNode::new(&entity.name, entity.entity_type, definition)
            .with_chunks(chunk_ids)
            .with_flashcards(flashcard_ids))
    }
}

/// Join the first few excerpts, or `None` when there are none
fn build_context(mentioning: &[&CorpusChunk]) -> Option<String> {
    if mentioning.is_empty() {
        return None;
    }

    let excerpts: Vec<String> = mentioning
        .iter()
        .take(MAX_EXCERPTS)
        .map(|c| truncate_chars(c.text.trim(), MAX_EXCERPT_CHARS))
        .collect();

    Some(truncate_chars(&excerpts.join("\n\n"), MAX_CONTEXT_CHARS))
}

fn definition_prompt(name: &str, context: &str) -> String {
    format!(
        "Define \"{name}\" in 1-2 sentences given this context.\n\n\
         CONTEXT:\n{context}\n\n\
         Reply with the definition only."
    )
}

/// Truncate to at most `max_chars` characters on a char boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::entity::EntityType;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records prompts and replies with a fixed answer
    #[derive(Default)]
    struct RecordingCompletion {
        reply: String,
        prompts: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl CompletionService for RecordingCompletion {
        async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_tokens));
            Ok(self.reply.clone())
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionService for FailingCompletion {
        async fn complete(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
            Err(Error::LLMError("service unavailable".into()))
        }
    }

    fn chunk(id: &str, text: &str) -> CorpusChunk {
        CorpusChunk {
            id: id.into(),
            document_id: "doc".into(),
            text: text.into(),
        }
    }

    fn atp() -> Entity {
        Entity::new("ATP", EntityType::Organization, 2)
    }

    #[tokio::test]
    async fn test_definition_from_completion() {
        let completion = Arc::new(RecordingCompletion {
            reply: "  ATP stores energy for the cell.\n".into(),
            ..Default::default()
        });
        let builder = ConceptNodeBuilder::new(completion.clone());
        let corpus = vec![chunk("doc#0", "Mitochondria produces atp."), chunk("doc#1", "Nothing here.")];

        let node = builder.build_node(&atp(), &corpus, &[]).await.unwrap();

        assert_eq!(node.definition(), "ATP stores energy for the cell.");
        assert_eq!(node.entity_type, EntityType::Organization);
        assert_eq!(node.related_chunk_ids.iter().collect::<Vec<_>>(), vec!["doc#0"]);

        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, DEFINITION_MAX_TOKENS);
        assert!(prompts[0].0.contains("\"ATP\""));
        assert!(prompts[0].0.contains("Mitochondria produces atp."));
    }

    #[tokio::test]
    async fn test_no_context_falls_back_to_name() {
        let completion = Arc::new(RecordingCompletion::default());
        let builder = ConceptNodeBuilder::new(completion.clone());

        let node = builder
            .build_node(&atp(), &[chunk("doc#0", "Unrelated text.")], &[])
            .await
            .unwrap();

        assert_eq!(node.definition(), "ATP");
        assert!(node.related_chunk_ids.is_empty());
        assert!(completion.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_reply_falls_back_to_name() {
        let completion = Arc::new(RecordingCompletion {
            reply: "   ".into(),
            ..Default::default()
        });
        let builder = ConceptNodeBuilder::new(completion);
        let node = builder
            .build_node(&atp(), &[chunk("doc#0", "ATP is made here.")], &[])
            .await
            .unwrap();
        assert_eq!(node.definition(), "ATP");
    }

    #[tokio::test]
    async fn test_context_uses_first_three_excerpts_and_caps_length() {
        let completion = Arc::new(RecordingCompletion {
            reply: "def".into(),
            ..Default::default()
        });
        let builder = ConceptNodeBuilder::new(completion.clone());
        let corpus: Vec<CorpusChunk> = (0..5)
            .map(|i| chunk(&format!("doc#{i}"), &format!("excerpt{i} ATP {}", "x".repeat(400))))
            .collect();

        let node = builder.build_node(&atp(), &corpus, &[]).await.unwrap();
        assert_eq!(node.related_chunk_ids.len(), 5);

        let prompts = completion.prompts.lock().unwrap();
        let prompt = &prompts[0].0;
        assert!(prompt.contains("excerpt0"));
        assert!(prompt.contains("excerpt2"));
        assert!(!prompt.contains("excerpt3"));
    }

    #[tokio::test]
    async fn test_flashcards_linked_by_mention() {
        let completion = Arc::new(RecordingCompletion::default());
        let builder = ConceptNodeBuilder::new(completion);
        let cards = vec![
            Flashcard::new("c1", "What does the cell make?", "ATP"),
            Flashcard::new("c2", "Capital of France?", "Paris"),
        ];

        let node = builder.build_node(&atp(), &[], &cards).await.unwrap();
        assert_eq!(node.related_flashcard_ids.iter().collect::<Vec<_>>(), vec!["c1"]);
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let builder = ConceptNodeBuilder::new(Arc::new(FailingCompletion));
        let result = builder
            .build_node(&atp(), &[chunk("doc#0", "ATP here")], &[])
            .await;
        assert!(matches!(result, Err(Error::LLMError(_))));
    }

    #[test]
    fn test_build_context_caps_total() {
        let long = chunk("a", &"y".repeat(1000));
        let refs = vec![&long, &long, &long];
        let context = build_context(&refs).unwrap();
        assert_eq!(context.chars().count(), MAX_CONTEXT_CHARS);
        assert!(build_context(&[]).is_none());
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
