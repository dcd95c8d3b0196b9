//! Source documents, their chunks, and supplementary flashcards

use serde::{Deserialize, Serialize};

/// Paragraphs longer than this are split at sentence boundaries
const MAX_CHUNK_CHARS: usize = 1000;

/// A study document handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub title: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
        }
    }
}

/// A fragment of a source document used as definition context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusChunk {
    /// `<document id>#<index>`
    pub id: String,
    pub document_id: String,
    pub text: String,
}

impl CorpusChunk {
    /// Whether the chunk mentions `name`, ignoring case
    pub fn mentions(&self, name_lower: &str) -> bool {
        self.text.to_lowercase().contains(name_lower)
    }
}

/// A flashcard linked to concepts it mentions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
}

impl Flashcard {
    pub fn new(id: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front: front.into(),
            back: back.into(),
        }
    }

    /// Whether either side mentions `name`, ignoring case
    pub fn mentions(&self, name_lower: &str) -> bool {
        self.front.to_lowercase().contains(name_lower)
            || self.back.to_lowercase().contains(name_lower)
    }
}

/// Split documents into paragraph chunks, preserving document order
pub fn chunk_documents(documents: &[SourceDocument]) -> Vec<CorpusChunk> {
    documents
        .iter()
        .flat_map(|doc| {
            split_paragraphs(&doc.text)
                .into_iter()
                .enumerate()
                .map(|(idx, text)| CorpusChunk {
                    id: format!("{}#{}", doc.id, idx),
                    document_id: doc.id.clone(),
                    text,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Concatenate document texts with blank lines between them
pub fn combined_text(documents: &[SourceDocument]) -> String {
    documents
        .iter()
        .map(|d| d.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
        .into_iter()
        .flat_map(|p| {
            if p.chars().count() > MAX_CHUNK_CHARS {
                split_sentences(&p, MAX_CHUNK_CHARS)
            } else {
                vec![p]
            }
        })
        .collect()
}

/// Pack whole sentences into pieces of at most `max_chars`
///
/// A single sentence longer than `max_chars` becomes its own piece.
fn split_sentences(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for sentence in paragraph.split_inclusive(['.', '!', '?']) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let needed = current.chars().count() + sentence.chars().count() + 1;
        if !current.is_empty() && needed > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
