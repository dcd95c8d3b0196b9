//! Rule-based tagger for when no NLP model is available

use crate::error::Result;

use super::{Tag, TaggedSpan, TextTagger};

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "every", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in", "into", "is",
    "it", "its", "itself", "just", "many", "may", "me", "might", "more", "most", "must", "my",
    "myself", "near", "no", "nor", "not", "of", "off", "on", "once", "one", "only", "onto", "or",
    "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "theirs", "them", "then", "there", "these", "they", "this",
    "those", "through", "thus", "to", "too", "two", "under", "until", "up", "upon", "very", "was",
    "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "within", "without", "would", "you", "your", "yours",
];

const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "sir", "dame", "lord", "lady"];

const LOCATIVES: &[&str] = &["in", "at", "from", "near", "across", "throughout"];

/// Tagger driven by capitalisation, stop words and a few context cues
///
/// - all-caps tokens of two or more letters (`ATP`, `NASA`) → organization
/// - capitalised token after an honorific (`Dr. Curie`) → person
/// - capitalised mid-sentence token after a locative preposition → place
/// - remaining content words → noun
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTagger;

impl HeuristicTagger {
    pub fn new() -> Self {
        Self
    }

    fn classify(token: &str, previous: Option<&str>, sentence_start: bool) -> Tag {
        let lower = token.to_lowercase();
        if STOPWORDS.contains(&lower.as_str()) || HONORIFICS.contains(&lower.as_str()) {
            return Tag::Other;
        }
        if !token.chars().any(char::is_alphabetic) {
            return Tag::Other;
        }

        let uppercase_letters = token.chars().filter(|c| c.is_uppercase()).count();
        let is_acronym = uppercase_letters >= 2
            && token
                .chars()
                .filter(|c| c.is_alphabetic())
                .all(char::is_uppercase);
        if is_acronym {
            return Tag::OrganizationName;
        }

        let capitalised = token.chars().next().is_some_and(char::is_uppercase);
        let previous = previous.map(str::to_lowercase);
        if capitalised {
            if let Some(prev) = previous.as_deref() {
                if HONORIFICS.contains(&prev) {
                    return Tag::PersonName;
                }
                if !sentence_start && LOCATIVES.contains(&prev) {
                    return Tag::PlaceName;
                }
            }
        }

        if lower.ends_with("ly") {
            return Tag::Other;
        }

        Tag::Noun
    }
}

impl TextTagger for HeuristicTagger {
    fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>> {
        let mut spans = Vec::new();
        let mut previous: Option<&str> = None;
        let mut sentence_start = true;

        for (start, end) in tokenize(text) {
            let token = &text[start..end];
            let tag = Self::classify(token, previous, sentence_start);
            spans.push(TaggedSpan::new(start..end, tag));

            let after = text[end..].chars().next();
            let is_honorific = HONORIFICS.contains(&token.to_lowercase().as_str());
            sentence_start = matches!(after, Some('.' | '!' | '?')) && !is_honorific;
            previous = Some(token);
        }

        Ok(spans)
    }
}

/// Byte ranges of word tokens
///
/// A token is a run of alphanumerics, allowing inner hyphens and apostrophes
/// (`cell-wall`, `Newton's`).
fn tokenize(text: &str) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (idx, c) in text.char_indices() {
        let joins = c == '-' || c == '\'';
        if c.is_alphanumeric() || (joins && current.is_some()) {
            let end = idx + c.len_utf8();
            current = Some(match current {
                Some((start, _)) => (start, end),
                None => (idx, end),
            });
        } else if let Some(token) = current.take() {
            tokens.push(token);
        }
    }
    if let Some(token) = current {
        tokens.push(token);
    }

    tokens
        .into_iter()
        .filter_map(|(start, end)| {
            let trimmed = text[start..end].trim_end_matches(['-', '\'']);
            (!trimmed.is_empty()).then(|| (start, start + trimmed.len()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<(String, Tag)> {
        HeuristicTagger::new()
            .tag(text)
            .unwrap()
            .into_iter()
            .map(|s| (text[s.span].to_string(), s.tag))
            .collect()
    }

    fn tag_of(text: &str, word: &str) -> Tag {
        tags(text)
            .into_iter()
            .find(|(w, _)| w == word)
            .map(|(_, t)| t)
            .unwrap()
    }

    #[test]
    fn test_tokenize_inner_punctuation() {
        let text = "The cell-wall and Newton's laws--";
        let words: Vec<&str> = tokenize(text).into_iter().map(|(s, e)| &text[s..e]).collect();
        assert_eq!(words, vec!["The", "cell-wall", "and", "Newton's", "laws"]);
    }

    #[test]
    fn test_stopwords_are_other() {
        assert_eq!(tag_of("The cell divides.", "The"), Tag::Other);
        assert_eq!(tag_of("The cell divides.", "cell"), Tag::Noun);
    }

    #[test]
    fn test_acronym_is_organization() {
        assert_eq!(tag_of("Cells make ATP quickly.", "ATP"), Tag::OrganizationName);
        assert_eq!(tag_of("Cells make ATP quickly.", "quickly"), Tag::Other);
    }

    #[test]
    fn test_honorific_marks_person() {
        let text = "Work by Dr. Curie changed physics.";
        assert_eq!(tag_of(text, "Curie"), Tag::PersonName);
        assert_eq!(tag_of(text, "Dr"), Tag::Other);
    }

    #[test]
    fn test_locative_marks_place() {
        let text = "The samples were collected in Kenya last year.";
        assert_eq!(tag_of(text, "Kenya"), Tag::PlaceName);
    }

    #[test]
    fn test_locative_cue_respects_sentence_boundaries() {
        let text = "Samples came from the lab. In Winter the lab closes.";
        assert_eq!(tag_of(text, "Winter"), Tag::PlaceName);
        let text = "They stay in. Rivers flood.";
        assert_eq!(tag_of(text, "Rivers"), Tag::Noun);
    }

    #[test]
    fn test_numbers_are_other() {
        assert_eq!(tag_of("In 1905 physics changed.", "1905"), Tag::Other);
    }

    #[test]
    fn test_tag_at_single_token() {
        let tagger = HeuristicTagger::new();
        let text = "Cells make ATP.";
        assert_eq!(tagger.tag_at(text, 11..14).unwrap(), Tag::OrganizationName);
        assert_eq!(tagger.tag_at(text, 0..5).unwrap(), Tag::Noun);
    }

    #[test]
    fn test_empty_text() {
        assert!(HeuristicTagger::new().tag("").unwrap().is_empty());
    }
}
