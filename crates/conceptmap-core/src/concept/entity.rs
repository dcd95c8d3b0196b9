//! Extraction-time entities and their type classification

use serde::{Deserialize, Serialize};

use crate::tagging::Tag;

/// A candidate concept found in source text
///
/// Entities are ephemeral: they exist between extraction and node
/// construction and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Surface form of the first occurrence
    pub name: String,
    pub entity_type: EntityType,
    /// Number of tagged occurrences, always at least 2
    pub frequency: usize,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: EntityType, frequency: usize) -> Self {
        Self {
            name: name.into(),
            entity_type,
            frequency,
        }
    }

    /// Case-insensitive key used for deduplication and name matching
    pub fn key(&self) -> String {
        canonicalize(&self.name)
    }

    /// Whether `other` names this entity, ignoring case and surrounding whitespace
    pub fn matches_name(&self, other: &str) -> bool {
        self.key() == canonicalize(other)
    }
}

/// Canonical form of a concept name: trimmed and lowercased
pub fn canonicalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Closed set of concept types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Place,
    Organization,
    /// Something that happens (e.g., "photosynthesis", "fermentation")
    Process,
    /// A discipline (e.g., "biology", "cartography")
    Field,
    Concept,
}

/// Suffix heuristics, checked in order against the lowercased name
const SUFFIX_RULES: &[(&str, EntityType)] = &[
    ("tion", EntityType::Process),
    ("sis", EntityType::Process),
    ("ment", EntityType::Process),
    ("ology", EntityType::Field),
    ("graphy", EntityType::Field),
];

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Place => "place",
            Self::Organization => "organization",
            Self::Process => "process",
            Self::Field => "field",
            Self::Concept => "concept",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "person" => Some(Self::Person),
            "place" => Some(Self::Place),
            "organization" | "organisation" | "org" => Some(Self::Organization),
            "process" => Some(Self::Process),
            "field" => Some(Self::Field),
            "concept" => Some(Self::Concept),
            _ => None,
        }
    }

    /// Direct mapping from a named-entity tag
    pub fn from_tag(tag: Tag) -> Option<Self> {
        match tag {
            Tag::PersonName => Some(Self::Person),
            Tag::PlaceName => Some(Self::Place),
            Tag::OrganizationName => Some(Self::Organization),
            Tag::Noun | Tag::Other => None,
        }
    }

    /// Type implied by the name's suffix, defaulting to `Concept`
    pub fn from_suffix(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        SUFFIX_RULES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, ty)| *ty)
            .unwrap_or(Self::Concept)
    }

    /// Classify from tag tallies
    ///
    /// When named-entity tags make up a strict majority of `total`
    /// occurrences, the most frequent named tag decides (person, then place,
    /// then organization on ties). Otherwise the suffix rules apply.
    pub fn classify(name: &str, tallies: &NamedTagTally, total: usize) -> Self {
        if tallies.total() * 2 > total {
            if let Some(tag) = tallies.dominant() {
                if let Some(ty) = Self::from_tag(tag) {
                    return ty;
                }
            }
        }
        Self::from_suffix(name)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Occurrence counts per named-entity tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamedTagTally {
    pub person: usize,
    pub place: usize,
    pub organization: usize,
}

impl NamedTagTally {
    pub fn record(&mut self, tag: Tag) {
        match tag {
            Tag::PersonName => self.person += 1,
            Tag::PlaceName => self.place += 1,
            Tag::OrganizationName => self.organization += 1,
            Tag::Noun | Tag::Other => {}
        }
    }

    pub fn total(&self) -> usize {
        self.person + self.place + self.organization
    }

    fn dominant(&self) -> Option<Tag> {
        let ranked = [
            (self.person, Tag::PersonName),
            (self.place, Tag::PlaceName),
            (self.organization, Tag::OrganizationName),
        ];
        // max_by_key keeps the last maximum, so scan in reverse for first-wins ties
        ranked
            .into_iter()
            .rev()
            .filter(|(count, _)| *count > 0)
            .max_by_key(|(count, _)| *count)
            .map(|(_, tag)| tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_rules() {
        assert_eq!(EntityType::from_suffix("Photosynthesis"), EntityType::Process);
        assert_eq!(EntityType::from_suffix("fermentation"), EntityType::Process);
        assert_eq!(EntityType::from_suffix("development"), EntityType::Process);
        assert_eq!(EntityType::from_suffix("Biology"), EntityType::Field);
        assert_eq!(EntityType::from_suffix("cartography"), EntityType::Field);
        assert_eq!(EntityType::from_suffix("cell"), EntityType::Concept);
    }

    #[test]
    fn test_majority_named_tag_wins() {
        let tally = NamedTagTally {
            person: 0,
            place: 3,
            organization: 0,
        };
        assert_eq!(EntityType::classify("Nation", &tally, 4), EntityType::Place);
    }

    #[test]
    fn test_minority_named_tag_falls_back_to_suffix() {
        let tally = NamedTagTally {
            person: 1,
            place: 0,
            organization: 0,
        };
        assert_eq!(EntityType::classify("Nation", &tally, 2), EntityType::Process);
        assert_eq!(EntityType::classify("Curie", &tally, 3), EntityType::Concept);
    }

    #[test]
    fn test_tie_between_named_tags_prefers_person() {
        let tally = NamedTagTally {
            person: 2,
            place: 2,
            organization: 1,
        };
        assert_eq!(EntityType::classify("Jordan", &tally, 5), EntityType::Person);

        let tally = NamedTagTally {
            person: 0,
            place: 2,
            organization: 2,
        };
        assert_eq!(EntityType::classify("Georgia", &tally, 4), EntityType::Place);
    }

    #[test]
    fn test_record_ignores_non_named_tags() {
        let mut tally = NamedTagTally::default();
        tally.record(Tag::Noun);
        tally.record(Tag::Other);
        tally.record(Tag::OrganizationName);
        assert_eq!(tally.total(), 1);
        assert_eq!(tally.organization, 1);
    }

    #[test]
    fn test_entity_name_matching() {
        let entity = Entity::new("Mitochondria", EntityType::Concept, 2);
        assert!(entity.matches_name("mitochondria"));
        assert!(entity.matches_name("  MITOCHONDRIA "));
        assert!(!entity.matches_name("mitochondrion"));
        assert_eq!(entity.key(), "mitochondria");
    }

    #[test]
    fn test_entity_type_parse_roundtrip() {
        for ty in [
            EntityType::Person,
            EntityType::Place,
            EntityType::Organization,
            EntityType::Process,
            EntityType::Field,
            EntityType::Concept,
        ] {
            assert_eq!(EntityType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(EntityType::parse("gadget"), None);
    }
}
