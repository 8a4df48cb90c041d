/// Link reference definitions collected during the block phase
use crate::escaping::normalize_label;
use crate::source::SourceSpan;
use log::trace;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// `[label]: destination "title"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReferenceDefinition {
    pub label: String,
    pub destination: String,
    pub title: Option<String>,
    pub source_spans: Vec<SourceSpan>,
}

/// Definitions keyed by normalised label. The first definition of a label wins.
#[derive(Debug, Clone, Default)]
pub struct LinkReferenceDefinitions {
    definitions: HashMap<String, LinkReferenceDefinition>,
}

impl LinkReferenceDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, definition: LinkReferenceDefinition) {
        match self.definitions.entry(normalize_label(&definition.label)) {
            Entry::Occupied(existing) => {
                trace!("ignoring duplicate link reference definition [{}]", existing.key());
            }
            Entry::Vacant(slot) => {
                trace!("link reference definition [{}] -> {}", slot.key(), definition.destination);
                slot.insert(definition);
            }
        }
    }

    /// Look up a label as written; it is normalised before the lookup.
    pub fn get(&self, label: &str) -> Option<&LinkReferenceDefinition> {
        self.definitions.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkReferenceDefinition> {
        self.definitions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(label: &str, destination: &str) -> LinkReferenceDefinition {
        LinkReferenceDefinition {
            label: label.to_string(),
            destination: destination.to_string(),
            title: None,
            source_spans: Vec::new(),
        }
    }

    #[test]
    fn first_definition_wins() {
        let mut definitions = LinkReferenceDefinitions::new();
        definitions.add(definition("Foo", "/first"));
        definitions.add(definition("FOO", "/second"));
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions.get("foo").map(|d| d.destination.as_str()), Some("/first"));
    }

    #[test]
    fn lookup_normalises_whitespace() {
        let mut definitions = LinkReferenceDefinitions::new();
        definitions.add(definition("foo  bar", "/url"));
        assert!(definitions.get(" Foo\nBar ").is_some());
        assert!(definitions.get("foobar").is_none());
    }
}
