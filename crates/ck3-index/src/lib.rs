//! Workspace-wide symbol index for fast cross-file lookups.
//!
//! The index is keyed first by symbol category, then by name, to a list of
//! `{uri, range, attributes}` entries. Each category also carries a reverse
//! map from URI to the names that URI contributed, so removing one document's
//! contributions is proportional to what it contributed, not to index size.
//!
//! Updates use replace semantics: a document's prior contributions are erased
//! before its new ones are inserted, so closing or re-indexing a file can
//! never leave ghost entries behind. The whole structure sits behind one
//! reader/writer lock; `replace` is atomic with respect to readers.

#![deny(unsafe_code)]

pub mod extract;
pub mod localization;

pub use extract::{FileKind, extract_contributions, file_kind_for_path};
pub use localization::scan_localization;

use ck3_ast::Range;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// The categories the index tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolCategory {
    Namespaces,
    Events,
    ScriptedEffects,
    ScriptedTriggers,
    ScriptedLists,
    ScriptValues,
    OnActions,
    SavedScopes,
    Localization,
    CharacterFlags,
    CharacterInteractions,
    Modifiers,
    OpinionModifiers,
    ScriptedGuis,
    Traits,
}

impl SymbolCategory {
    /// All categories, in stats order.
    pub const ALL: [SymbolCategory; 15] = [
        SymbolCategory::Namespaces,
        SymbolCategory::Events,
        SymbolCategory::ScriptedEffects,
        SymbolCategory::ScriptedTriggers,
        SymbolCategory::ScriptedLists,
        SymbolCategory::ScriptValues,
        SymbolCategory::OnActions,
        SymbolCategory::SavedScopes,
        SymbolCategory::Localization,
        SymbolCategory::CharacterFlags,
        SymbolCategory::CharacterInteractions,
        SymbolCategory::Modifiers,
        SymbolCategory::OpinionModifiers,
        SymbolCategory::ScriptedGuis,
        SymbolCategory::Traits,
    ];

    /// Snake-case name used in stats payloads and command results.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolCategory::Namespaces => "namespaces",
            SymbolCategory::Events => "events",
            SymbolCategory::ScriptedEffects => "scripted_effects",
            SymbolCategory::ScriptedTriggers => "scripted_triggers",
            SymbolCategory::ScriptedLists => "scripted_lists",
            SymbolCategory::ScriptValues => "script_values",
            SymbolCategory::OnActions => "on_actions",
            SymbolCategory::SavedScopes => "saved_scopes",
            SymbolCategory::Localization => "localization",
            SymbolCategory::CharacterFlags => "character_flags",
            SymbolCategory::CharacterInteractions => "character_interactions",
            SymbolCategory::Modifiers => "modifiers",
            SymbolCategory::OpinionModifiers => "opinion_modifiers",
            SymbolCategory::ScriptedGuis => "scripted_guis",
            SymbolCategory::Traits => "traits",
        }
    }
}

/// One indexed occurrence of a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Document the symbol was defined in.
    pub uri: String,
    /// Definition range within that document.
    pub range: Range,
    /// Category-specific attributes (e.g. `event` for saved scopes,
    /// `title`/`desc` keys for events).
    pub attributes: Vec<(String, String)>,
}

impl IndexEntry {
    /// Attribute lookup by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// A symbol a document contributes to one category.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub category: SymbolCategory,
    pub name: String,
    pub range: Range,
    pub attributes: Vec<(String, String)>,
}

impl Contribution {
    /// Attribute lookup by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct CategoryMap {
    by_name: FxHashMap<String, Vec<IndexEntry>>,
    by_uri: FxHashMap<String, FxHashSet<String>>,
}

impl CategoryMap {
    fn remove_uri(&mut self, uri: &str) {
        let Some(names) = self.by_uri.remove(uri) else { return };
        for name in names {
            if let Some(entries) = self.by_name.get_mut(&name) {
                entries.retain(|e| e.uri != uri);
                if entries.is_empty() {
                    self.by_name.remove(&name);
                }
            }
        }
    }

    fn insert(&mut self, uri: &str, name: String, entry: IndexEntry) {
        self.by_uri.entry(uri.to_string()).or_default().insert(name.clone());
        self.by_name.entry(name).or_default().push(entry);
    }
}

/// The cross-file symbol database.
pub struct DocumentIndex {
    categories: RwLock<FxHashMap<SymbolCategory, CategoryMap>>,
}

impl Default for DocumentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { categories: RwLock::new(FxHashMap::default()) }
    }

    /// Atomically drop every prior contribution from `uri` across all
    /// categories, then insert `contributions`.
    pub fn replace(&self, uri: &str, contributions: Vec<Contribution>) {
        let mut categories = self.categories.write();
        for map in categories.values_mut() {
            map.remove_uri(uri);
        }
        for contribution in contributions {
            let entry = IndexEntry {
                uri: uri.to_string(),
                range: contribution.range,
                attributes: contribution.attributes,
            };
            categories
                .entry(contribution.category)
                .or_default()
                .insert(uri, contribution.name, entry);
        }
    }

    /// Drop every contribution from `uri`.
    pub fn remove(&self, uri: &str) {
        let mut categories = self.categories.write();
        for map in categories.values_mut() {
            map.remove_uri(uri);
        }
    }

    /// All occurrences of `name` in `category`, ordered by (uri, line, column).
    pub fn lookup(&self, category: SymbolCategory, name: &str) -> Vec<IndexEntry> {
        let categories = self.categories.read();
        let mut entries = categories
            .get(&category)
            .and_then(|map| map.by_name.get(name))
            .cloned()
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            (a.uri.as_str(), a.range.start.line, a.range.start.character).cmp(&(
                b.uri.as_str(),
                b.range.start.line,
                b.range.start.character,
            ))
        });
        entries
    }

    /// Case-sensitive substring search over names in `category`, for
    /// workspace-symbol queries. An empty query matches everything.
    pub fn search(&self, category: SymbolCategory, query: &str) -> Vec<(String, IndexEntry)> {
        let categories = self.categories.read();
        let mut results: Vec<(String, IndexEntry)> = categories
            .get(&category)
            .map(|map| {
                map.by_name
                    .iter()
                    .filter(|(name, _)| name.contains(query))
                    .flat_map(|(name, entries)| {
                        entries.iter().map(move |e| (name.clone(), e.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        results.sort_by(|a, b| {
            (a.0.as_str(), a.1.uri.as_str(), a.1.range.start.line).cmp(&(
                b.0.as_str(),
                b.1.uri.as_str(),
                b.1.range.start.line,
            ))
        });
        results
    }

    /// Distinct symbol names in `category`, sorted.
    pub fn names(&self, category: SymbolCategory) -> Vec<String> {
        let categories = self.categories.read();
        let mut names: Vec<String> = categories
            .get(&category)
            .map(|map| map.by_name.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Distinct-name counts per category.
    pub fn stats(&self) -> BTreeMap<&'static str, usize> {
        let categories = self.categories.read();
        SymbolCategory::ALL
            .iter()
            .map(|c| {
                let count = categories.get(c).map(|m| m.by_name.len()).unwrap_or(0);
                (c.as_str(), count)
            })
            .collect()
    }

    /// Whether `uri` currently contributes to any category.
    pub fn contains_uri(&self, uri: &str) -> bool {
        let categories = self.categories.read();
        categories.values().any(|map| map.by_uri.contains_key(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(category: SymbolCategory, name: &str, line: u32) -> Contribution {
        Contribution {
            category,
            name: name.to_string(),
            range: Range::on_line(line, 0, name.len() as u32),
            attributes: Vec::new(),
        }
    }

    #[test]
    fn replace_then_lookup() {
        let index = DocumentIndex::new();
        index.replace(
            "file:///a.txt",
            vec![entry(SymbolCategory::Events, "mod.1", 0), entry(SymbolCategory::Events, "mod.2", 5)],
        );
        assert_eq!(index.lookup(SymbolCategory::Events, "mod.1").len(), 1);
        assert_eq!(index.lookup(SymbolCategory::Events, "mod.9"), vec![]);
    }

    #[test]
    fn replace_erases_prior_contributions() {
        let index = DocumentIndex::new();
        index.replace("file:///a.txt", vec![entry(SymbolCategory::Events, "mod.1", 0)]);
        index.replace("file:///a.txt", vec![entry(SymbolCategory::Events, "mod.2", 0)]);
        assert!(index.lookup(SymbolCategory::Events, "mod.1").is_empty());
        assert_eq!(index.lookup(SymbolCategory::Events, "mod.2").len(), 1);
    }

    #[test]
    fn remove_clears_every_category() {
        let index = DocumentIndex::new();
        index.replace(
            "file:///a.txt",
            vec![
                entry(SymbolCategory::Events, "mod.1", 0),
                entry(SymbolCategory::SavedScopes, "target", 2),
            ],
        );
        index.remove("file:///a.txt");
        for category in SymbolCategory::ALL {
            assert!(index.search(category, "").is_empty(), "{category:?} not empty");
        }
        assert!(!index.contains_uri("file:///a.txt"));
    }

    #[test]
    fn lookup_is_ordered_by_uri_then_position() {
        let index = DocumentIndex::new();
        index.replace("file:///b.txt", vec![entry(SymbolCategory::Modifiers, "brave", 3)]);
        index.replace("file:///a.txt", vec![entry(SymbolCategory::Modifiers, "brave", 7)]);
        let entries = index.lookup(SymbolCategory::Modifiers, "brave");
        assert_eq!(entries[0].uri, "file:///a.txt");
        assert_eq!(entries[1].uri, "file:///b.txt");
    }

    #[test]
    fn other_documents_survive_replace() {
        let index = DocumentIndex::new();
        index.replace("file:///a.txt", vec![entry(SymbolCategory::Events, "mod.1", 0)]);
        index.replace("file:///b.txt", vec![entry(SymbolCategory::Events, "mod.1", 4)]);
        index.replace("file:///a.txt", Vec::new());
        let entries = index.lookup(SymbolCategory::Events, "mod.1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uri, "file:///b.txt");
    }

    #[test]
    fn stats_count_distinct_names() {
        let index = DocumentIndex::new();
        index.replace(
            "file:///a.txt",
            vec![entry(SymbolCategory::Events, "mod.1", 0), entry(SymbolCategory::Events, "mod.1", 9)],
        );
        assert_eq!(index.stats()["events"], 1);
        assert_eq!(index.stats()["traits"], 0);
    }
}
