// Composite field values: a field holds either one literal, a set of
// language-tagged translations, or an ordered list. The language set tracks
// its own per-language changes so an update only touches what moved.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::changeset::Action;
use crate::identifier::Language;
use crate::literal::{escape, Literal};

/// What an entity field holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(Literal),
    LangString(LangString),
    List(ValueList),
}

impl Value {
    /// The wire terms this value contributes to an insert. A list collapses
    /// to a single collection term.
    pub fn wire_terms(&self) -> Vec<String> {
        match self {
            Self::Literal(literal) => vec![literal.to_wire()],
            Self::LangString(langs) => langs.wire_terms(),
            Self::List(list) => vec![list.collection_term()],
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

// ------------- LangString -------------

/// One tracked divergence inside a [`LangString`], per language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangChange {
    old: Option<String>,
    action: Action,
}

impl LangChange {
    pub fn old(&self) -> Option<&str> {
        self.old.as_deref()
    }

    pub fn action(&self) -> Action {
        self.action
    }
}

/// A set of translations keyed by language tag. At most one text per
/// language. Mutations are tracked the same way entity fields are: the
/// first divergence per language keeps the persisted text.
#[derive(Debug, Clone, Default)]
pub struct LangString {
    entries: BTreeMap<Language, String>,
    changes: HashMap<Language, LangChange>,
}

// Equality ignores pending changes, two lang strings with the same
// translations are the same value.
impl PartialEq for LangString {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
impl Eq for LangString {}

impl LangString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a persisted lang string, with no pending changes.
    pub fn from_entries(entries: impl IntoIterator<Item = (Language, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            changes: HashMap::new(),
        }
    }

    pub fn get(&self, language: &Language) -> Option<&str> {
        self.entries.get(language).map(|s| s.as_str())
    }

    /// Sets the text for a language. Setting the text a language already
    /// holds records nothing.
    pub fn set(&mut self, language: Language, text: impl Into<String>) {
        let text = text.into();
        if self.entries.get(&language) == Some(&text) {
            return;
        }
        let old = self.entries.insert(language.clone(), text);
        self.record(language, old);
    }

    /// Removes the text for a language, if present.
    pub fn remove(&mut self, language: &Language) {
        if let Some(old) = self.entries.remove(language) {
            self.record(language.clone(), Some(old));
        }
    }

    fn record(&mut self, language: Language, old: Option<String>) {
        let present = self.entries.contains_key(&language);
        let had_text = match self.changes.get(&language) {
            None => {
                let action = match (&old, present) {
                    (None, _) => Action::Create,
                    (Some(_), true) => Action::Replace,
                    (Some(_), false) => Action::Delete,
                };
                self.changes.insert(language, LangChange { old, action });
                return;
            }
            Some(existing) => existing.old.is_some(),
        };
        if !had_text && !present {
            // added and removed within this session
            self.changes.remove(&language);
            return;
        }
        if let Some(existing) = self.changes.get_mut(&language) {
            existing.action = match (had_text, present) {
                (false, _) => Action::Create,
                (true, true) => Action::Replace,
                (true, false) => Action::Delete,
            };
        }
    }

    /// Reverts every pending change to its persisted text.
    pub fn undo(&mut self) {
        let changes = std::mem::take(&mut self.changes);
        for (language, change) in changes {
            match change.old {
                Some(text) => {
                    self.entries.insert(language, text);
                }
                None => {
                    self.entries.remove(&language);
                }
            }
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changes(&self) -> impl Iterator<Item = (&Language, &LangChange)> {
        self.changes.iter()
    }

    /// Accepts the current state as persisted.
    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Language, &str)> {
        self.entries.iter().map(|(l, s)| (l, s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn wire_terms(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(language, text)| format!("\"{}\"@{}", escape(text), language))
            .collect()
    }
}

// ------------- ValueList -------------

/// An ordered list of literals, persisted as a collection so the order
/// survives the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueList(Vec<Literal>);

impl ValueList {
    pub fn new(items: Vec<Literal>) -> Self {
        Self(items)
    }

    pub fn items(&self) -> &[Literal] {
        &self.0
    }

    pub fn items_mut(&mut self) -> &mut Vec<Literal> {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The collection syntax for an insert, `( term term ... )`. An empty
    /// list is `()`, which the store reads as the empty collection.
    pub fn collection_term(&self) -> String {
        if self.0.is_empty() {
            return "()".to_string();
        }
        let terms: Vec<String> = self.0.iter().map(Literal::to_wire).collect();
        format!("( {} )", terms.join(" "))
    }
}

impl fmt::Display for ValueList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.collection_term())
    }
}

impl FromIterator<Literal> for ValueList {
    fn from_iter<T: IntoIterator<Item = Literal>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(tag: &str) -> Language {
        Language::new(tag).unwrap()
    }

    #[test]
    fn setting_the_same_text_records_nothing() {
        let mut ls = LangString::from_entries([(lang("en"), "Hello".to_string())]);
        ls.set(lang("en"), "Hello");
        assert!(!ls.has_changes());
    }

    #[test]
    fn per_language_first_divergence_wins() {
        let mut ls = LangString::from_entries([(lang("en"), "Hello".to_string())]);
        ls.set(lang("en"), "Hi");
        ls.set(lang("en"), "Hey");
        let (_, change) = ls.changes().next().unwrap();
        assert_eq!(change.action(), Action::Replace);
        assert_eq!(change.old(), Some("Hello"));
        assert_eq!(ls.get(&lang("en")), Some("Hey"));
    }

    #[test]
    fn undo_restores_the_persisted_texts() {
        let mut ls = LangString::from_entries([(lang("en"), "Hello".to_string())]);
        ls.set(lang("en"), "Hi");
        ls.set(lang("de"), "Hallo");
        ls.remove(&lang("en"));
        ls.undo();
        assert_eq!(ls.get(&lang("en")), Some("Hello"));
        assert_eq!(ls.get(&lang("de")), None);
        assert!(!ls.has_changes());
    }

    #[test]
    fn add_then_remove_cancels() {
        let mut ls = LangString::new();
        ls.set(lang("fr"), "Bonjour");
        ls.remove(&lang("fr"));
        assert!(!ls.has_changes());
        assert!(ls.is_empty());
    }

    #[test]
    fn wire_terms_are_tagged_and_escaped() {
        let ls = LangString::from_entries([
            (lang("en"), "say \"hi\"".to_string()),
            (lang("de"), "Hallo".to_string()),
        ]);
        let terms = ls.wire_terms();
        assert!(terms.contains(&"\"Hallo\"@de".to_string()));
        assert!(terms.contains(&"\"say \\\"hi\\\"\"@en".to_string()));
    }

    #[test]
    fn list_collection_term_preserves_order() {
        let list = ValueList::new(vec![
            Literal::from(1i64),
            Literal::from(2i64),
            Literal::from(3i64),
        ]);
        assert_eq!(
            list.collection_term(),
            "( \"1\"^^xsd:integer \"2\"^^xsd:integer \"3\"^^xsd:integer )"
        );
        assert_eq!(ValueList::default().collection_term(), "()");
    }
}
