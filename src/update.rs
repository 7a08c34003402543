//! Assembles the statements sent to the store. Every mutating fragment that
//! touches an existing entity is guarded by the entity's last modification
//! timestamp, so a concurrent writer makes the fragment match nothing and
//! the conflict surfaces when the timestamp is re-read.

use crate::changeset::{Action, ChangeRecord};
use crate::composite::Value;
use crate::identifier::{Iri, QName};
use crate::literal::escape;
use crate::temporal::DateTime;

fn timestamp_term(modified: &DateTime) -> String {
    format!("\"{}\"^^xsd:dateTime", escape(&modified.to_string()))
}

/// Builds statements against one named graph.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    graph: String,
}

impl StatementBuilder {
    pub fn new(graph: &Iri) -> Self {
        Self {
            graph: graph.to_wire(),
        }
    }

    /// Joins fragments into one update request. The store executes them in
    /// order within the surrounding transaction.
    pub fn assemble(&self, fragments: &[String]) -> String {
        fragments.join("\n;\n")
    }

    /// The full insert for a new entity: its class, the metadata quartet
    /// and every field, in one `INSERT DATA`.
    pub fn insert_data(&self, subject: &Iri, pairs: &[(String, String)]) -> String {
        let mut triples = String::new();
        for (predicate, object) in pairs {
            triples.push_str(&format!("        {} {predicate} {object} .\n", subject.to_wire()));
        }
        format!(
            "INSERT DATA {{\n    GRAPH {} {{\n{triples}    }}\n}}",
            self.graph
        )
    }

    /// Every property of one subject, also used as the existence check.
    pub fn describe_query(&self, subject: &Iri) -> String {
        format!(
            "SELECT ?prop ?val\nFROM {}\nWHERE {{\n    {} ?prop ?val .\n}}",
            self.graph,
            subject.to_wire()
        )
    }

    /// The elements of a list-valued field, in chain order.
    pub fn list_query(&self, subject: &Iri, field: &QName) -> String {
        format!(
            "SELECT ?elem\nFROM {}\nWHERE {{\n    {} {field}/rdf:rest* ?node .\n    ?node rdf:first ?elem .\n}}",
            self.graph,
            subject.to_wire()
        )
    }

    /// The current modification timestamp, read back after an update to
    /// decide whether the guarded fragments actually applied.
    pub fn modified_query(&self, subject: &Iri) -> String {
        format!(
            "SELECT ?modified\nFROM {}\nWHERE {{\n    {} dcterms:modified ?modified .\n}}",
            self.graph,
            subject.to_wire()
        )
    }

    // The guard clause shared by every fragment below.
    fn guard(&self, subject: &Iri, modified: &DateTime) -> String {
        format!(
            "    BIND({} AS ?e)\n    ?e dcterms:modified ?modified .\n    FILTER(?modified = {})",
            subject.to_wire(),
            timestamp_term(modified)
        )
    }

    /// Inserts one new field value.
    pub fn create_fragment(
        &self,
        subject: &Iri,
        field: &str,
        term: &str,
        modified: &DateTime,
    ) -> String {
        format!(
            "WITH {}\nINSERT {{\n    ?e {field} {term} .\n}}\nWHERE {{\n{}\n}}",
            self.graph,
            self.guard(subject, modified)
        )
    }

    /// Swaps one known field value for another.
    pub fn replace_fragment(
        &self,
        subject: &Iri,
        field: &str,
        old_term: &str,
        new_term: &str,
        modified: &DateTime,
    ) -> String {
        format!(
            "WITH {}\nDELETE {{\n    ?e {field} {old_term} .\n}}\nINSERT {{\n    ?e {field} {new_term} .\n}}\nWHERE {{\n    ?e {field} {old_term} .\n{}\n}}",
            self.graph,
            self.guard(subject, modified)
        )
    }

    /// Removes one known field value.
    pub fn delete_fragment(
        &self,
        subject: &Iri,
        field: &str,
        old_term: &str,
        modified: &DateTime,
    ) -> String {
        format!(
            "WITH {}\nDELETE {{\n    ?e {field} {old_term} .\n}}\nWHERE {{\n    ?e {field} {old_term} .\n{}\n}}",
            self.graph,
            self.guard(subject, modified)
        )
    }

    /// Replaces every value of a field, whatever it currently holds.
    pub fn variable_replace_fragment(
        &self,
        subject: &Iri,
        field: &str,
        new_term: &str,
        modified: &DateTime,
    ) -> String {
        format!(
            "WITH {}\nDELETE {{\n    ?e {field} ?old .\n}}\nINSERT {{\n    ?e {field} {new_term} .\n}}\nWHERE {{\n    ?e {field} ?old .\n{}\n}}",
            self.graph,
            self.guard(subject, modified)
        )
    }

    /// Removes every value of a field, whatever it currently holds.
    pub fn variable_delete_fragment(
        &self,
        subject: &Iri,
        field: &str,
        modified: &DateTime,
    ) -> String {
        format!(
            "WITH {}\nDELETE {{\n    ?e {field} ?old .\n}}\nWHERE {{\n    ?e {field} ?old .\n{}\n}}",
            self.graph,
            self.guard(subject, modified)
        )
    }

    // Tears down the reachable link chain behind a list field, leaving the
    // field triple itself for a follow-up fragment. A field holding the
    // empty collection has no link nodes, so this matches nothing there.
    fn chain_delete_fragment(&self, subject: &Iri, field: &str, modified: &DateTime) -> String {
        format!(
            "WITH {}\nDELETE {{\n    ?z rdf:first ?head .\n    ?z rdf:rest ?tail .\n}}\nWHERE {{\n    ?e {field} ?list .\n    ?list rdf:rest* ?z .\n    ?z rdf:first ?head .\n    ?z rdf:rest ?tail .\n{}\n}}",
            self.graph,
            self.guard(subject, modified)
        )
    }

    /// Replaces a whole list: chain teardown, field triple removal, then an
    /// insert of the freshly built collection. The insert fragment is guarded
    /// by the timestamp alone, so a list that was empty in the store still
    /// grows.
    pub fn list_replace_fragments(
        &self,
        subject: &Iri,
        field: &str,
        collection: &str,
        modified: &DateTime,
    ) -> Vec<String> {
        vec![
            self.chain_delete_fragment(subject, field, modified),
            self.variable_delete_fragment(subject, field, modified),
            self.create_fragment(subject, field, collection, modified),
        ]
    }

    /// Removes a list field, chain and field triple both. The field triple
    /// goes through the variable form so an empty collection's rdf:nil is
    /// removed as well.
    pub fn list_delete_fragments(
        &self,
        subject: &Iri,
        field: &str,
        modified: &DateTime,
    ) -> Vec<String> {
        vec![
            self.chain_delete_fragment(subject, field, modified),
            self.variable_delete_fragment(subject, field, modified),
        ]
    }

    /// Bumps `dcterms:modified` and `dcterms:contributor`, guarded by the
    /// timestamp every other fragment in the batch was guarded by.
    pub fn set_modified_fragments(
        &self,
        subject: &Iri,
        old_modified: &DateTime,
        new_modified: &DateTime,
        contributor: &Iri,
    ) -> Vec<String> {
        // the contributor swap must run while the old timestamp still
        // satisfies its guard, so the timestamp bump comes last
        vec![
            self.variable_replace_fragment(
                subject,
                "dcterms:contributor",
                &contributor.to_wire(),
                old_modified,
            ),
            self.replace_fragment(
                subject,
                "dcterms:modified",
                &timestamp_term(old_modified),
                &timestamp_term(new_modified),
                old_modified,
            ),
        ]
    }

    /// Removes an entity outright: its list chains first, then every triple
    /// it is the subject of. Deliberately unguarded, a delete always wins.
    pub fn delete_entity(&self, subject: &Iri) -> String {
        let subject = subject.to_wire();
        format!(
            "DELETE WHERE {{\n    GRAPH {g} {{\n        {subject} ?prop ?node .\n        ?node rdf:rest* ?z .\n        ?z rdf:first ?head .\n        ?z rdf:rest ?tail .\n    }}\n}}\n;\nDELETE WHERE {{\n    GRAPH {g} {{\n        {subject} ?prop ?val .\n    }}\n}}",
            g = self.graph
        )
    }

    /// The guarded fragments for one tracked field divergence.
    pub fn fragments_for(
        &self,
        subject: &Iri,
        field: &QName,
        current: Option<&Value>,
        record: &ChangeRecord,
        modified: &DateTime,
    ) -> Vec<String> {
        let field = field.to_string();
        match record.action() {
            Action::Create => match current {
                Some(Value::List(list)) => vec![self.create_fragment(
                    subject,
                    &field,
                    &list.collection_term(),
                    modified,
                )],
                Some(value) => value
                    .wire_terms()
                    .iter()
                    .map(|term| self.create_fragment(subject, &field, term, modified))
                    .collect(),
                None => Vec::new(),
            },
            Action::Replace => {
                let old_was_list = matches!(record.old_value(), Some(Value::List(_)));
                match current {
                    Some(Value::Literal(new)) => {
                        if let Some(Value::Literal(old)) = record.old_value() {
                            vec![self.replace_fragment(
                                subject,
                                &field,
                                &old.to_wire(),
                                &new.to_wire(),
                                modified,
                            )]
                        } else {
                            // the field changed shape, start from a clean slate
                            let mut fragments = Vec::new();
                            if old_was_list {
                                fragments
                                    .push(self.chain_delete_fragment(subject, &field, modified));
                            }
                            fragments.push(self.variable_delete_fragment(subject, &field, modified));
                            fragments.push(self.create_fragment(
                                subject,
                                &field,
                                &new.to_wire(),
                                modified,
                            ));
                            fragments
                        }
                    }
                    Some(Value::LangString(langs)) => {
                        let mut fragments = Vec::new();
                        if old_was_list {
                            fragments.push(self.chain_delete_fragment(subject, &field, modified));
                        }
                        fragments.push(self.variable_delete_fragment(subject, &field, modified));
                        for term in langs.wire_terms() {
                            fragments.push(self.create_fragment(subject, &field, &term, modified));
                        }
                        fragments
                    }
                    Some(Value::List(list)) => self.list_replace_fragments(
                        subject,
                        &field,
                        &list.collection_term(),
                        modified,
                    ),
                    None => Vec::new(),
                }
            }
            Action::Delete => match record.old_value() {
                Some(Value::Literal(old)) => {
                    vec![self.delete_fragment(subject, &field, &old.to_wire(), modified)]
                }
                Some(Value::LangString(_)) | None => {
                    vec![self.variable_delete_fragment(subject, &field, modified)]
                }
                Some(Value::List(_)) => self.list_delete_fragments(subject, &field, modified),
            },
            Action::Modify => match current {
                // only language sets mutate in place; each diverged
                // language contributes its own fragment
                Some(Value::LangString(langs)) => {
                    let mut fragments = Vec::new();
                    for (language, change) in langs.changes() {
                        match change.action() {
                            Action::Create => {
                                if let Some(text) = langs.get(language) {
                                    let term = format!("\"{}\"@{language}", escape(text));
                                    fragments.push(self.create_fragment(
                                        subject, &field, &term, modified,
                                    ));
                                }
                            }
                            Action::Replace => {
                                if let (Some(old), Some(new)) = (change.old(), langs.get(language))
                                {
                                    let old_term = format!("\"{}\"@{language}", escape(old));
                                    let new_term = format!("\"{}\"@{language}", escape(new));
                                    fragments.push(self.replace_fragment(
                                        subject, &field, &old_term, &new_term, modified,
                                    ));
                                }
                            }
                            Action::Delete | Action::Modify => {
                                if let Some(old) = change.old() {
                                    let old_term = format!("\"{}\"@{language}", escape(old));
                                    fragments.push(self.delete_fragment(
                                        subject, &field, &old_term, modified,
                                    ));
                                }
                            }
                        }
                    }
                    fragments
                }
                Some(Value::List(list)) => self.list_replace_fragments(
                    subject,
                    &field,
                    &list.collection_term(),
                    modified,
                ),
                _ => Vec::new(),
            },
        }
    }
}
