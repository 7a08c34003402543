//! The entity lifecycle: local mutation with change tracking, then create,
//! read, update and delete against the store. Updates are optimistic: every
//! fragment is guarded by the last known modification timestamp, and the
//! timestamp is re-read afterwards to detect a concurrent writer.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::changeset::{Action, ChangeTracker};
use crate::composite::{LangString, Value, ValueList};
use crate::error::{Result, TripodError};
use crate::identifier::{Iri, QName};
use crate::literal::Literal;
use crate::temporal::DateTime;
use crate::transport::{Capability, Connection};
use crate::update::StatementBuilder;

/// The provenance quartet every persisted entity carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    creator: Iri,
    created: DateTime,
    contributor: Iri,
    modified: DateTime,
}

impl Metadata {
    pub fn creator(&self) -> &Iri {
        &self.creator
    }

    pub fn created(&self) -> &DateTime {
        &self.created
    }

    pub fn contributor(&self) -> &Iri {
        &self.contributor
    }

    pub fn modified(&self) -> &DateTime {
        &self.modified
    }
}

/// A typed entity, either freshly built or materialized from the store.
/// Field mutations are tracked locally until [`update`] writes them back.
///
/// [`update`]: Self::update
#[derive(Debug, Clone)]
pub struct Entity {
    iri: Iri,
    class: QName,
    fields: HashMap<QName, Value>,
    immutable: HashSet<QName>,
    tracker: ChangeTracker,
    metadata: Option<Metadata>,
}

impl Entity {
    /// A new, not yet persisted entity with a random `urn:uuid:` identity.
    pub fn new(class: QName) -> Self {
        Self::with_iri(Iri::new_random(), class)
    }

    pub fn with_iri(iri: Iri, class: QName) -> Self {
        Self {
            iri,
            class,
            fields: HashMap::new(),
            immutable: HashSet::new(),
            tracker: ChangeTracker::new(),
            metadata: None,
        }
    }

    pub fn iri(&self) -> &Iri {
        &self.iri
    }

    pub fn class(&self) -> &QName {
        &self.class
    }

    /// Provenance, present once the entity has been persisted or read.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn get(&self, field: &QName) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&QName, &Value)> {
        self.fields.iter()
    }

    pub fn changeset(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Marks a field as write-once. Set attempts after it holds a value
    /// fail with [`TripodError::Immutable`].
    pub fn set_immutable(&mut self, field: QName) {
        self.immutable.insert(field);
    }

    fn check_mutable(&self, field: &QName) -> Result<()> {
        if self.immutable.contains(field) && self.fields.contains_key(field) {
            return Err(TripodError::Immutable(format!(
                "{field} on {} cannot be changed",
                self.iri
            )));
        }
        Ok(())
    }

    /// Sets a field. Assigning the value a field already holds records
    /// nothing.
    pub fn set(&mut self, field: QName, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.fields.get(&field) == Some(&value) {
            return Ok(());
        }
        self.check_mutable(&field)?;
        let old = self.fields.insert(field.clone(), value);
        let action = if old.is_some() {
            Action::Replace
        } else {
            Action::Create
        };
        self.tracker.record(&field, action, old);
        Ok(())
    }

    /// Removes a field. Removing an absent field records nothing.
    pub fn remove(&mut self, field: &QName) -> Result<()> {
        if !self.fields.contains_key(field) {
            return Ok(());
        }
        self.check_mutable(field)?;
        let old = self.fields.remove(field);
        self.tracker.record(field, Action::Delete, old);
        Ok(())
    }

    /// Mutates a composite value in place. The divergence is recorded as a
    /// modification, keeping the state before the first change.
    pub fn update_field(
        &mut self,
        field: &QName,
        mutate: impl FnOnce(&mut Value),
    ) -> Result<()> {
        self.check_mutable(field)?;
        let Some(value) = self.fields.get_mut(field) else {
            return Err(TripodError::NotFound(format!(
                "{field} is not set on {}",
                self.iri
            )));
        };
        let before = value.clone();
        mutate(value);
        if *value == before && !has_pending(value) {
            return Ok(());
        }
        self.tracker.record(field, Action::Modify, Some(before));
        Ok(())
    }

    /// Reverts one field to its state before the first local change.
    pub fn undo_field(&mut self, field: &QName) {
        if let Some(record) = self.tracker.take(field) {
            match record.old_value() {
                Some(old) => {
                    self.fields.insert(field.clone(), old.clone());
                }
                None => {
                    self.fields.remove(field);
                }
            }
        }
    }

    /// Reverts every local change.
    pub fn undo(&mut self) {
        let fields: Vec<QName> = self.tracker.iter().map(|(f, _)| f.clone()).collect();
        for field in fields {
            self.undo_field(&field);
        }
    }

    fn clear_changes(&mut self) {
        self.tracker.clear();
        for value in self.fields.values_mut() {
            if let Value::LangString(langs) = value {
                langs.clear_changes();
            }
        }
    }

    // ------------- lifecycle -------------

    /// Persists a new entity: one transaction holding an existence check
    /// and a single `INSERT DATA` with the class, the metadata quartet and
    /// every field.
    pub fn create(&mut self, conn: &mut Connection) -> Result<()> {
        conn.require(Capability::CreateEntity)?;
        if self.metadata.is_some() {
            return Err(TripodError::AlreadyExists(format!(
                "{} is already persisted",
                self.iri
            )));
        }
        let builder = StatementBuilder::new(conn.graph());
        conn.begin()?;
        let outcome = self.create_in_transaction(conn, &builder);
        match outcome {
            Ok(metadata) => {
                conn.commit()?;
                info!(entity = self.iri.as_str(), "entity created");
                self.metadata = Some(metadata);
                self.clear_changes();
                Ok(())
            }
            Err(error) => {
                rollback(conn);
                Err(error)
            }
        }
    }

    fn create_in_transaction(
        &self,
        conn: &mut Connection,
        builder: &StatementBuilder,
    ) -> Result<Metadata> {
        let existing = conn.query(&builder.describe_query(&self.iri))?;
        if !existing.is_empty() {
            return Err(TripodError::AlreadyExists(self.iri.to_string()));
        }
        let now = DateTime::now();
        let user = conn.user().clone();
        let mut pairs: Vec<(String, String)> = vec![
            ("a".to_string(), self.class.to_string()),
            ("dcterms:creator".to_string(), user.to_wire()),
            (
                "dcterms:created".to_string(),
                format!("\"{now}\"^^xsd:dateTime"),
            ),
            ("dcterms:contributor".to_string(), user.to_wire()),
            (
                "dcterms:modified".to_string(),
                format!("\"{now}\"^^xsd:dateTime"),
            ),
        ];
        for (field, value) in &self.fields {
            for term in value.wire_terms() {
                pairs.push((field.to_string(), term));
            }
        }
        conn.update(&builder.insert_data(&self.iri, &pairs))?;
        Ok(Metadata {
            creator: user.clone(),
            created: now,
            contributor: user,
            modified: now,
        })
    }

    /// Materializes an entity from the store.
    pub fn read(conn: &mut Connection, iri: &Iri) -> Result<Self> {
        let builder = StatementBuilder::new(conn.graph());
        let rows = conn.query(&builder.describe_query(iri))?;
        if rows.is_empty() {
            return Err(TripodError::NotFound(iri.to_string()));
        }

        let mut class: Option<QName> = None;
        let mut creator = None;
        let mut created = None;
        let mut contributor = None;
        let mut modified = None;
        let mut fields: HashMap<QName, Value> = HashMap::new();

        for row in rows.iter() {
            let (Some(prop), Some(val)) = (row.get("prop"), row.get("val")) else {
                continue;
            };
            let Literal::Iri(prop_iri) = prop else {
                continue;
            };
            // field keys are qualified names, so a property outside the
            // registered namespaces cannot be represented; dropping it
            // silently would lose data on the next write
            let prop = prop_iri.as_qname().map_err(|_| {
                TripodError::Format(format!(
                    "property {} of {iri} has no registered prefix",
                    prop_iri.as_str()
                ))
            })?;
            match prop.to_string().as_str() {
                "rdf:type" => {
                    if let Literal::Iri(class_iri) = val {
                        class = class_iri.as_qname().ok();
                    }
                }
                "dcterms:creator" => {
                    if let Literal::Iri(v) = val {
                        creator = Some(v.clone());
                    }
                }
                "dcterms:contributor" => {
                    if let Literal::Iri(v) = val {
                        contributor = Some(v.clone());
                    }
                }
                "dcterms:created" => {
                    if let Literal::DateTime(v) = val {
                        created = Some(*v);
                    }
                }
                "dcterms:modified" => {
                    if let Literal::DateTime(v) = val {
                        modified = Some(*v);
                    }
                }
                _ => {
                    Self::absorb_field(conn, &builder, iri, &mut fields, prop, val)?;
                }
            }
        }

        let class = class.ok_or_else(|| {
            TripodError::Format(format!("{iri} has no class"))
        })?;
        let metadata = match (creator, created, contributor, modified) {
            (Some(creator), Some(created), Some(contributor), Some(modified)) => Some(Metadata {
                creator,
                created,
                contributor,
                modified,
            }),
            _ => None,
        };
        debug!(entity = iri.as_str(), fields = fields.len(), "entity read");
        Ok(Self {
            iri: iri.clone(),
            class,
            fields,
            immutable: HashSet::new(),
            tracker: ChangeTracker::new(),
            metadata,
        })
    }

    // Folds one property row into the field map: blank node objects pull in
    // their list chain, tagged strings accumulate per language, anything
    // else lands as a plain literal.
    fn absorb_field(
        conn: &mut Connection,
        builder: &StatementBuilder,
        iri: &Iri,
        fields: &mut HashMap<QName, Value>,
        prop: QName,
        val: &Literal,
    ) -> Result<()> {
        if let Literal::Iri(v) = val {
            // an empty collection comes back as rdf:nil
            if v.as_str() == "rdf:nil" {
                fields.insert(prop, Value::List(ValueList::default()));
                return Ok(());
            }
        }
        if let Literal::BNode(_) = val {
            let rows = conn.query(&builder.list_query(iri, &prop))?;
            let mut items = Vec::with_capacity(rows.len());
            for row in rows.iter() {
                if let Some(elem) = row.get("elem") {
                    items.push(elem.clone());
                }
            }
            fields.insert(prop, Value::List(ValueList::new(items)));
            return Ok(());
        }
        if let Literal::String(s) = val {
            if let Some(language) = s.language() {
                let entry = fields
                    .entry(prop)
                    .or_insert_with(|| Value::LangString(LangString::new()));
                if let Value::LangString(langs) = entry {
                    langs.set(language.clone(), s.value());
                    langs.clear_changes();
                }
                return Ok(());
            }
        }
        fields.insert(prop, Value::Literal(val.clone()));
        Ok(())
    }

    /// Writes the tracked changes back. Fails with
    /// [`TripodError::Conflict`] when another writer touched the entity
    /// since it was read, leaving the store untouched.
    pub fn update(&mut self, conn: &mut Connection) -> Result<()> {
        conn.require(Capability::UpdateEntity)?;
        self.collect_modifications();
        if self.tracker.is_empty() {
            return Ok(());
        }
        let Some(metadata) = self.metadata.clone() else {
            return Err(TripodError::NotFound(format!(
                "{} has not been persisted",
                self.iri
            )));
        };
        let builder = StatementBuilder::new(conn.graph());
        let old_modified = metadata.modified;
        let now = DateTime::now();

        let mut fragments = Vec::new();
        for (field, record) in self.tracker.iter() {
            fragments.extend(builder.fragments_for(
                &self.iri,
                field,
                self.fields.get(field),
                record,
                &old_modified,
            ));
        }
        fragments.extend(builder.set_modified_fragments(
            &self.iri,
            &old_modified,
            &now,
            conn.user(),
        ));
        let statement = builder.assemble(&fragments);

        conn.begin()?;
        let outcome = self.update_in_transaction(conn, &builder, &statement, &now);
        match outcome {
            Ok(()) => {
                conn.commit()?;
                info!(entity = self.iri.as_str(), "entity updated");
                if let Some(metadata) = &mut self.metadata {
                    metadata.modified = now;
                    metadata.contributor = conn.user().clone();
                }
                self.clear_changes();
                Ok(())
            }
            Err(error) => {
                rollback(conn);
                Err(error)
            }
        }
    }

    fn update_in_transaction(
        &self,
        conn: &mut Connection,
        builder: &StatementBuilder,
        statement: &str,
        expected: &DateTime,
    ) -> Result<()> {
        conn.update(statement)?;
        let rows = conn.query(&builder.modified_query(&self.iri))?;
        match rows.get(0, "modified") {
            Some(Literal::DateTime(found)) if found == expected => Ok(()),
            _ => Err(TripodError::Conflict(format!(
                "{} was modified concurrently",
                self.iri
            ))),
        }
    }

    // Language sets mutated through direct accessors carry their own change
    // records; surface them as field-level modifications before building
    // fragments.
    fn collect_modifications(&mut self) {
        let pending: Vec<QName> = self
            .fields
            .iter()
            .filter(|(field, value)| {
                !self.tracker.contains(field) && has_pending(value)
            })
            .map(|(field, _)| field.clone())
            .collect();
        for field in pending {
            // the tracked old value is the last persisted state, so the
            // pending sub-changes must be rolled back out of the clone
            let old = self.fields.get(&field).map(|value| {
                let mut old = value.clone();
                if let Value::LangString(langs) = &mut old {
                    langs.undo();
                }
                old
            });
            self.tracker.record(&field, Action::Modify, old);
        }
    }

    /// Removes the entity and all its triples. Deliberately unguarded: a
    /// delete wins over concurrent updates.
    pub fn delete(&mut self, conn: &mut Connection) -> Result<()> {
        conn.require(Capability::DeleteEntity)?;
        if self.metadata.is_none() {
            return Err(TripodError::NotFound(format!(
                "{} has not been persisted",
                self.iri
            )));
        }
        let builder = StatementBuilder::new(conn.graph());
        conn.update(&builder.delete_entity(&self.iri))?;
        info!(entity = self.iri.as_str(), "entity deleted");
        self.metadata = None;
        self.tracker.clear();
        Ok(())
    }
}

fn has_pending(value: &Value) -> bool {
    matches!(value, Value::LangString(langs) if langs.has_changes())
}

fn rollback(conn: &mut Connection) {
    if conn.in_transaction() {
        if let Err(error) = conn.abort() {
            warn!(error = %error, "transaction abort failed");
        }
    }
}
