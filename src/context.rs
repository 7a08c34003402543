// Prefix to namespace resolution. A context is a named, bidirectional prefix
// table; named contexts are shared process-wide through a registry so every
// connection against the same store sees the same prefixes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bimap::BiMap;
use lazy_static::lazy_static;
use tracing::debug;

use crate::error::{Result, TripodError};
use crate::identifier::{Iri, IriRep, NCName, NamespaceIri, QName};

const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("sh", "http://www.w3.org/ns/shacl#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("tripod", "http://tripod.dev/ns#"),
];

lazy_static! {
    static ref REGISTRY: Mutex<HashMap<String, Arc<Mutex<Context>>>> =
        Mutex::new(HashMap::new());
}

/// Returns the shared context registered under `name`, creating it with the
/// default prefixes on first use.
pub fn shared(name: &str) -> Arc<Mutex<Context>> {
    let mut registry = REGISTRY.lock().unwrap();
    registry
        .entry(name.to_string())
        .or_insert_with(|| {
            debug!(context = name, "creating shared context");
            Arc::new(Mutex::new(Context::new(name)))
        })
        .clone()
}

/// A bidirectional prefix table seeded with the common vocabularies.
#[derive(Debug, Clone)]
pub struct Context {
    name: String,
    prefixes: BiMap<String, String>,
}

impl Context {
    pub fn new(name: &str) -> Self {
        let mut prefixes = BiMap::new();
        for (prefix, namespace) in DEFAULT_PREFIXES {
            prefixes.insert(prefix.to_string(), namespace.to_string());
        }
        Self {
            name: name.to_string(),
            prefixes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds a prefix to a namespace. Re-registering a prefix replaces its
    /// old binding in both directions.
    pub fn register(&mut self, prefix: &NCName, namespace: &NamespaceIri) {
        self.prefixes
            .insert(prefix.as_str().to_string(), namespace.as_str().to_string());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get_by_left(prefix).map(|s| s.as_str())
    }

    pub fn prefix(&self, namespace: &str) -> Option<&str> {
        self.prefixes.get_by_right(namespace).map(|s| s.as_str())
    }

    /// Expands a qualified name to its full IRI string.
    pub fn expand(&self, qname: &QName) -> Result<String> {
        let namespace = self.namespace(qname.prefix().as_str()).ok_or_else(|| {
            TripodError::NotFound(format!(
                "prefix \"{}\" is not registered in context \"{}\"",
                qname.prefix(),
                self.name
            ))
        })?;
        Ok(format!("{namespace}{}", qname.local()))
    }

    /// Expands an IRI in compact representation to full representation.
    /// Full IRIs pass through unchanged.
    pub fn expand_iri(&self, iri: &Iri) -> Result<Iri> {
        match iri.rep() {
            IriRep::Full => Ok(iri.clone()),
            IriRep::Qname => Iri::new(self.expand(&iri.as_qname()?)?),
        }
    }

    /// Compacts a full IRI to a qualified name using the longest registered
    /// namespace that prefixes it. Fails quietly when no namespace matches
    /// or the remainder is not a valid local part.
    pub fn compact(&self, iri: &str) -> Option<QName> {
        let mut best: Option<(&str, &str)> = None;
        for (prefix, namespace) in &self.prefixes {
            if iri.starts_with(namespace.as_str()) {
                match best {
                    Some((_, found)) if found.len() >= namespace.len() => {}
                    _ => best = Some((prefix, namespace)),
                }
            }
        }
        let (prefix, namespace) = best?;
        let local = NCName::new(&iri[namespace.len()..]).ok()?;
        let prefix = NCName::new(prefix).ok()?;
        Some(QName::new(prefix, local))
    }

    /// The `PREFIX` prolog prepended to every statement sent to the store.
    /// Lines are sorted so the output is stable.
    pub fn sparql_prolog(&self) -> String {
        let mut lines: Vec<String> = self
            .prefixes
            .iter()
            .map(|(prefix, namespace)| format!("PREFIX {prefix}: <{namespace}>"))
            .collect();
        lines.sort();
        lines.join("\n")
    }
}
