// Materializes the store's JSON result documents into rows of typed
// literals. Rows are fully realized up front, so a row set can be iterated
// any number of times and indexed at random.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::trace;

use crate::context::Context;
use crate::error::{Result, TripodError};
use crate::identifier::{BNode, Iri, Language};
use crate::literal::{Datatype, Literal};

#[derive(Debug, Deserialize)]
struct SparqlResults {
    head: Head,
    results: Bindings,
}

#[derive(Debug, Deserialize)]
struct Head {
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Bindings {
    bindings: Vec<HashMap<String, BindingCell>>,
}

#[derive(Debug, Deserialize)]
struct BindingCell {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
}

impl BindingCell {
    fn into_literal(self, context: &Context) -> Result<Literal> {
        match self.kind.as_str() {
            "uri" => match context.compact(&self.value) {
                Some(qname) => Ok(Literal::Iri(Iri::from_qname(&qname))),
                None => Ok(Literal::Iri(Iri::new(self.value)?)),
            },
            "bnode" => {
                let label = if self.value.starts_with("_:") {
                    self.value
                } else {
                    format!("_:{}", self.value)
                };
                Ok(Literal::BNode(BNode::new(label)?))
            }
            "literal" | "typed-literal" => {
                if let Some(lang) = self.lang {
                    return Ok(Literal::lang_string(self.value, Language::new(lang)?));
                }
                match self.datatype.as_deref().and_then(Datatype::from_tag) {
                    Some(datatype) => Literal::from_lexical(datatype, &self.value, None),
                    // an unrecognized datatype degrades to a plain string
                    None => Ok(Literal::string(self.value)),
                }
            }
            other => Err(TripodError::Format(format!(
                "unknown binding kind \"{other}\""
            ))),
        }
    }
}

/// A materialized query result: the projected variable names plus one map
/// per solution row. Unbound variables are simply absent from their row.
#[derive(Debug, Clone)]
pub struct RowSet {
    names: Vec<String>,
    rows: Vec<HashMap<String, Literal>>,
}

impl RowSet {
    /// Parses a SPARQL JSON results document. Every cell is converted
    /// eagerly; a single malformed cell fails the whole document.
    pub fn from_json(context: &Context, document: serde_json::Value) -> Result<Self> {
        let parsed: SparqlResults = serde_json::from_value(document)?;
        let mut rows = Vec::with_capacity(parsed.results.bindings.len());
        for binding in parsed.results.bindings {
            let mut row = HashMap::with_capacity(binding.len());
            for (name, cell) in binding {
                row.insert(name, cell.into_literal(context)?);
            }
            rows.push(row);
        }
        trace!(rows = rows.len(), "materialized result rows");
        Ok(Self {
            names: parsed.head.vars,
            rows,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Literal> {
        self.rows.get(row).and_then(|r| r.get(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HashMap<String, Literal>> {
        self.rows.iter()
    }
}
