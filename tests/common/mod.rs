// An in-memory stand-in for the store. It keeps triples as
// subject -> predicate -> object terms, stages a copy per transaction, and
// interprets the exact statement shapes the crate emits, including the
// timestamp guards, so the full lifecycle runs against it unchanged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value as Json};

use tripod::error::{Result, TripodError};
use tripod::identifier::{Iri, NCName, NamespaceIri};
use tripod::literal::Literal;
use tripod::transport::{Capability, Connection, Transport};

type Triples = HashMap<String, HashMap<String, Vec<String>>>;

#[derive(Default)]
struct Inner {
    committed: Triples,
    staged: Option<Triples>,
    bnode_counter: usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a concurrent writer by stamping a different modification
    /// timestamp straight into the committed state.
    pub fn tamper_modified(&self, subject: &Iri, term: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(props) = inner.committed.get_mut(&subject.to_wire()) {
            props.insert("dcterms:modified".to_string(), vec![term.to_string()]);
        }
    }

    pub fn subject_exists(&self, subject: &Iri) -> bool {
        self.inner
            .lock()
            .unwrap()
            .committed
            .contains_key(&subject.to_wire())
    }

    /// Plants a triple straight into the committed state, bypassing the
    /// statement shapes the crate itself emits.
    pub fn seed(&self, subject: &Iri, predicate: &str, object: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .committed
            .entry(subject.to_wire())
            .or_default()
            .entry(predicate.to_string())
            .or_default()
            .push(object.to_string());
    }

    pub fn triple_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .committed
            .values()
            .flat_map(|props| props.values())
            .map(|objects| objects.len())
            .sum()
    }
}

impl Transport for MemoryStore {
    fn query(&mut self, statement: &str) -> Result<Json> {
        let inner = self.inner.lock().unwrap();
        Ok(run_query(&inner.committed, statement))
    }

    fn update(&mut self, statement: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let mut counter = inner.bnode_counter;
        let mut triples = std::mem::take(&mut inner.committed);
        run_update(&mut triples, &mut counter, statement);
        inner.committed = triples;
        inner.bnode_counter = counter;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.staged.is_some() {
            return Err(TripodError::Transport("transaction already open".into()));
        }
        inner.staged = Some(inner.committed.clone());
        Ok(())
    }

    fn transaction_query(&mut self, statement: &str) -> Result<Json> {
        let inner = self.inner.lock().unwrap();
        let staged = inner
            .staged
            .as_ref()
            .ok_or_else(|| TripodError::Transport("no transaction".into()))?;
        Ok(run_query(staged, statement))
    }

    fn transaction_update(&mut self, statement: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let mut counter = inner.bnode_counter;
        let mut staged = inner
            .staged
            .take()
            .ok_or_else(|| TripodError::Transport("no transaction".into()))?;
        run_update(&mut staged, &mut counter, statement);
        inner.staged = Some(staged);
        inner.bnode_counter = counter;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let staged = inner
            .staged
            .take()
            .ok_or_else(|| TripodError::Transport("no transaction".into()))?;
        inner.committed = staged;
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .staged
            .take()
            .ok_or_else(|| TripodError::Transport("no transaction".into()))?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.inner.lock().unwrap().staged.is_some()
    }
}

// ------------- statement interpretation -------------

fn strip_prolog(statement: &str) -> String {
    statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("PREFIX "))
        .collect::<Vec<_>>()
        .join("\n")
}

// Splits one wire term list on spaces outside quotes.
fn split_terms(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ' ' if !in_quote => {
                if !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }
    terms
}

// Parses one "subject predicate object ." line into its three parts.
fn parse_triple(line: &str) -> Option<(String, String, String)> {
    let line = line.trim().strip_suffix(" .")?;
    let mut terms = split_terms(line);
    if terms.len() < 3 {
        return None;
    }
    let subject = terms.remove(0);
    let predicate = terms.remove(0);
    Some((subject, predicate, terms.join(" ")))
}

fn insert_object(triples: &mut Triples, counter: &mut usize, subject: &str, predicate: &str, object: &str) {
    let object = if object.starts_with('(') {
        materialize_collection(triples, counter, object)
    } else {
        object.to_string()
    };
    let objects = triples
        .entry(subject.to_string())
        .or_default()
        .entry(predicate.to_string())
        .or_default();
    if !objects.contains(&object) {
        objects.push(object);
    }
}

// Expands a collection term into an rdf:first / rdf:rest chain and returns
// the head term.
fn materialize_collection(triples: &mut Triples, counter: &mut usize, term: &str) -> String {
    let body = term.trim_start_matches('(').trim_end_matches(')').trim();
    let items = split_terms(body);
    if items.is_empty() {
        return "rdf:nil".to_string();
    }
    let labels: Vec<String> = items
        .iter()
        .map(|_| {
            let label = format!("_:b{}", *counter);
            *counter += 1;
            label
        })
        .collect();
    for (i, item) in items.iter().enumerate() {
        let node = triples.entry(labels[i].clone()).or_default();
        node.insert("rdf:first".to_string(), vec![item.clone()]);
        let rest = labels.get(i + 1).cloned().unwrap_or_else(|| "rdf:nil".to_string());
        node.insert("rdf:rest".to_string(), vec![rest]);
    }
    labels[0].clone()
}

fn delete_chain(triples: &mut Triples, head: &str) {
    let mut node = head.to_string();
    while node != "rdf:nil" {
        let Some(props) = triples.remove(&node) else {
            break;
        };
        node = props
            .get("rdf:rest")
            .and_then(|v| v.first())
            .cloned()
            .unwrap_or_else(|| "rdf:nil".to_string());
    }
}

// ------------- queries -------------

fn cell_for(term: &str) -> Json {
    if term == "a" {
        return json!({ "type": "uri", "value": "rdf:type" });
    }
    let literal = Literal::from_wire(term).expect("store holds only well-formed terms");
    match &literal {
        Literal::Iri(iri) => json!({ "type": "uri", "value": iri.as_str() }),
        Literal::BNode(bnode) => {
            json!({ "type": "bnode", "value": bnode.as_str().trim_start_matches("_:") })
        }
        Literal::String(s) => match s.language() {
            Some(lang) => json!({
                "type": "literal",
                "value": s.value(),
                "xml:lang": lang.as_str(),
            }),
            None => json!({
                "type": "literal",
                "value": s.value(),
                "datatype": "xsd:string",
            }),
        },
        other => json!({
            "type": "literal",
            "value": other.lexical(),
            "datatype": other.datatype().expect("typed literal").as_str(),
        }),
    }
}

fn results(vars: &[&str], bindings: Vec<Json>) -> Json {
    json!({
        "head": { "vars": vars },
        "results": { "bindings": bindings }
    })
}

fn run_query(triples: &Triples, statement: &str) -> Json {
    let statement = strip_prolog(statement);
    if statement.contains("?prop ?val") {
        let subject = statement
            .lines()
            .find_map(|line| {
                let line = line.trim();
                line.ends_with("?prop ?val .")
                    .then(|| line.split_whitespace().next().unwrap().to_string())
            })
            .expect("describe query names a subject");
        let mut bindings = Vec::new();
        if let Some(props) = triples.get(&subject) {
            for (predicate, objects) in props {
                for object in objects {
                    bindings.push(json!({
                        "prop": cell_for(predicate),
                        "val": cell_for(object),
                    }));
                }
            }
        }
        return results(&["prop", "val"], bindings);
    }
    if statement.contains("/rdf:rest* ?node .") {
        let (subject, field) = statement
            .lines()
            .find_map(|line| {
                let line = line.trim();
                if !line.contains("/rdf:rest* ?node .") {
                    return None;
                }
                let mut parts = line.split_whitespace();
                let subject = parts.next()?.to_string();
                let field = parts.next()?.trim_end_matches("/rdf:rest*").to_string();
                Some((subject, field))
            })
            .expect("list query names a subject and field");
        let mut bindings = Vec::new();
        if let Some(head) = triples
            .get(&subject)
            .and_then(|props| props.get(&field))
            .and_then(|objects| objects.first())
        {
            let mut node = head.clone();
            while node != "rdf:nil" {
                let Some(props) = triples.get(&node) else { break };
                if let Some(first) = props.get("rdf:first").and_then(|v| v.first()) {
                    bindings.push(json!({ "elem": cell_for(first) }));
                }
                node = props
                    .get("rdf:rest")
                    .and_then(|v| v.first())
                    .cloned()
                    .unwrap_or_else(|| "rdf:nil".to_string());
            }
        }
        return results(&["elem"], bindings);
    }
    if statement.contains("dcterms:modified ?modified .") {
        let subject = statement
            .lines()
            .find_map(|line| {
                let line = line.trim();
                line.ends_with("dcterms:modified ?modified .")
                    .then(|| line.split_whitespace().next().unwrap().to_string())
            })
            .expect("timestamp query names a subject");
        let bindings = triples
            .get(&subject)
            .and_then(|props| props.get("dcterms:modified"))
            .into_iter()
            .flatten()
            .map(|object| json!({ "modified": cell_for(object) }))
            .collect();
        return results(&["modified"], bindings);
    }
    panic!("unrecognized query shape:\n{statement}");
}

// ------------- updates -------------

fn run_update(triples: &mut Triples, counter: &mut usize, statement: &str) {
    let statement = strip_prolog(statement);
    for fragment in statement.split("\n;\n") {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if fragment.starts_with("INSERT DATA") {
            apply_insert_data(triples, counter, fragment);
        } else if fragment.starts_with("DELETE WHERE") {
            apply_delete_where(triples, fragment);
        } else if fragment.starts_with("WITH") {
            apply_guarded(triples, counter, fragment);
        } else {
            panic!("unrecognized update shape:\n{fragment}");
        }
    }
}

fn apply_insert_data(triples: &mut Triples, counter: &mut usize, fragment: &str) {
    for line in fragment.lines() {
        if let Some((subject, predicate, object)) = parse_triple(line) {
            insert_object(triples, counter, &subject, &predicate, &object);
        }
    }
}

fn apply_delete_where(triples: &mut Triples, fragment: &str) {
    let subject = fragment
        .lines()
        .find_map(|line| {
            let line = line.trim();
            line.starts_with("<")
                .then(|| line.split_whitespace().next().unwrap().to_string())
        })
        .expect("delete names a subject");
    let chain_variant = fragment.contains("rdf:rest*");
    if chain_variant {
        let heads: Vec<String> = triples
            .get(&subject)
            .map(|props| {
                props
                    .values()
                    .flatten()
                    .filter(|o| o.starts_with("_:"))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for head in heads {
            delete_chain(triples, &head);
        }
    } else {
        triples.remove(&subject);
    }
}

// One guarded fragment: WITH / optional DELETE / optional INSERT / WHERE.
// The whole fragment applies only when the WHERE part matches: the subject
// must carry the guarded timestamp and every concrete pattern must hold.
fn apply_guarded(triples: &mut Triples, counter: &mut usize, fragment: &str) {
    let mut section = "";
    let mut delete_lines: Vec<String> = Vec::new();
    let mut insert_lines: Vec<String> = Vec::new();
    let mut where_lines: Vec<String> = Vec::new();
    for line in fragment.lines() {
        match line {
            "DELETE {" => section = "delete",
            "INSERT {" => section = "insert",
            "WHERE {" => section = "where",
            "}" => section = "",
            _ => match section {
                "delete" => delete_lines.push(line.trim().to_string()),
                "insert" => insert_lines.push(line.trim().to_string()),
                "where" => where_lines.push(line.trim().to_string()),
                _ => {}
            },
        }
    }

    let mut subject = None;
    let mut guard = None;
    let mut list_field: Option<String> = None;
    let mut chain_required = false;
    let mut constraints: Vec<(String, String)> = Vec::new();
    for line in &where_lines {
        if let Some(rest) = line.strip_prefix("BIND(") {
            subject = rest.split_whitespace().next().map(|s| s.to_string());
        } else if let Some(rest) = line.strip_prefix("FILTER(?modified = ") {
            guard = rest.strip_suffix(')').map(|s| s.to_string());
        } else if line.starts_with("?z rdf:first ") {
            chain_required = true;
        } else if let Some(rest) = line.strip_prefix("?e ") {
            let Some(rest) = rest.strip_suffix(" .") else { continue };
            let mut terms = split_terms(rest);
            if terms.is_empty() {
                continue;
            }
            let predicate = terms.remove(0);
            let object = terms.join(" ");
            if !object.starts_with('?') {
                constraints.push((predicate, object));
            } else if object == "?old" || object == "?list" {
                if object == "?list" {
                    list_field = Some(predicate.clone());
                }
                // a variable pattern still requires the field to be bound
                constraints.push((predicate, String::new()));
            }
        }
    }
    let subject = subject.expect("guarded fragment binds ?e");
    let guard = guard.expect("guarded fragment filters on ?modified");

    let Some(props) = triples.get(&subject) else { return };
    let guarded = props
        .get("dcterms:modified")
        .map(|objects| objects.contains(&guard))
        .unwrap_or(false);
    if !guarded {
        return;
    }
    for (predicate, object) in &constraints {
        let held = props.get(predicate).map(|objects| {
            if object.is_empty() {
                !objects.is_empty()
            } else {
                objects.contains(object)
            }
        });
        if held != Some(true) {
            return;
        }
    }
    // a chain pattern only matches when a link node sits behind the field;
    // rdf:nil carries no rdf:first, so an empty list never satisfies it
    if chain_required {
        let Some(field) = &list_field else { return };
        let linked = props
            .get(field)
            .map(|objects| objects.iter().any(|o| o.starts_with("_:")))
            .unwrap_or(false);
        if !linked {
            return;
        }
    }

    let mut chains_torn_down = false;
    for line in &delete_lines {
        if line.starts_with("?z ") {
            if chains_torn_down {
                continue;
            }
            chains_torn_down = true;
            let heads: Vec<String> = list_field
                .as_ref()
                .and_then(|field| triples.get(&subject).and_then(|props| props.get(field)))
                .map(|objects| {
                    objects
                        .iter()
                        .filter(|o| o.starts_with("_:"))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for head in heads {
                delete_chain(triples, &head);
            }
            continue;
        }
        let Some(rest) = line.strip_prefix("?e ") else { continue };
        let Some(rest) = rest.strip_suffix(" .") else { continue };
        let mut terms = split_terms(rest);
        if terms.is_empty() {
            continue;
        }
        let predicate = terms.remove(0);
        let object = terms.join(" ");
        if let Some(props) = triples.get_mut(&subject) {
            if object.starts_with('?') {
                props.remove(&predicate);
            } else if let Some(objects) = props.get_mut(&predicate) {
                objects.retain(|o| o != &object);
                if objects.is_empty() {
                    props.remove(&predicate);
                }
            }
        }
    }

    for line in &insert_lines {
        let Some(rest) = line.strip_prefix("?e ") else { continue };
        let Some(rest) = rest.strip_suffix(" .") else { continue };
        let mut terms = split_terms(rest);
        if terms.is_empty() {
            continue;
        }
        let predicate = terms.remove(0);
        let object = terms.join(" ");
        insert_object(triples, counter, &subject, &predicate, &object);
    }
}

// ------------- harness -------------

pub const GRAPH: &str = "http://example.org/graph/test";
pub const USER: &str = "https://example.org/staff/alice";

pub fn user() -> Iri {
    Iri::new(USER).unwrap()
}

pub fn all_capabilities() -> std::collections::HashSet<Capability> {
    [
        Capability::CreateEntity,
        Capability::UpdateEntity,
        Capability::DeleteEntity,
    ]
    .into()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A connection over the given store with the `ex:` prefix registered and
/// the given capabilities.
pub fn connection_with(
    store: &MemoryStore,
    capabilities: std::collections::HashSet<Capability>,
) -> Connection {
    init_tracing();
    let context = tripod::context::shared("itest");
    context.lock().unwrap().register(
        &NCName::new("ex").unwrap(),
        &NamespaceIri::new("http://example.org/ns#").unwrap(),
    );
    Connection::new(
        Box::new(store.clone()),
        "itest",
        Iri::new(GRAPH).unwrap(),
        user(),
        capabilities,
    )
}

pub fn connection(store: &MemoryStore) -> Connection {
    connection_with(store, all_capabilities())
}
