//! The wire seam. [`Transport`] is the protocol surface a store must offer;
//! [`HttpTransport`] speaks it over HTTP against a GraphDB-style endpoint,
//! and tests substitute their own in-memory transport behind the same trait.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::binder::RowSet;
use crate::context::{self, Context};
use crate::config::StoreConfig;
use crate::error::{Result, TripodError};
use crate::identifier::Iri;

/// What a connection's user is allowed to do. Checked client-side before a
/// statement is even built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateEntity,
    UpdateEntity,
    DeleteEntity,
}

/// The statement-level protocol against one repository.
pub trait Transport {
    fn query(&mut self, statement: &str) -> Result<serde_json::Value>;
    fn update(&mut self, statement: &str) -> Result<()>;
    fn begin(&mut self) -> Result<()>;
    fn transaction_query(&mut self, statement: &str) -> Result<serde_json::Value>;
    fn transaction_update(&mut self, statement: &str) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn abort(&mut self) -> Result<()>;
    fn in_transaction(&self) -> bool;
}

// ------------- HTTP transport -------------

const QUERY_CONTENT_TYPE: &str = "application/sparql-query";
const UPDATE_CONTENT_TYPE: &str = "application/sparql-update";
const RESULTS_ACCEPT: &str = "application/sparql-results+json";

/// Speaks the repository protocol over HTTP. Transactions follow the
/// GraphDB shape: `POST .../transactions` opens one and hands back its URL in the
/// `Location` header, subsequent statements go to that URL with an `action`
/// parameter.
pub struct HttpTransport {
    agent: ureq::Agent,
    repository_url: String,
    transaction_url: Option<String>,
}

impl HttpTransport {
    pub fn new(server: &str, repository: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            repository_url: format!("{}/repositories/{}", server.trim_end_matches('/'), repository),
            transaction_url: None,
        }
    }

    fn post_query(&mut self, url: &str, statement: &str) -> Result<serde_json::Value> {
        let mut response = self
            .agent
            .post(url)
            .header("Content-Type", QUERY_CONTENT_TYPE)
            .header("Accept", RESULTS_ACCEPT)
            .send(statement)
            .map_err(|e| TripodError::Transport(e.to_string()))?;
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TripodError::Transport(e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| TripodError::Transport(format!("invalid result document: {e}")))
    }

    fn post_update(&mut self, url: &str, statement: &str) -> Result<()> {
        self.agent
            .post(url)
            .header("Content-Type", UPDATE_CONTENT_TYPE)
            .send(statement)
            .map_err(|e| TripodError::Transport(e.to_string()))?;
        Ok(())
    }

    fn transaction_url(&self) -> Result<&str> {
        self.transaction_url
            .as_deref()
            .ok_or_else(|| TripodError::Transport("no transaction is open".to_string()))
    }
}

impl Transport for HttpTransport {
    fn query(&mut self, statement: &str) -> Result<serde_json::Value> {
        let url = self.repository_url.clone();
        self.post_query(&url, statement)
    }

    fn update(&mut self, statement: &str) -> Result<()> {
        let url = format!("{}/statements", self.repository_url);
        self.post_update(&url, statement)
    }

    fn begin(&mut self) -> Result<()> {
        if self.transaction_url.is_some() {
            return Err(TripodError::Transport(
                "a transaction is already open".to_string(),
            ));
        }
        let response = self
            .agent
            .post(format!("{}/transactions", self.repository_url))
            .send_empty()
            .map_err(|e| TripodError::Transport(e.to_string()))?;
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                TripodError::Transport("store did not return a transaction URL".to_string())
            })?;
        debug!(transaction = location, "transaction opened");
        self.transaction_url = Some(location.to_string());
        Ok(())
    }

    fn transaction_query(&mut self, statement: &str) -> Result<serde_json::Value> {
        let url = format!("{}?action=QUERY", self.transaction_url()?);
        self.post_query(&url, statement)
    }

    fn transaction_update(&mut self, statement: &str) -> Result<()> {
        let url = format!("{}?action=UPDATE", self.transaction_url()?);
        self.post_update(&url, statement)
    }

    fn commit(&mut self) -> Result<()> {
        let url = format!("{}?action=COMMIT", self.transaction_url()?);
        self.agent
            .put(url)
            .send_empty()
            .map_err(|e| TripodError::Transport(e.to_string()))?;
        self.transaction_url = None;
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        let url = self.transaction_url()?.to_string();
        self.agent
            .delete(url)
            .call()
            .map_err(|e| TripodError::Transport(e.to_string()))?;
        warn!("transaction aborted");
        self.transaction_url = None;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.transaction_url.is_some()
    }
}

// ------------- Connection -------------

/// A working session against one named graph: a transport, the shared
/// prefix context, the acting user and what that user may do. Statements
/// get the context's prefix prolog prepended before they leave.
pub struct Connection {
    transport: Box<dyn Transport>,
    context: Arc<Mutex<Context>>,
    graph: Iri,
    user: Iri,
    capabilities: HashSet<Capability>,
}

impl Connection {
    pub fn new(
        transport: Box<dyn Transport>,
        context_name: &str,
        graph: Iri,
        user: Iri,
        capabilities: HashSet<Capability>,
    ) -> Self {
        Self {
            transport,
            context: context::shared(context_name),
            graph,
            user,
            capabilities,
        }
    }

    /// Opens an HTTP connection per the loaded configuration.
    pub fn open(
        settings: &StoreConfig,
        user: Iri,
        capabilities: HashSet<Capability>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(&settings.server, &settings.repository);
        let graph = Iri::new(settings.graph.clone())?;
        info!(graph = graph.as_str(), user = user.as_str(), "connection opened");
        Ok(Self::new(
            Box::new(transport),
            &settings.context,
            graph,
            user,
            capabilities,
        ))
    }

    pub fn context(&self) -> Arc<Mutex<Context>> {
        self.context.clone()
    }

    pub fn graph(&self) -> &Iri {
        &self.graph
    }

    pub fn user(&self) -> &Iri {
        &self.user
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.capabilities.contains(&capability) {
            return Ok(());
        }
        Err(TripodError::NoPermission(format!(
            "user {} lacks {capability:?}",
            self.user
        )))
    }

    fn with_prolog(&self, statement: &str) -> String {
        let prolog = self.context.lock().unwrap().sparql_prolog();
        format!("{prolog}\n{statement}")
    }

    /// Runs a query and materializes its rows, inside the open transaction
    /// if there is one.
    pub fn query(&mut self, statement: &str) -> Result<RowSet> {
        let full = self.with_prolog(statement);
        debug!(statement = full, "query");
        let document = if self.transport.in_transaction() {
            self.transport.transaction_query(&full)?
        } else {
            self.transport.query(&full)?
        };
        let context = self.context.lock().unwrap();
        RowSet::from_json(&context, document)
    }

    /// Sends an update, inside the open transaction if there is one.
    pub fn update(&mut self, statement: &str) -> Result<()> {
        let full = self.with_prolog(statement);
        debug!(statement = full, "update");
        if self.transport.in_transaction() {
            self.transport.transaction_update(&full)
        } else {
            self.transport.update(&full)
        }
    }

    pub fn begin(&mut self) -> Result<()> {
        self.transport.begin()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.transport.commit()
    }

    pub fn abort(&mut self) -> Result<()> {
        self.transport.abort()
    }

    pub fn in_transaction(&self) -> bool {
        self.transport.in_transaction()
    }
}
