//! Tripod – a client-side persistence mapper for SPARQL triple stores.
//!
//! Tripod maps typed entities onto triples in a remote store and back:
//! * A [`literal::Literal`] is a validated, typed value with a lossless
//!   textual wire form (`"body"^^xsd:type`, `"body"@lang`, `<iri>`, ...).
//! * A [`context::Context`] resolves prefixes to namespaces in both
//!   directions; named contexts are shared process-wide.
//! * An [`entity::Entity`] holds fields keyed by qualified name, tracks
//!   local changes per field, and knows how to create, read, update and
//!   delete itself through a [`transport::Connection`].
//!
//! Writes are optimistic: every update fragment is guarded by the entity's
//! last known `dcterms:modified` timestamp. A concurrent writer makes the
//! guards match nothing, the timestamp re-read catches it, the transaction
//! is rolled back and the caller gets a conflict error to retry from fresh
//! state.
//!
//! ## Modules
//! * [`literal`] – the value family and wire form codec, backed by
//!   [`numeric`], [`temporal`] and [`identifier`].
//! * [`context`] – prefix resolution and the shared context registry.
//! * [`binder`] – materializes SPARQL JSON result documents into typed rows.
//! * [`changeset`] / [`composite`] – per-field change tracking, language
//!   sets and ordered lists.
//! * [`update`] – statement assembly, including the guarded fragments.
//! * [`transport`] – the protocol trait, the HTTP implementation and the
//!   connection/capability layer.
//! * [`entity`] – the lifecycle itself.
//!
//! ## Quick Start
//! ```no_run
//! use tripod::config::StoreConfig;
//! use tripod::entity::Entity;
//! use tripod::identifier::{Iri, QName};
//! use tripod::literal::Literal;
//! use tripod::transport::{Capability, Connection};
//!
//! # fn main() -> tripod::error::Result<()> {
//! let settings = StoreConfig::load(None)?;
//! let user = Iri::new("https://example.org/staff/alice")?;
//! let mut conn = Connection::open(
//!     &settings,
//!     user,
//!     [Capability::CreateEntity, Capability::UpdateEntity].into(),
//! )?;
//!
//! let mut project = Entity::new(QName::parse("ex:Project")?);
//! project.set(QName::parse("ex:label")?, Literal::string("Alpha"))?;
//! project.create(&mut conn)?;
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod changeset;
pub mod composite;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod identifier;
pub mod literal;
pub mod numeric;
pub mod temporal;
pub mod transport;
pub mod update;
