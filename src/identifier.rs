// Identifier-shaped literal types: the XML name family, language tags,
// qualified names, IRIs and blank node labels.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::error::{Result, TripodError};

lazy_static! {
    static ref NCNAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap();
    static ref NAME: Regex = Regex::new(r"^[A-Za-z_:][A-Za-z0-9_.\-:]*$").unwrap();
    static ref NMTOKEN: Regex = Regex::new(r"^[A-Za-z0-9_.\-:]+$").unwrap();
    static ref LANGUAGE: Regex = Regex::new(r"^[a-zA-Z]{2,3}(-[a-zA-Z0-9]{1,8})*$").unwrap();
    static ref QNAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*:[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap();
}

macro_rules! validated_string {
    ($(#[$meta:meta])* $name:ident, $pattern:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                if !$pattern.is_match(&value) {
                    return Err(TripodError::Value(format!(
                        concat!("\"{}\" is not a valid ", $what),
                        value
                    )));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

validated_string!(
    /// `xsd:NCName`, a name without a colon. Used for prefixes and the local
    /// parts of qualified names.
    NCName, NCNAME, "NCName");
validated_string!(
    /// `xsd:Name`
    XmlName, NAME, "Name");
validated_string!(
    /// `xsd:NMTOKEN`
    NmToken, NMTOKEN, "NMTOKEN");
validated_string!(
    /// `xsd:language`, a BCP 47 style tag such as `en` or `de-CH`.
    Language, LANGUAGE, "language tag");

// ------------- QName -------------

/// A qualified name, `prefix:local`. Both parts are NCNames.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName {
    prefix: NCName,
    local: NCName,
}

impl QName {
    pub fn new(prefix: NCName, local: NCName) -> Self {
        Self { prefix, local }
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        let (prefix, local) = lexical.split_once(':').ok_or_else(|| {
            TripodError::Value(format!("\"{lexical}\" is not a valid QName"))
        })?;
        Ok(Self {
            prefix: NCName::new(prefix)?,
            local: NCName::new(local)?,
        })
    }

    pub fn prefix(&self) -> &NCName {
        &self.prefix
    }

    pub fn local(&self) -> &NCName {
        &self.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local)
    }
}

// ------------- Iri -------------

/// How an [`Iri`] was written, which decides how it goes back on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IriRep {
    /// A full IRI, serialized in angle brackets.
    Full,
    /// A `prefix:local` form, serialized bare.
    Qname,
}

/// A resource identifier. The representation is sticky: a value parsed as a
/// qualified name stays one until the resolver expands it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iri {
    value: String,
    rep: IriRep,
}

impl Iri {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.contains("://") || value.starts_with("urn:") {
            if value.contains(char::is_whitespace) || value.contains(['<', '>', '"']) {
                return Err(TripodError::Value(format!("\"{value}\" is not a valid IRI")));
            }
            return Ok(Self { value, rep: IriRep::Full });
        }
        if QNAME.is_match(&value) {
            return Ok(Self { value, rep: IriRep::Qname });
        }
        Err(TripodError::Value(format!("\"{value}\" is not a valid IRI")))
    }

    pub fn from_qname(qname: &QName) -> Self {
        Self {
            value: qname.to_string(),
            rep: IriRep::Qname,
        }
    }

    /// A fresh `urn:uuid:` identity for a new entity.
    pub fn new_random() -> Self {
        Self {
            value: format!("urn:uuid:{}", Uuid::new_v4()),
            rep: IriRep::Full,
        }
    }

    pub fn rep(&self) -> IriRep {
        self.rep
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn as_qname(&self) -> Result<QName> {
        match self.rep {
            IriRep::Qname => QName::parse(&self.value),
            IriRep::Full => Err(TripodError::Value(format!(
                "\"{}\" is a full IRI, not a QName",
                self.value
            ))),
        }
    }

    /// The statement-level form: angle brackets for a full IRI, bare for a
    /// qualified name.
    pub fn to_wire(&self) -> String {
        match self.rep {
            IriRep::Full => format!("<{}>", self.value),
            IriRep::Qname => self.value.clone(),
        }
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

// ------------- BNode -------------

/// A blank node label, always carrying the `_:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BNode(String);

impl BNode {
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let rest = label.strip_prefix("_:").ok_or_else(|| {
            TripodError::Value(format!("\"{label}\" is not a valid blank node label"))
        })?;
        if rest.is_empty() || !NCNAME.is_match(rest) {
            return Err(TripodError::Value(format!(
                "\"{label}\" is not a valid blank node label"
            )));
        }
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ------------- NamespaceIri -------------

/// A namespace IRI, required to end in `#` or `/` so that appending a local
/// part yields a full IRI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceIri(String);

impl NamespaceIri {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !value.contains("://") && !value.starts_with("urn:") {
            return Err(TripodError::Value(format!(
                "\"{value}\" is not a valid namespace IRI"
            )));
        }
        if !value.ends_with('#') && !value.ends_with('/') {
            return Err(TripodError::Value(format!(
                "namespace IRI \"{value}\" must end in '#' or '/'"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn append(&self, local: &NCName) -> String {
        format!("{}{}", self.0, local)
    }
}

impl fmt::Display for NamespaceIri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ncname_shapes() {
        assert!(NCName::new("projectShortName").is_ok());
        assert!(NCName::new("_internal").is_ok());
        assert!(NCName::new("with.dot-and_underscore").is_ok());
        assert!(NCName::new("1digitFirst").is_err());
        assert!(NCName::new("has:colon").is_err());
        assert!(NCName::new("").is_err());
    }

    #[test]
    fn language_tags() {
        assert!(Language::new("en").is_ok());
        assert!(Language::new("de-CH").is_ok());
        assert!(Language::new("x").is_err());
        assert!(Language::new("en us").is_err());
    }

    #[test]
    fn qname_split() {
        let q = QName::parse("dcterms:created").unwrap();
        assert_eq!(q.prefix().as_str(), "dcterms");
        assert_eq!(q.local().as_str(), "created");
        assert!(QName::parse("nocolon").is_err());
        assert!(QName::parse("too:many:colons").is_err());
    }

    #[test]
    fn iri_representation_is_sticky() {
        let full = Iri::new("https://example.org/project/alpha").unwrap();
        assert_eq!(full.rep(), IriRep::Full);
        assert_eq!(full.to_wire(), "<https://example.org/project/alpha>");

        let qname = Iri::new("ex:alpha").unwrap();
        assert_eq!(qname.rep(), IriRep::Qname);
        assert_eq!(qname.to_wire(), "ex:alpha");

        assert!(Iri::new("not an iri at all").is_err());
    }

    #[test]
    fn random_iri_is_a_urn() {
        let iri = Iri::new_random();
        assert!(iri.as_str().starts_with("urn:uuid:"));
        assert_eq!(iri.rep(), IriRep::Full);
    }

    #[test]
    fn bnode_label_requires_prefix() {
        assert!(BNode::new("_:b0").is_ok());
        assert!(BNode::new("b0").is_err());
        assert!(BNode::new("_:").is_err());
    }

    #[test]
    fn namespace_must_be_appendable() {
        assert!(NamespaceIri::new("http://example.org/ns#").is_ok());
        assert!(NamespaceIri::new("http://example.org/ns/").is_ok());
        assert!(NamespaceIri::new("http://example.org/ns").is_err());
    }
}
