//! The literal value family and its wire forms.
//!
//! Every value the engine stores is a [`Literal`]. Each variant validates on
//! construction, so a held value is always well-formed, and every variant
//! round-trips through its wire form without loss.

use std::fmt;

use base64::Engine;

use crate::error::{Result, TripodError};
use crate::identifier::{BNode, Iri, Language, NCName, NmToken, QName, XmlName};
use crate::numeric::{
    Byte, Decimal, Double, Float, Int, Integer, Long, NegativeInteger, NonNegativeInteger,
    NonPositiveInteger, PositiveInteger, Short, UnsignedByte, UnsignedInt, UnsignedLong,
    UnsignedShort,
};
use crate::temporal::{
    Date, DateTime, Duration, GDay, GMonth, GMonthDay, GYear, GYearMonth, TimeOfDay,
};

pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

// ------------- escaping -------------

/// Escapes a raw string for embedding in a quoted wire form. The inverse of
/// [`unescape`].
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Reverses [`escape`]. A backslash followed by anything outside the escape
/// set is malformed.
pub fn unescape(escaped: &str) -> Result<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                _ => {
                    return Err(TripodError::Format(format!(
                        "invalid escape sequence in \"{escaped}\""
                    )))
                }
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

// Splits a quoted body from whatever follows the closing quote. The leading
// quote must already be stripped.
fn split_quoted(rest: &str) -> Option<(&str, &str)> {
    let bytes = rest.as_bytes();
    let mut escaped = false;
    for (i, b) in bytes.iter().enumerate() {
        match *b {
            b'\\' if !escaped => escaped = true,
            b'"' if !escaped => return Some((&rest[..i], &rest[i + 1..])),
            _ => escaped = false,
        }
    }
    None
}

// ------------- binary and string subtypes -------------

/// `xsd:hexBinary`. Parsing accepts either case, formatting is lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexBinary(Vec<u8>);

impl HexBinary {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        hex::decode(lexical.trim()).map(Self).map_err(|_| {
            TripodError::Value(format!("\"{lexical}\" is not valid hex binary"))
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for HexBinary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// `xsd:base64Binary`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Base64Binary(Vec<u8>);

impl Base64Binary {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        base64::engine::general_purpose::STANDARD
            .decode(lexical.trim())
            .map(Self)
            .map_err(|_| TripodError::Value(format!("\"{lexical}\" is not valid base64")))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Base64Binary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", base64::engine::general_purpose::STANDARD.encode(&self.0))
    }
}

/// `xsd:normalizedString`, a string without tabs or line breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedString(String);

impl NormalizedString {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.contains(['\n', '\r', '\t']) {
            return Err(TripodError::Value(format!(
                "\"{value}\" is not a valid normalizedString"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `xsd:token`: no tabs or line breaks, no leading, trailing or doubled
/// spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.contains(['\n', '\r', '\t'])
            || value.starts_with(' ')
            || value.ends_with(' ')
            || value.contains("  ")
        {
            return Err(TripodError::Value(format!("\"{value}\" is not a valid token")));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An `xsd:string` value, optionally carrying a language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringLiteral {
    value: String,
    language: Option<Language>,
}

impl StringLiteral {
    pub fn new(value: impl Into<String>, language: Option<Language>) -> Self {
        Self {
            value: value.into(),
            language,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }
}

// ------------- datatype tags -------------

macro_rules! datatypes {
    ($($variant:ident => $tag:literal),* $(,)?) => {
        /// The datatype tag of a typed literal, e.g. `xsd:dateTime`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Datatype {
            $($variant,)*
        }

        impl Datatype {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)*
                }
            }

            /// Looks a tag up from its prefixed or full IRI form. Unknown
            /// tags yield `None` so callers can fall back to plain strings.
            pub fn from_tag(tag: &str) -> Option<Self> {
                let short;
                let tag = if let Some(local) = tag.strip_prefix(XSD_NAMESPACE) {
                    short = format!("xsd:{local}");
                    short.as_str()
                } else {
                    tag
                };
                match tag {
                    $($tag => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

datatypes! {
    String => "xsd:string",
    Boolean => "xsd:boolean",
    Decimal => "xsd:decimal",
    Float => "xsd:float",
    Double => "xsd:double",
    Integer => "xsd:integer",
    Byte => "xsd:byte",
    Short => "xsd:short",
    Int => "xsd:int",
    Long => "xsd:long",
    UnsignedByte => "xsd:unsignedByte",
    UnsignedShort => "xsd:unsignedShort",
    UnsignedInt => "xsd:unsignedInt",
    UnsignedLong => "xsd:unsignedLong",
    NonNegativeInteger => "xsd:nonNegativeInteger",
    PositiveInteger => "xsd:positiveInteger",
    NonPositiveInteger => "xsd:nonPositiveInteger",
    NegativeInteger => "xsd:negativeInteger",
    DateTime => "xsd:dateTime",
    Date => "xsd:date",
    Time => "xsd:time",
    GYear => "xsd:gYear",
    GYearMonth => "xsd:gYearMonth",
    GMonth => "xsd:gMonth",
    GDay => "xsd:gDay",
    GMonthDay => "xsd:gMonthDay",
    Duration => "xsd:duration",
    HexBinary => "xsd:hexBinary",
    Base64Binary => "xsd:base64Binary",
    NormalizedString => "xsd:normalizedString",
    Token => "xsd:token",
    Language => "xsd:language",
    Name => "xsd:Name",
    NCName => "xsd:NCName",
    NmToken => "xsd:NMTOKEN",
    QName => "xsd:QName",
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ------------- the literal itself -------------

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    String(StringLiteral),
    Boolean(bool),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
    Integer(Integer),
    Byte(Byte),
    Short(Short),
    Int(Int),
    Long(Long),
    UnsignedByte(UnsignedByte),
    UnsignedShort(UnsignedShort),
    UnsignedInt(UnsignedInt),
    UnsignedLong(UnsignedLong),
    NonNegativeInteger(NonNegativeInteger),
    PositiveInteger(PositiveInteger),
    NonPositiveInteger(NonPositiveInteger),
    NegativeInteger(NegativeInteger),
    DateTime(DateTime),
    Date(Date),
    Time(TimeOfDay),
    GYear(GYear),
    GYearMonth(GYearMonth),
    GMonth(GMonth),
    GDay(GDay),
    GMonthDay(GMonthDay),
    Duration(Duration),
    HexBinary(HexBinary),
    Base64Binary(Base64Binary),
    NormalizedString(NormalizedString),
    Token(Token),
    Language(Language),
    Name(XmlName),
    NCName(NCName),
    NmToken(NmToken),
    QName(QName),
    Iri(Iri),
    BNode(BNode),
}

// Match arms for the variants whose inner type both parses from and prints
// to its lexical form. String, Boolean, Iri and BNode need their own arms.
macro_rules! typed_variants {
    ($call:ident!) => {
        $call! {
            Decimal, Float, Double, Integer, Byte, Short, Int, Long,
            UnsignedByte, UnsignedShort, UnsignedInt, UnsignedLong,
            NonNegativeInteger, PositiveInteger, NonPositiveInteger,
            NegativeInteger, DateTime, Date, Time, GYear, GYearMonth, GMonth,
            GDay, GMonthDay, Duration, HexBinary, Base64Binary,
            NormalizedString, Token, Language, Name, NCName, NmToken, QName
        }
    };
}

impl Literal {
    /// A plain string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(StringLiteral::new(value, None))
    }

    /// A language-tagged string value.
    pub fn lang_string(value: impl Into<String>, language: Language) -> Self {
        Self::String(StringLiteral::new(value, Some(language)))
    }

    /// The datatype tag, or `None` for resource terms (IRIs and blank
    /// nodes), which carry no tag on the wire.
    pub fn datatype(&self) -> Option<Datatype> {
        macro_rules! arms {
            ($($variant:ident),* $(,)?) => {
                match self {
                    Self::String(_) => Some(Datatype::String),
                    Self::Boolean(_) => Some(Datatype::Boolean),
                    Self::Iri(_) | Self::BNode(_) => None,
                    $(Self::$variant(_) => Some(Datatype::$variant),)*
                }
            };
        }
        typed_variants!(arms!)
    }

    /// The bare lexical form, without quoting, escaping or a tag.
    pub fn lexical(&self) -> String {
        macro_rules! arms {
            ($($variant:ident),* $(,)?) => {
                match self {
                    Self::String(s) => s.value().to_string(),
                    Self::Boolean(b) => b.to_string(),
                    Self::Iri(i) => i.as_str().to_string(),
                    Self::BNode(b) => b.to_string(),
                    $(Self::$variant(v) => v.to_string(),)*
                }
            };
        }
        typed_variants!(arms!)
    }

    /// The statement-level wire form: `"body"^^tag`, `"body"@lang`,
    /// `<iri>`, a bare qualified name, or `_:label`.
    pub fn to_wire(&self) -> String {
        macro_rules! arms {
            ($($variant:ident),* $(,)?) => {
                match self {
                    Self::String(s) => match s.language() {
                        Some(lang) => format!("\"{}\"@{}", escape(s.value()), lang),
                        None => format!("\"{}\"^^xsd:string", escape(s.value())),
                    },
                    Self::Boolean(b) => format!("\"{b}\"^^xsd:boolean"),
                    Self::Iri(i) => i.to_wire(),
                    Self::BNode(b) => b.to_string(),
                    $(Self::$variant(v) => {
                        format!("\"{}\"^^{}", escape(&v.to_string()), Datatype::$variant.as_str())
                    },)*
                }
            };
        }
        typed_variants!(arms!)
    }

    /// Constructs a typed literal from its datatype tag and bare lexical
    /// form, the shape result rows arrive in.
    pub fn from_lexical(
        datatype: Datatype,
        lexical: &str,
        language: Option<Language>,
    ) -> Result<Self> {
        macro_rules! parsed {
            ($variant:ident, $ty:ty) => {
                Ok(Self::$variant(<$ty>::parse(lexical)?))
            };
        }
        match datatype {
            Datatype::String => Ok(Self::String(StringLiteral::new(lexical, language))),
            Datatype::Boolean => match lexical.trim() {
                "true" | "1" => Ok(Self::Boolean(true)),
                "false" | "0" => Ok(Self::Boolean(false)),
                _ => Err(TripodError::Value(format!(
                    "\"{lexical}\" is not a valid boolean"
                ))),
            },
            Datatype::Decimal => parsed!(Decimal, Decimal),
            Datatype::Float => parsed!(Float, Float),
            Datatype::Double => parsed!(Double, Double),
            Datatype::Integer => parsed!(Integer, Integer),
            Datatype::Byte => parsed!(Byte, Byte),
            Datatype::Short => parsed!(Short, Short),
            Datatype::Int => parsed!(Int, Int),
            Datatype::Long => parsed!(Long, Long),
            Datatype::UnsignedByte => parsed!(UnsignedByte, UnsignedByte),
            Datatype::UnsignedShort => parsed!(UnsignedShort, UnsignedShort),
            Datatype::UnsignedInt => parsed!(UnsignedInt, UnsignedInt),
            Datatype::UnsignedLong => parsed!(UnsignedLong, UnsignedLong),
            Datatype::NonNegativeInteger => parsed!(NonNegativeInteger, NonNegativeInteger),
            Datatype::PositiveInteger => parsed!(PositiveInteger, PositiveInteger),
            Datatype::NonPositiveInteger => parsed!(NonPositiveInteger, NonPositiveInteger),
            Datatype::NegativeInteger => parsed!(NegativeInteger, NegativeInteger),
            Datatype::DateTime => parsed!(DateTime, DateTime),
            Datatype::Date => parsed!(Date, Date),
            Datatype::Time => parsed!(Time, TimeOfDay),
            Datatype::GYear => parsed!(GYear, GYear),
            Datatype::GYearMonth => parsed!(GYearMonth, GYearMonth),
            Datatype::GMonth => parsed!(GMonth, GMonth),
            Datatype::GDay => parsed!(GDay, GDay),
            Datatype::GMonthDay => parsed!(GMonthDay, GMonthDay),
            Datatype::Duration => parsed!(Duration, Duration),
            Datatype::HexBinary => parsed!(HexBinary, HexBinary),
            Datatype::Base64Binary => parsed!(Base64Binary, Base64Binary),
            Datatype::NormalizedString => {
                Ok(Self::NormalizedString(NormalizedString::new(lexical)?))
            }
            Datatype::Token => Ok(Self::Token(Token::new(lexical)?)),
            Datatype::Language => Ok(Self::Language(Language::new(lexical)?)),
            Datatype::Name => Ok(Self::Name(XmlName::new(lexical)?)),
            Datatype::NCName => Ok(Self::NCName(NCName::new(lexical)?)),
            Datatype::NmToken => Ok(Self::NmToken(NmToken::new(lexical)?)),
            Datatype::QName => Ok(Self::QName(QName::parse(lexical)?)),
        }
    }

    /// Parses a wire form back into a value. The inverse of [`to_wire`]:
    /// `from_wire(v.to_wire()) == v` for every literal.
    ///
    /// [`to_wire`]: Self::to_wire
    pub fn from_wire(wire: &str) -> Result<Self> {
        let wire = wire.trim();
        if let Some(inner) = wire.strip_prefix('<') {
            let inner = inner.strip_suffix('>').ok_or_else(|| {
                TripodError::Format(format!("unterminated IRI in \"{wire}\""))
            })?;
            return Ok(Self::Iri(Iri::new(inner)?));
        }
        if wire.starts_with("_:") {
            return Ok(Self::BNode(BNode::new(wire)?));
        }
        if let Some(rest) = wire.strip_prefix('"') {
            let (body, suffix) = split_quoted(rest).ok_or_else(|| {
                TripodError::Format(format!("unterminated string in \"{wire}\""))
            })?;
            let value = unescape(body)?;
            if suffix.is_empty() {
                return Ok(Self::string(value));
            }
            if let Some(tag) = suffix.strip_prefix("^^") {
                let datatype = Datatype::from_tag(tag).ok_or_else(|| {
                    TripodError::Format(format!("unknown datatype tag \"{tag}\""))
                })?;
                return Self::from_lexical(datatype, &value, None);
            }
            if let Some(lang) = suffix.strip_prefix('@') {
                return Ok(Self::lang_string(value, Language::new(lang)?));
            }
            return Err(TripodError::Format(format!(
                "trailing garbage after string in \"{wire}\""
            )));
        }
        // a bare qualified name is an IRI in compact representation
        if let Ok(iri) = Iri::new(wire) {
            return Ok(Self::Iri(iri));
        }
        Err(TripodError::Format(format!("unrecognized wire form \"{wire}\"")))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(Integer::new(value))
    }
}
