// The numeric half of the literal family: the arbitrary-width integer, its
// range-constrained relatives, and the decimal / floating point types.

use std::fmt;
use std::ops;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::error::{Result, TripodError};

// ------------- Integer -------------

/// The arbitrary-width base integer (`xsd:integer`). All bounded integer
/// subtypes re-validate against their own interval on construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Integer(BigInt);

impl Integer {
    pub fn new<T: Into<BigInt>>(value: T) -> Self {
        Self(value.into())
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        let value = BigInt::from_str(lexical.trim()).map_err(|_| {
            TripodError::Value(format!("\"{lexical}\" is not a valid integer"))
        })?;
        Ok(Self(value))
    }

    pub fn value(&self) -> &BigInt {
        &self.0
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ops::Deref for Integer {
    type Target = BigInt;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Generates an integer subtype constrained to a closed interval. Construction
// outside the interval always fails; there is no clamping.
macro_rules! ranged_integer {
    ($(#[$meta:meta])* $name:ident, $min:literal ..= $max:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i128);

        impl $name {
            pub const MIN: i128 = $min;
            pub const MAX: i128 = $max;

            pub fn new<T: Into<i128>>(value: T) -> Result<Self> {
                let value = value.into();
                if value < Self::MIN || value > Self::MAX {
                    return Err(TripodError::Value(format!(
                        "{} must lie in {}..={}, got {}",
                        stringify!($name),
                        Self::MIN,
                        Self::MAX,
                        value
                    )));
                }
                Ok(Self(value))
            }

            pub fn parse(lexical: &str) -> Result<Self> {
                let value = lexical.trim().parse::<i128>().map_err(|_| {
                    TripodError::Value(format!(
                        "\"{lexical}\" is not a valid {}",
                        stringify!($name)
                    ))
                })?;
                Self::new(value)
            }

            pub fn value(&self) -> i128 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

ranged_integer!(
    /// `xsd:byte`
    Byte, -128 ..= 127);
ranged_integer!(
    /// `xsd:short`
    Short, -32768 ..= 32767);
ranged_integer!(
    /// `xsd:int`
    Int, -2147483648 ..= 2147483647);
ranged_integer!(
    /// `xsd:long`
    Long, -9223372036854775808 ..= 9223372036854775807);
ranged_integer!(
    /// `xsd:unsignedByte`
    UnsignedByte, 0 ..= 255);
ranged_integer!(
    /// `xsd:unsignedShort`
    UnsignedShort, 0 ..= 65535);
ranged_integer!(
    /// `xsd:unsignedInt`
    UnsignedInt, 0 ..= 4294967295);
ranged_integer!(
    /// `xsd:unsignedLong`
    UnsignedLong, 0 ..= 18446744073709551615);

// Generates an integer subtype with a one-sided bound. These wrap the
// arbitrary-width base since the open side is unbounded.
macro_rules! bounded_integer {
    ($(#[$meta:meta])* $name:ident, $check:expr, $expect:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(BigInt);

        impl $name {
            pub fn new<T: Into<BigInt>>(value: T) -> Result<Self> {
                let value: BigInt = value.into();
                let ok: fn(&BigInt) -> bool = $check;
                if !ok(&value) {
                    return Err(TripodError::Value(format!(
                        "{} must be {}, got {}",
                        stringify!($name),
                        $expect,
                        value
                    )));
                }
                Ok(Self(value))
            }

            pub fn parse(lexical: &str) -> Result<Self> {
                let value = BigInt::from_str(lexical.trim()).map_err(|_| {
                    TripodError::Value(format!(
                        "\"{lexical}\" is not a valid {}",
                        stringify!($name)
                    ))
                })?;
                Self::new(value)
            }

            pub fn value(&self) -> &BigInt {
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

bounded_integer!(
    /// `xsd:nonNegativeInteger`
    NonNegativeInteger,
    |v| *v >= BigInt::from(0),
    ">= 0"
);
bounded_integer!(
    /// `xsd:positiveInteger`
    PositiveInteger,
    |v| *v >= BigInt::from(1),
    ">= 1"
);
bounded_integer!(
    /// `xsd:nonPositiveInteger`
    NonPositiveInteger,
    |v| *v <= BigInt::from(0),
    "<= 0"
);
bounded_integer!(
    /// `xsd:negativeInteger`
    NegativeInteger,
    |v| *v <= BigInt::from(-1),
    "<= -1"
);

// ------------- Decimal -------------

/// `xsd:decimal`, backed by an arbitrary-precision decimal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(BigDecimal);

impl Decimal {
    pub fn new(value: BigDecimal) -> Self {
        Self(value)
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        let value = BigDecimal::from_str(lexical.trim()).map_err(|_| {
            TripodError::Value(format!("\"{lexical}\" is not a valid decimal"))
        })?;
        Ok(Self(value))
    }

    pub fn value(&self) -> &BigDecimal {
        &self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ops::Deref for Decimal {
    type Target = BigDecimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self(BigDecimal::from(value))
    }
}

// ------------- Floating point -------------

// The XSD lexical forms for the non-finite values differ from Rust's.
fn parse_f64(lexical: &str) -> Result<f64> {
    match lexical.trim() {
        "NaN" => Ok(f64::NAN),
        "INF" | "+INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        other => other.parse::<f64>().map_err(|_| {
            TripodError::Value(format!("\"{lexical}\" is not a valid floating point number"))
        }),
    }
}

fn fmt_float<T: fmt::Display>(value: T, nan: bool, inf: Option<bool>, f: &mut fmt::Formatter) -> fmt::Result {
    if nan {
        write!(f, "NaN")
    } else if let Some(neg) = inf {
        write!(f, "{}INF", if neg { "-" } else { "" })
    } else {
        write!(f, "{value}")
    }
}

/// `xsd:double`. NaN compares equal to NaN so the wire round-trip law holds.
#[derive(Debug, Clone, Copy)]
pub struct Double(f64);

impl Double {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        parse_f64(lexical).map(Self)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for Double {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || (self.0.is_nan() && other.0.is_nan())
    }
}
impl Eq for Double {}

impl std::hash::Hash for Double {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let bits = if self.0 == 0.0 {
            0u64
        } else if self.0.is_nan() {
            f64::NAN.to_bits()
        } else {
            self.0.to_bits()
        };
        bits.hash(state);
    }
}

impl fmt::Display for Double {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inf = self.0.is_infinite().then(|| self.0 < 0.0);
        fmt_float(self.0, self.0.is_nan(), inf, f)
    }
}

/// `xsd:float`, the 32-bit sibling of [`Double`].
#[derive(Debug, Clone, Copy)]
pub struct Float(f32);

impl Float {
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        // parse as f64 first so the special forms are shared
        parse_f64(lexical).map(|v| Self(v as f32))
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || (self.0.is_nan() && other.0.is_nan())
    }
}
impl Eq for Float {}

impl std::hash::Hash for Float {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let bits = if self.0 == 0.0 {
            0u32
        } else if self.0.is_nan() {
            f32::NAN.to_bits()
        } else {
            self.0.to_bits()
        };
        bits.hash(state);
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inf = self.0.is_infinite().then(|| self.0 < 0.0);
        fmt_float(self.0, self.0.is_nan(), inf, f)
    }
}
