// Date and time literal types. Lexical forms follow the XSD shapes, with the
// timezone preserved as written so a parsed value prints back unchanged.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use bigdecimal::BigDecimal;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, TripodError};

lazy_static! {
    static ref G_YEAR: Regex = Regex::new(r"^(-?\d{4})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_YEAR_MONTH: Regex =
        Regex::new(r"^(-?\d{4})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_MONTH: Regex = Regex::new(r"^--(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_DAY: Regex = Regex::new(r"^---(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_MONTH_DAY: Regex =
        Regex::new(r"^--(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref DURATION: Regex = Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$"
    )
    .unwrap();
}

// ------------- Timezone -------------

/// Timezone suffix of a temporal literal. `Z` and `+00:00` are kept distinct
/// so that formatting gives back exactly what was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timezone {
    Zulu,
    /// Offset from UTC in minutes, negative for west of Greenwich.
    Offset(i32),
}

impl Timezone {
    fn parse(suffix: &str) -> Result<Self> {
        if suffix == "Z" {
            return Ok(Self::Zulu);
        }
        let (sign, rest) = if let Some(rest) = suffix.strip_prefix('+') {
            (1, rest)
        } else if let Some(rest) = suffix.strip_prefix('-') {
            (-1, rest)
        } else {
            return Err(TripodError::Value(format!("invalid timezone \"{suffix}\"")));
        };
        let (hh, mm) = rest
            .split_once(':')
            .ok_or_else(|| TripodError::Value(format!("invalid timezone \"{suffix}\"")))?;
        let hours: i32 = hh
            .parse()
            .map_err(|_| TripodError::Value(format!("invalid timezone \"{suffix}\"")))?;
        let minutes: i32 = mm
            .parse()
            .map_err(|_| TripodError::Value(format!("invalid timezone \"{suffix}\"")))?;
        if hours > 14 || minutes > 59 {
            return Err(TripodError::Value(format!("invalid timezone \"{suffix}\"")));
        }
        Ok(Self::Offset(sign * (hours * 60 + minutes)))
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Zulu => write!(f, "Z"),
            Self::Offset(minutes) => {
                let sign = if *minutes < 0 { '-' } else { '+' };
                let abs = minutes.abs();
                write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)
            }
        }
    }
}

// Splits a trailing timezone designator off a temporal lexical form.
fn split_timezone(lexical: &str) -> Result<(&str, Option<Timezone>)> {
    if let Some(body) = lexical.strip_suffix('Z') {
        return Ok((body, Some(Timezone::Zulu)));
    }
    // an offset is always the final six characters, ±hh:mm
    if lexical.is_ascii() && lexical.len() > 6 {
        let (body, tail) = lexical.split_at(lexical.len() - 6);
        if (tail.starts_with('+') || tail.starts_with('-')) && tail.as_bytes()[3] == b':' {
            return Ok((body, Some(Timezone::parse(tail)?)));
        }
    }
    Ok((lexical, None))
}

fn tz_suffix(timezone: &Option<Timezone>) -> String {
    timezone.map(|tz| tz.to_string()).unwrap_or_default()
}

// ------------- DateTime -------------

/// `xsd:dateTime`. Holds the civil timestamp plus the timezone as written,
/// without normalizing to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    value: NaiveDateTime,
    timezone: Option<Timezone>,
}

impl DateTime {
    pub fn new(value: NaiveDateTime, timezone: Option<Timezone>) -> Self {
        Self { value, timezone }
    }

    /// The current instant in UTC, the form stamped into entity metadata.
    pub fn now() -> Self {
        Self {
            value: Utc::now().naive_utc(),
            timezone: Some(Timezone::Zulu),
        }
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        let (body, timezone) = split_timezone(lexical.trim())?;
        let value = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| TripodError::Value(format!("\"{lexical}\" is not a valid dateTime")))?;
        Ok(Self { value, timezone })
    }

    pub fn value(&self) -> NaiveDateTime {
        self.value
    }

    pub fn timezone(&self) -> Option<Timezone> {
        self.timezone
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.value.format("%Y-%m-%dT%H:%M:%S%.f"),
            tz_suffix(&self.timezone)
        )
    }
}

// ------------- Date -------------

/// `xsd:date`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    value: NaiveDate,
    timezone: Option<Timezone>,
}

impl Date {
    pub fn new(value: NaiveDate, timezone: Option<Timezone>) -> Self {
        Self { value, timezone }
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        let (body, timezone) = split_timezone(lexical.trim())?;
        let value = NaiveDate::parse_from_str(body, "%Y-%m-%d")
            .map_err(|_| TripodError::Value(format!("\"{lexical}\" is not a valid date")))?;
        Ok(Self { value, timezone })
    }

    pub fn value(&self) -> NaiveDate {
        self.value
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.value.format("%Y-%m-%d"), tz_suffix(&self.timezone))
    }
}

// ------------- Time -------------

/// `xsd:time`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeOfDay {
    value: NaiveTime,
    timezone: Option<Timezone>,
}

impl TimeOfDay {
    pub fn new(value: NaiveTime, timezone: Option<Timezone>) -> Self {
        Self { value, timezone }
    }

    pub fn parse(lexical: &str) -> Result<Self> {
        let (body, timezone) = split_timezone(lexical.trim())?;
        let value = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
            .map_err(|_| TripodError::Value(format!("\"{lexical}\" is not a valid time")))?;
        Ok(Self { value, timezone })
    }

    pub fn value(&self) -> NaiveTime {
        self.value
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.value.format("%H:%M:%S%.f"), tz_suffix(&self.timezone))
    }
}

// ------------- Gregorian fragments -------------

macro_rules! field_err {
    ($lexical:expr, $what:literal) => {
        TripodError::Value(format!(concat!("\"{}\" is not a valid ", $what), $lexical))
    };
}

/// `xsd:gYear`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GYear {
    year: i32,
    timezone: Option<Timezone>,
}

impl GYear {
    pub fn parse(lexical: &str) -> Result<Self> {
        let caps = G_YEAR
            .captures(lexical.trim())
            .ok_or_else(|| field_err!(lexical, "gYear"))?;
        let year = caps[1].parse().map_err(|_| field_err!(lexical, "gYear"))?;
        let timezone = caps.get(2).map(|m| Timezone::parse(m.as_str())).transpose()?;
        Ok(Self { year, timezone })
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl fmt::Display for GYear {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.year < 0 {
            write!(f, "-{:04}{}", -self.year, tz_suffix(&self.timezone))
        } else {
            write!(f, "{:04}{}", self.year, tz_suffix(&self.timezone))
        }
    }
}

/// `xsd:gYearMonth`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GYearMonth {
    year: i32,
    month: u32,
    timezone: Option<Timezone>,
}

impl GYearMonth {
    pub fn parse(lexical: &str) -> Result<Self> {
        let caps = G_YEAR_MONTH
            .captures(lexical.trim())
            .ok_or_else(|| field_err!(lexical, "gYearMonth"))?;
        let year = caps[1].parse().map_err(|_| field_err!(lexical, "gYearMonth"))?;
        let month: u32 = caps[2].parse().map_err(|_| field_err!(lexical, "gYearMonth"))?;
        if !(1..=12).contains(&month) {
            return Err(field_err!(lexical, "gYearMonth"));
        }
        let timezone = caps.get(3).map(|m| Timezone::parse(m.as_str())).transpose()?;
        Ok(Self { year, month, timezone })
    }
}

impl fmt::Display for GYearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.year < 0 {
            write!(f, "-{:04}-{:02}{}", -self.year, self.month, tz_suffix(&self.timezone))
        } else {
            write!(f, "{:04}-{:02}{}", self.year, self.month, tz_suffix(&self.timezone))
        }
    }
}

/// `xsd:gMonth`, written `--MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GMonth {
    month: u32,
    timezone: Option<Timezone>,
}

impl GMonth {
    pub fn parse(lexical: &str) -> Result<Self> {
        let caps = G_MONTH
            .captures(lexical.trim())
            .ok_or_else(|| field_err!(lexical, "gMonth"))?;
        let month: u32 = caps[1].parse().map_err(|_| field_err!(lexical, "gMonth"))?;
        if !(1..=12).contains(&month) {
            return Err(field_err!(lexical, "gMonth"));
        }
        let timezone = caps.get(2).map(|m| Timezone::parse(m.as_str())).transpose()?;
        Ok(Self { month, timezone })
    }
}

impl fmt::Display for GMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "--{:02}{}", self.month, tz_suffix(&self.timezone))
    }
}

/// `xsd:gDay`, written `---DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GDay {
    day: u32,
    timezone: Option<Timezone>,
}

impl GDay {
    pub fn parse(lexical: &str) -> Result<Self> {
        let caps = G_DAY
            .captures(lexical.trim())
            .ok_or_else(|| field_err!(lexical, "gDay"))?;
        let day: u32 = caps[1].parse().map_err(|_| field_err!(lexical, "gDay"))?;
        if !(1..=31).contains(&day) {
            return Err(field_err!(lexical, "gDay"));
        }
        let timezone = caps.get(2).map(|m| Timezone::parse(m.as_str())).transpose()?;
        Ok(Self { day, timezone })
    }
}

impl fmt::Display for GDay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "---{:02}{}", self.day, tz_suffix(&self.timezone))
    }
}

/// `xsd:gMonthDay`, written `--MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GMonthDay {
    month: u32,
    day: u32,
    timezone: Option<Timezone>,
}

impl GMonthDay {
    pub fn parse(lexical: &str) -> Result<Self> {
        let caps = G_MONTH_DAY
            .captures(lexical.trim())
            .ok_or_else(|| field_err!(lexical, "gMonthDay"))?;
        let month: u32 = caps[1].parse().map_err(|_| field_err!(lexical, "gMonthDay"))?;
        let day: u32 = caps[2].parse().map_err(|_| field_err!(lexical, "gMonthDay"))?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(field_err!(lexical, "gMonthDay"));
        }
        let timezone = caps.get(3).map(|m| Timezone::parse(m.as_str())).transpose()?;
        Ok(Self { month, day, timezone })
    }
}

impl fmt::Display for GMonthDay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "--{:02}-{:02}{}", self.month, self.day, tz_suffix(&self.timezone))
    }
}

// ------------- Duration -------------

/// `xsd:duration`. Components are kept exactly as written; an absent
/// component is distinct from a zero one, so `P1Y` and `P1YT0S` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Duration {
    negative: bool,
    years: Option<u64>,
    months: Option<u64>,
    days: Option<u64>,
    hours: Option<u64>,
    minutes: Option<u64>,
    seconds: Option<BigDecimal>,
}

impl Duration {
    pub fn parse(lexical: &str) -> Result<Self> {
        let trimmed = lexical.trim();
        let caps = DURATION
            .captures(trimmed)
            .ok_or_else(|| field_err!(lexical, "duration"))?;
        let num = |i: usize| -> Result<Option<u64>> {
            caps.get(i)
                .map(|m| {
                    m.as_str()
                        .parse::<u64>()
                        .map_err(|_| field_err!(lexical, "duration"))
                })
                .transpose()
        };
        let duration = Self {
            negative: caps.get(1).is_some(),
            years: num(2)?,
            months: num(3)?,
            days: num(4)?,
            hours: num(5)?,
            minutes: num(6)?,
            seconds: caps
                .get(7)
                .map(|m| {
                    use std::str::FromStr;
                    BigDecimal::from_str(m.as_str()).map_err(|_| field_err!(lexical, "duration"))
                })
                .transpose()?,
        };
        // at least one component, and no dangling T
        if duration.years.is_none()
            && duration.months.is_none()
            && duration.days.is_none()
            && duration.hours.is_none()
            && duration.minutes.is_none()
            && duration.seconds.is_none()
        {
            return Err(field_err!(lexical, "duration"));
        }
        if trimmed.ends_with('T') {
            return Err(field_err!(lexical, "duration"));
        }
        Ok(duration)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "P")?;
        if let Some(y) = self.years {
            write!(f, "{y}Y")?;
        }
        if let Some(m) = self.months {
            write!(f, "{m}M")?;
        }
        if let Some(d) = self.days {
            write!(f, "{d}D")?;
        }
        if self.hours.is_some() || self.minutes.is_some() || self.seconds.is_some() {
            write!(f, "T")?;
            if let Some(h) = self.hours {
                write!(f, "{h}H")?;
            }
            if let Some(m) = self.minutes {
                write!(f, "{m}M")?;
            }
            if let Some(s) = &self.seconds {
                write!(f, "{s}S")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_round_trips_with_timezone() {
        for lexical in [
            "2024-03-01T12:30:00",
            "2024-03-01T12:30:00.250Z",
            "2024-03-01T12:30:00+02:00",
            "2024-03-01T12:30:00-05:30",
        ] {
            let parsed = DateTime::parse(lexical).unwrap();
            assert_eq!(parsed.to_string(), lexical);
        }
        assert!(DateTime::parse("2024-03-01").is_err());
        assert!(DateTime::parse("not a date").is_err());
    }

    #[test]
    fn zulu_differs_from_zero_offset() {
        let z = DateTime::parse("2024-03-01T12:00:00Z").unwrap();
        let o = DateTime::parse("2024-03-01T12:00:00+00:00").unwrap();
        assert_ne!(z, o);
    }

    #[test]
    fn gregorian_fragments_round_trip() {
        assert_eq!(GYear::parse("1984").unwrap().to_string(), "1984");
        assert_eq!(GYearMonth::parse("1984-07Z").unwrap().to_string(), "1984-07Z");
        assert_eq!(GMonth::parse("--07").unwrap().to_string(), "--07");
        assert_eq!(GDay::parse("---21").unwrap().to_string(), "---21");
        assert_eq!(GMonthDay::parse("--07-21").unwrap().to_string(), "--07-21");
        assert!(GMonth::parse("--13").is_err());
        assert!(GDay::parse("---32").is_err());
    }

    #[test]
    fn duration_components_are_preserved() {
        for lexical in ["P1Y2M3DT4H5M6.7S", "P1Y", "PT0.5S", "-P30D"] {
            let parsed = Duration::parse(lexical).unwrap();
            assert_eq!(parsed.to_string(), lexical);
        }
        assert!(Duration::parse("P").is_err());
        assert!(Duration::parse("P1YT").is_err());
        assert_ne!(Duration::parse("P1Y").unwrap(), Duration::parse("P1YT0S").unwrap());
    }
}
