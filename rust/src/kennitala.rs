//! Kennitala (Icelandic national identification number) parsing and synthesis.
//!
//! Format: `DDMMYYSSCK`
//!
//! - `DD` day of month, plus 40 for companies
//! - `MM` month
//! - `YY` year within the century
//! - `SS` sequence number
//! - `C` check digit over the first eight digits
//! - `K` century marker (`9` = 1900s, `8` = 1800s, `0` = 2000s)
//!
//! The generator implements `Iterator<Item = Kennitala>`.
//! Use `next_kennitala()` for the explicit domain API.

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use rand::random_range;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors that can occur during kennitala operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KennitalaError {
    #[error("Kennitala is invalid")]
    Invalid,
    #[error("{0}")]
    Usage(String),
}

/// Why a candidate was rejected. Only ever logged; callers see `KennitalaError::Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Length(usize),
    Checksum,
    Century,
    DayRange,
    Calendar,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(n) => write!(f, "expected 10 digits, got {n}"),
            Self::Checksum => f.write_str("check digit mismatch"),
            Self::Century => f.write_str("unknown century marker"),
            Self::DayRange => f.write_str("day field out of range"),
            Self::Calendar => f.write_str("not a calendar date"),
        }
    }
}

/// Whether a kennitala belongs to an individual or an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Company,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Company => "company",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "person" => Some(Self::Person),
            "company" => Some(Self::Company),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of digits in a canonical kennitala.
pub const KENNITALA_LEN: usize = 10;
/// Separator used by [`Kennitala::pretty`].
pub const DEFAULT_SEPARATOR: &str = " ";
/// Offset added to the day field of a company kennitala.
pub const COMPANY_DAY_OFFSET: u32 = 40;

const WEIGHTS: [u32; 8] = [3, 2, 7, 6, 5, 4, 3, 2];
// Century markers as drawn by the generator; 1900s and 2000s twice as likely as 1800s.
const CENTURY_MARKERS: [u32; 6] = [9, 9, 9, 8, 0, 0];
// February is fixed at 28 so the generator never has to reason about leap years.
const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const MAX_SEQUENCE_ATTEMPTS: usize = 4096;

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").unwrap());

fn digit_values(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}

/// Weighted checksum of the first eight digits.
///
/// Returns `None` if `first_eight` has fewer than eight leading ASCII digits.
pub fn checksum(first_eight: &str) -> Option<u32> {
    let digits = digit_values(first_eight.get(..8)?)?;
    Some(WEIGHTS.iter().zip(&digits).map(|(w, d)| w * d).sum())
}

/// Check digit for the first eight digits of a kennitala.
///
/// Returns `None` when no single check digit exists: a remainder of 10
/// is always invalid, and a remainder of 1 would need the two-digit value 10.
pub fn check_digit(first_eight: &str) -> Option<u32> {
    match checksum(first_eight)? % 11 {
        0 => Some(0),
        1 | 10 => None,
        r => Some(11 - r),
    }
}

fn century_base(marker: u32) -> Option<i32> {
    match marker {
        0 => Some(2000),
        8 | 9 => Some(1000 + 100 * marker as i32),
        _ => None,
    }
}

fn split_day(raw_day: u32) -> Option<(EntityKind, u32)> {
    match raw_day {
        0..=31 => Some((EntityKind::Person, raw_day)),
        41..=71 => Some((EntityKind::Company, raw_day - COMPANY_DAY_OFFSET)),
        _ => None,
    }
}

fn sanitize(input: &str) -> String {
    NON_DIGITS.replace_all(input, "").into_owned()
}

fn two_digits(s: &str, start: usize) -> u32 {
    s[start..start + 2]
        .chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0, |acc, d| acc * 10 + d)
}

fn validate(digits: &str) -> Result<NaiveDate, Rejection> {
    if digits.len() != KENNITALA_LEN {
        return Err(Rejection::Length(digits.len()));
    }

    let expected = check_digit(digits).ok_or(Rejection::Checksum)?;
    let actual = digits[8..9].parse::<u32>().map_err(|_| Rejection::Checksum)?;
    if expected != actual {
        return Err(Rejection::Checksum);
    }

    let marker = digits[9..10].parse::<u32>().map_err(|_| Rejection::Century)?;
    let year = century_base(marker).ok_or(Rejection::Century)? + two_digits(digits, 4) as i32;
    let (_, day) = split_day(two_digits(digits, 0)).ok_or(Rejection::DayRange)?;
    let month = two_digits(digits, 2);

    NaiveDate::from_ymd_opt(year, month, day).ok_or(Rejection::Calendar)
}

/// A validated kennitala.
///
/// Holds the 10-digit canonical form and the date it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kennitala {
    value: String,
    date: NaiveDate,
}

impl Kennitala {
    /// Parse a kennitala, discarding every character that is not an ASCII digit.
    pub fn parse(input: &str) -> Result<Self, KennitalaError> {
        let value = sanitize(input);
        match validate(&value) {
            Ok(date) => Ok(Self { value, date }),
            Err(reason) => {
                debug!(%reason, "rejected kennitala");
                Err(KennitalaError::Invalid)
            }
        }
    }

    /// Build a kennitala from a loosely typed value.
    ///
    /// Strings are parsed and `false` generates a random kennitala, a company
    /// one when `is_company` is set. Anything else is a usage error.
    pub fn from_value(
        value: &serde_json::Value,
        is_company: bool,
    ) -> Result<Self, KennitalaError> {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Bool(false) => Ok(Self::generate(is_company)),
            _ => Err(KennitalaError::Usage(
                "Kennitala needs to be provided as a string or boolean false".to_string(),
            )),
        }
    }

    /// Generate a random, valid kennitala.
    pub fn generate(is_company: bool) -> Self {
        let kind = if is_company {
            EntityKind::Company
        } else {
            EntityKind::Person
        };
        KennitalaGen::new(kind).next_kennitala()
    }

    pub fn generate_person() -> Self {
        Self::generate(false)
    }

    pub fn generate_company() -> Self {
        Self::generate(true)
    }

    fn raw_day(&self) -> u32 {
        two_digits(&self.value, 0)
    }

    /// Person or company, decided by the day field.
    pub fn entity_kind(&self) -> EntityKind {
        if self.is_company() {
            EntityKind::Company
        } else {
            EntityKind::Person
        }
    }

    pub fn is_company(&self) -> bool {
        matches!(self.raw_day(), 41..=71)
    }

    pub fn is_person(&self) -> bool {
        self.raw_day() < 32
    }

    /// Year of birth or registration.
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Day of month, with the company offset removed.
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn to_date(&self) -> NaiveDate {
        self.date
    }

    /// Age in whole years as of today (local time).
    pub fn age(&self) -> i32 {
        self.age_on(Local::now().date_naive())
    }

    /// Age in whole years as of `today`. The count goes up on the anniversary itself.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let born = self.date;
        let mut years = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        years
    }

    /// Canonical form with `separator` between the date and the rest, e.g. `010130-2989`.
    pub fn display(&self, separator: &str) -> String {
        format!("{}{}{}", &self.value[..6], separator, &self.value[6..])
    }

    /// Canonical form split by a single space.
    pub fn pretty(&self) -> String {
        self.display(DEFAULT_SEPARATOR)
    }

    /// The 10-digit canonical form.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Kennitala {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Kennitala {
    type Err = KennitalaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Kennitala {
    type Error = KennitalaError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl AsRef<str> for Kennitala {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl Serialize for Kennitala {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for Kennitala {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Random kennitala generator for test data. Not suitable for anything security related.
pub struct KennitalaGen {
    kind: EntityKind,
    today: Option<NaiveDate>,
}

impl KennitalaGen {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind, today: None }
    }

    /// Pin the date used to cap 2000s birth years.
    pub fn with_today(kind: EntityKind, today: NaiveDate) -> Self {
        Self {
            kind,
            today: Some(today),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn current_year_in_century(&self) -> u32 {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        today.year().rem_euclid(100) as u32
    }

    fn sequence_and_check(first_six: &str) -> (u32, u32) {
        for attempt in 0..MAX_SEQUENCE_ATTEMPTS {
            let sequence = random_range(1..=99u32);
            if let Some(check) = check_digit(&format!("{first_six}{sequence:02}")) {
                return (sequence, check);
            }
            trace!(attempt, sequence, "no check digit for sequence, retrying");
        }

        warn!(first_six, "random sequence attempts exhausted, scanning");
        (1..=99u32)
            .find_map(|sequence| {
                check_digit(&format!("{first_six}{sequence:02}")).map(|check| (sequence, check))
            })
            // Varying the last sequence digit alone walks ten distinct remainders mod 11.
            .unwrap_or((1, 0))
    }

    /// Generate the next kennitala (domain API).
    pub fn next_kennitala(&mut self) -> Kennitala {
        let marker = CENTURY_MARKERS[random_range(0..CENTURY_MARKERS.len())];
        let year = if marker == 0 {
            random_range(0..=self.current_year_in_century())
        } else {
            random_range(0..=99u32)
        };

        let month = random_range(1..=12u32);
        let mut day = random_range(1..=MONTH_DAYS[month as usize - 1]);
        if self.kind == EntityKind::Company {
            day += COMPANY_DAY_OFFSET;
        }

        let first_six = format!("{day:02}{month:02}{year:02}");
        let (sequence, check) = Self::sequence_and_check(&first_six);
        let candidate = format!("{first_six}{sequence:02}{check}{marker}");

        Kennitala::parse(&candidate).expect("generated kennitala should always be valid")
    }

    /// Generate n kennitalas.
    pub fn next_n(&mut self, n: usize) -> Vec<Kennitala> {
        self.take(n).collect()
    }
}

impl Default for KennitalaGen {
    fn default() -> Self {
        Self::new(EntityKind::Person)
    }
}

impl Iterator for KennitalaGen {
    type Item = Kennitala;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_kennitala())
    }
}
