//! Icelandic postal code lookup.
//!
//! Locale names are stored in the nominative case with an optional dative
//! form ("í Borgarnesi" rather than "Borgarnes"). Lookups return the dative
//! form unless the nominative one is asked for or no dative form exists.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

static BUNDLED_JSON: &str = include_str!("../../data/postcodes.json");

static BUNDLED: Lazy<PostalCodes> =
    Lazy::new(|| PostalCodes::from_json(BUNDLED_JSON).expect("bundled postal codes are valid"));

#[derive(Error, Debug)]
/// Errors that can occur while loading a postal code table.
pub enum PostalCodeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Postal code table is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single postal code entry as stored in the table.
pub struct Locale {
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dative: Option<String>,
    #[serde(default)]
    pub is_po_box: bool,
}

impl Locale {
    /// Locale name in the requested case, falling back to nominative.
    pub fn name(&self, nominative: bool) -> &str {
        match &self.dative {
            Some(dative) if !nominative => dative,
            _ => &self.locale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A postal code paired with its locale name, as returned by listings.
pub struct PostalCodeEntry {
    pub postal_code: u16,
    pub locale: String,
}

/// Anything that can be read as a postal code.
///
/// Text is read up to the first non-digit after leading whitespace, so
/// `"900"` and `"900 Vestmannaeyjar"` both mean 900.
pub trait AsPostalCode {
    fn as_postal_code(&self) -> Option<u16>;
}

impl AsPostalCode for u16 {
    fn as_postal_code(&self) -> Option<u16> {
        Some(*self)
    }
}

impl AsPostalCode for u32 {
    fn as_postal_code(&self) -> Option<u16> {
        u16::try_from(*self).ok()
    }
}

impl AsPostalCode for i32 {
    fn as_postal_code(&self) -> Option<u16> {
        u16::try_from(*self).ok()
    }
}

impl AsPostalCode for i64 {
    fn as_postal_code(&self) -> Option<u16> {
        u16::try_from(*self).ok()
    }
}

impl AsPostalCode for str {
    fn as_postal_code(&self) -> Option<u16> {
        let trimmed = self.trim_start();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        trimmed[..end].parse().ok()
    }
}

impl AsPostalCode for String {
    fn as_postal_code(&self) -> Option<u16> {
        self.as_str().as_postal_code()
    }
}

impl<T: AsPostalCode + ?Sized> AsPostalCode for &T {
    fn as_postal_code(&self) -> Option<u16> {
        (**self).as_postal_code()
    }
}

/// An immutable postal code table, ordered by code.
#[derive(Debug, Clone, Default)]
pub struct PostalCodes {
    codes: BTreeMap<u16, Locale>,
}

impl PostalCodes {
    /// Load a table from a JSON object keyed by postal code.
    pub fn from_json(json: &str) -> Result<Self, PostalCodeError> {
        let codes: BTreeMap<u16, Locale> = serde_json::from_str(json)?;
        if codes.is_empty() {
            return Err(PostalCodeError::Empty);
        }
        Ok(Self { codes })
    }

    /// The table compiled into this crate.
    pub fn bundled() -> &'static PostalCodes {
        &BUNDLED
    }

    pub fn get(&self, code: impl AsPostalCode) -> Option<&Locale> {
        self.codes.get(&code.as_postal_code()?)
    }

    /// Find the locale name for a postal code. Unknown codes yield `None`.
    pub fn find_locale(&self, code: impl AsPostalCode, nominative: bool) -> Option<&str> {
        self.get(code).map(|locale| locale.name(nominative))
    }

    /// All postal codes in ascending order, P.O. boxes only when asked for.
    pub fn list(&self, include_po_boxes: bool, nominative: bool) -> Vec<PostalCodeEntry> {
        self.codes
            .iter()
            .filter(|(_, locale)| include_po_boxes || !locale.is_po_box)
            .map(|(code, locale)| PostalCodeEntry {
                postal_code: *code,
                locale: locale.name(nominative).to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Find a locale name in the bundled table.
pub fn find_locale(code: impl AsPostalCode, nominative: bool) -> Option<&'static str> {
    PostalCodes::bundled().find_locale(code, nominative)
}

/// List the bundled table.
pub fn list_postal_codes(include_po_boxes: bool, nominative: bool) -> Vec<PostalCodeEntry> {
    PostalCodes::bundled().list(include_po_boxes, nominative)
}

#[deprecated(note = "use `find_locale` instead")]
pub fn locale_by_postal_code(code: impl AsPostalCode, force_nominative: bool) -> Option<&'static str> {
    find_locale(code, force_nominative)
}

#[deprecated(note = "use `list_postal_codes` instead")]
pub fn all_postal_codes(include_po_boxes: bool, force_nominative: bool) -> Vec<PostalCodeEntry> {
    list_postal_codes(include_po_boxes, force_nominative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_locale_dative_by_default() {
        assert_eq!(find_locale(310u16, false), Some("Borgarnesi"));
        assert_eq!(find_locale(310u16, true), Some("Borgarnes"));
        assert_ne!(find_locale(310u16, false), find_locale(310u16, true));
    }

    #[test]
    fn test_find_locale_unknown() {
        assert_eq!(find_locale(9999u16, false), None);
        assert_eq!(find_locale(-1i32, false), None);
        assert_eq!(find_locale("kisa", false), None);
    }

    #[test]
    fn test_find_locale_accepts_text() {
        assert_eq!(find_locale("900", false), Some("Vestmannaeyjum"));
        assert_eq!(find_locale(" 900 Vestmannaeyjar", true), Some("Vestmannaeyjar"));
        assert_eq!(find_locale(&"310".to_string(), false), Some("Borgarnesi"));
    }

    #[test]
    fn test_nominative_fallback_without_dative() {
        assert_eq!(find_locale(101u16, false), Some("Reykjavík"));
        assert_eq!(find_locale(101u16, true), Some("Reykjavík"));
    }

    #[test]
    fn test_list_excludes_po_boxes_by_default() {
        let without = list_postal_codes(false, false);
        let with = list_postal_codes(true, false);
        assert!(without.len() < with.len());
        assert!(without.iter().all(|p| p.postal_code != 121));
        assert!(with.iter().any(|p| p.postal_code == 121));
        assert_eq!(with.len(), PostalCodes::bundled().len());
    }

    #[test]
    fn test_list_is_ordered() {
        let codes: Vec<u16> = list_postal_codes(true, false)
            .iter()
            .map(|p| p.postal_code)
            .collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn test_list_nominative_differs_for_some() {
        let dative = list_postal_codes(false, false);
        let nominative = list_postal_codes(false, true);
        assert_eq!(dative.len(), nominative.len());
        let differing = dative
            .iter()
            .zip(&nominative)
            .filter(|(d, n)| d.locale != n.locale)
            .count();
        assert_ne!(differing, 0);
        assert_ne!(differing, dative.len());
    }

    #[test]
    fn test_every_listed_code_resolves() {
        for p in list_postal_codes(true, false) {
            assert_eq!(find_locale(p.postal_code, false), Some(p.locale.as_str()));
        }
    }

    #[test]
    #[allow(deprecated)]
    fn test_deprecated_aliases() {
        assert_eq!(all_postal_codes(true, true), list_postal_codes(true, true));
        assert_eq!(locale_by_postal_code(310u16, false), find_locale(310u16, false));
        assert_eq!(locale_by_postal_code("310", true), Some("Borgarnes"));
    }

    #[test]
    fn test_custom_table() {
        let table = PostalCodes::from_json(
            r#"{"1": {"locale": "Staður", "dative": "Stað"}, "2": {"locale": "Box", "is_po_box": true}}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.find_locale(1u16, false), Some("Stað"));
        assert_eq!(table.list(false, false).len(), 1);
        assert!(table.get(2u16).unwrap().is_po_box);
    }

    #[test]
    fn test_invalid_tables() {
        assert!(matches!(
            PostalCodes::from_json("not json"),
            Err(PostalCodeError::Json(_))
        ));
        assert!(matches!(
            PostalCodes::from_json("{}"),
            Err(PostalCodeError::Empty)
        ));
    }
}
