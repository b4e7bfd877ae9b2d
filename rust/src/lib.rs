//! iceland: kennitala validation, formatting and synthesis, plus postal code lookup.
//!
//! A kennitala is the 10-digit Icelandic national identification number
//! given to both individuals and organizations.
//!
//! # Format
//!
//! ```text
//! KENNITALA ::= DAY MONTH YEAR SEQ CHECK CENTURY
//! DAY       ::= 01..31 (person) | 41..71 (company)
//! CENTURY   ::= "9" (1900s) | "8" (1800s) | "0" (2000s)
//! ```
//!
//! # Example
//!
//! ```
//! use iceland::{EntityKind, Kennitala, find_locale};
//!
//! let kt: Kennitala = "010130-2989".parse().expect("valid kennitala");
//! assert_eq!(kt.entity_kind(), EntityKind::Person);
//! assert_eq!(kt.year(), 1930);
//! assert_eq!(kt.display("-"), "010130-2989");
//!
//! let company = Kennitala::generate(true);
//! assert!(company.is_company());
//!
//! assert_eq!(find_locale(310u16, false), Some("Borgarnesi"));
//! ```

mod kennitala;
mod postal_code;

pub use kennitala::{
    COMPANY_DAY_OFFSET, DEFAULT_SEPARATOR, EntityKind, KENNITALA_LEN, Kennitala, KennitalaError,
    KennitalaGen, check_digit, checksum,
};
#[allow(deprecated)]
pub use postal_code::{
    AsPostalCode, Locale, PostalCodeEntry, PostalCodeError, PostalCodes, all_postal_codes,
    find_locale, list_postal_codes, locale_by_postal_code,
};
