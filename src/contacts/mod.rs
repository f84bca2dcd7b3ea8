//! Contact resolution: map a user-typed recipient token to a phone number.
//!
//! Resolution order: a token that already is a number wins, then the
//! in-memory contact book (verbatim, case-sensitive), then the optional
//! CSV source (streamed, case-insensitive). The book and the CSV source
//! are shared by all profiles.

mod csv_source;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::domain::{CountryCode, PhoneNumber, ValidationError};

pub use csv_source::CsvContacts;

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    /// The token matched neither a number, a book entry, nor a CSV row.
    #[error("receiver '{token}' could not be resolved to a phone number")]
    ReceiverNotFound { token: String },

    /// The configured CSV file could not be opened.
    #[error("contacts CSV file is not available at {path}: {source}")]
    CsvUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV file is unreadable, misses a configured column, or carries
    /// a number value that does not normalize.
    #[error("error in contacts CSV file {path}: {reason}")]
    CsvMalformed { path: PathBuf, reason: String },

    /// A contact book entry stored a value that is not a phone number.
    #[error("contact resolution failed: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// In-memory `name -> raw number` mapping from the configuration file.
pub struct ContactBook(BTreeMap<String, String>);

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, number: impl Into<String>) {
        self.0.insert(name.into(), number.into());
    }

    /// Verbatim, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for ContactBook {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolve a recipient token to a normalized phone number.
///
/// A token that itself normalizes to a valid number always takes precedence
/// over a same-named contact. Leading-zero substitution is applied on every
/// path whenever a country code is available.
pub fn resolve_receiver(
    token: &str,
    book: &ContactBook,
    csv: Option<&CsvContacts>,
    country_code: Option<&CountryCode>,
) -> Result<PhoneNumber, ContactError> {
    if let Ok(number) = PhoneNumber::normalize(token, country_code, true) {
        return Ok(number);
    }

    if let Some(raw) = book.get(token) {
        return Ok(PhoneNumber::normalize(raw, country_code, true)?);
    }

    if let Some(source) = csv {
        if let Some(raw) = source.lookup(token)? {
            return PhoneNumber::normalize(&raw, country_code, true).map_err(|err| {
                ContactError::CsvMalformed {
                    path: source.path().to_owned(),
                    reason: format!("number for '{token}': {err}"),
                }
            });
        }
    }

    Err(ContactError::ReceiverNotFound {
        token: token.to_owned(),
    })
}

/// Merge the CSV source and the contact book into one sorted listing.
///
/// The book is applied last and wins on duplicate names.
pub fn all_contacts(
    book: &ContactBook,
    csv: Option<&CsvContacts>,
) -> Result<Vec<(String, String)>, ContactError> {
    let mut merged = BTreeMap::new();
    if let Some(source) = csv {
        for (name, number) in source.scan_all()? {
            merged.insert(name, number);
        }
    }
    for (name, number) in book.iter() {
        merged.insert(name.clone(), number.clone());
    }
    Ok(merged.into_iter().collect())
}
