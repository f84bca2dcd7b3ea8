use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::ContactError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// External CSV contact source.
///
/// The file is never loaded into memory as a whole; every lookup streams
/// rows until the first match, a full listing streams them all.
pub struct CsvContacts {
    path: PathBuf,
    receiver_column: String,
    receiver_column_alt: Option<String>,
    number_column: String,
}

impl CsvContacts {
    pub fn new(
        path: impl Into<PathBuf>,
        receiver_column: impl Into<String>,
        receiver_column_alt: Option<String>,
        number_column: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            receiver_column: receiver_column.into(),
            receiver_column_alt: receiver_column_alt.filter(|col| !col.trim().is_empty()),
            number_column: number_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<csv::Reader<File>, ContactError> {
        let file = File::open(&self.path).map_err(|source| ContactError::CsvUnavailable {
            path: self.path.clone(),
            source,
        })?;
        Ok(csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file))
    }

    fn malformed(&self, reason: impl fmt::Display) -> ContactError {
        ContactError::CsvMalformed {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Indexes of (receiver, optional alternate receiver, number) columns.
    fn column_indexes(
        &self,
        headers: &csv::StringRecord,
    ) -> Result<(usize, Option<usize>, usize), ContactError> {
        let position = |name: &str| -> Result<usize, ContactError> {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| self.malformed(format_args!("column '{name}' not found in header")))
        };

        let receiver = position(&self.receiver_column)?;
        let receiver_alt = self
            .receiver_column_alt
            .as_deref()
            .map(|name| position(name))
            .transpose()?;
        let number = position(&self.number_column)?;
        Ok((receiver, receiver_alt, number))
    }

    /// Find the number for `token`, comparing names case-insensitively.
    ///
    /// Scanning stops at the first row whose primary (or, when configured,
    /// alternate) receiver column matches.
    pub fn lookup(&self, token: &str) -> Result<Option<String>, ContactError> {
        let mut reader = self.open()?;
        let headers = reader
            .headers()
            .map_err(|err| self.malformed(err))?
            .clone();
        let (receiver, receiver_alt, number) = self.column_indexes(&headers)?;

        let wanted = token.to_lowercase();
        for record in reader.records() {
            let record = record.map_err(|err| self.malformed(err))?;
            let name_matches = |idx: usize| {
                record
                    .get(idx)
                    .is_some_and(|name| !name.is_empty() && name.to_lowercase() == wanted)
            };
            if name_matches(receiver) || receiver_alt.is_some_and(name_matches) {
                let value = record.get(number).ok_or_else(|| {
                    self.malformed(format_args!(
                        "row matching '{token}' has no value in column '{}'",
                        self.number_column
                    ))
                })?;
                return Ok(Some(value.to_owned()));
            }
        }
        Ok(None)
    }

    /// All `(name, number)` pairs from the file, in row order.
    ///
    /// Rows with an empty name cell are skipped; when an alternate receiver
    /// column is configured its entry is emitted after the primary one.
    pub fn scan_all(&self) -> Result<Vec<(String, String)>, ContactError> {
        let mut reader = self.open()?;
        let headers = reader
            .headers()
            .map_err(|err| self.malformed(err))?
            .clone();
        let (receiver, receiver_alt, number) = self.column_indexes(&headers)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| self.malformed(err))?;
            let Some(value) = record.get(number) else {
                continue;
            };
            for idx in [Some(receiver), receiver_alt].into_iter().flatten() {
                if let Some(name) = record.get(idx) {
                    if !name.is_empty() {
                        entries.push((name.to_owned(), value.to_owned()));
                    }
                }
            }
        }
        Ok(entries)
    }
}
