//! Configuration store: a JSON file with `#` comments.
//!
//! Top-level keys are either tool-wide (`default_profile`, `settings`,
//! `contacts`, `contacts_csv`) or profile sections. The store is read-only
//! once loaded; the core only needs key/value lookup by section and field.

pub mod profile;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::contacts::{ContactBook, CsvContacts};

pub use profile::{ResolvedProfile, SecretPrompt, StdinPrompt, resolve_profile};

/// Example configuration written on first run.
pub const EXAMPLE_CONFIG: &str = r#"# smsl configuration.
# '#' starts a comment; the rest of the line is ignored.
# Edit this file according to your preferences.

{
"default_profile": "example",

# Values shared by all profiles live in "settings".
#"settings": {
#    "country_code": "+1"
#    },

#"contacts": {
#    "dude": "+1234567890"
#    },

#"contacts_csv": {
#    "file": "~/contacts.csv",
#    "colreceiver": "name",       # column with receiver names
#    "colreceiver2": "nickname",  # optional second name column
#    "colnumber": "mobile"        # column with the number
#    },

"example": {
    # Request url of the provider gateway. {name} fields are substituted
    # before sending; {to} and {text} are mandatory.
    "url": "https://www.x.com/sendsms?user={user}&pw={pw}&to={to}&from={from}&text={text}",
    #"print_answer": true,    # print the raw answer from the server
    #"history": null,         # append all sent sms to this file
    #"country_code": null,    # replaces a leading zero, e.g. "+1"
    # Default values for the {name} fields above.
    "user": "your_username",
    "pw": "your_password",
    "from": "your_phone_number"
    }
}
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write example config file {path}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid '{section}' section: {reason}")]
    InvalidSection { section: String, reason: String },

    #[error("no profile selected and no default_profile configured")]
    NoProfileSelected,

    #[error("profile section '{name}' not found in the configuration")]
    UnknownProfile { name: String },

    #[error("profile '{profile}' has no '{field}' field (settings section checked too)")]
    MissingField { profile: String, field: String },

    #[error("invalid url template: {reason}")]
    InvalidUrlTemplate { reason: String },

    #[error("invalid value for '{field}' in profile '{profile}': {reason}")]
    InvalidField {
        profile: String,
        field: String,
        reason: String,
    },

    #[error("failed to read '{field}' from the terminal: {source}")]
    Prompt {
        field: String,
        #[source]
        source: std::io::Error,
    },
}

/// `contacts_csv` section layout; column names follow the original file
/// format so existing configurations keep working.
#[derive(Debug, Clone, Deserialize)]
struct CsvSection {
    file: String,
    colreceiver: String,
    #[serde(default)]
    colreceiver2: Option<String>,
    colnumber: String,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    root: serde_json::Map<String, Value>,
}

impl ConfigStore {
    /// Primary configuration path, `<config_dir>/smsl.json`.
    pub fn primary_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smsl.json")
    }

    /// Legacy fallback location, `~/.smsl.json`.
    pub fn legacy_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".smsl.json"))
    }

    /// Load the configuration from the primary path, falling back to the
    /// legacy location. When neither exists, an example file is written to
    /// the primary path and loaded.
    pub fn load_default() -> Result<Self, ConfigError> {
        let primary = Self::primary_path();
        if primary.exists() {
            return Self::load(&primary);
        }
        if let Some(legacy) = Self::legacy_path() {
            if legacy.exists() {
                tracing::debug!("using legacy config file at {}", legacy.display());
                return Self::load(&legacy);
            }
        }
        Self::bootstrap(&primary)?;
        eprintln!(
            "Created an example configuration at {} which must be adapted.",
            primary.display()
        );
        Self::load(&primary)
    }

    /// Write the example configuration to `path`, creating parent
    /// directories as needed.
    pub fn bootstrap(path: &Path) -> Result<(), ConfigError> {
        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, EXAMPLE_CONFIG)
        };
        write(path).map_err(|source| ConfigError::Bootstrap {
            path: path.to_owned(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let root = serde_json::from_str(&strip_comments(&content)).map_err(|source| {
            ConfigError::Parse {
                path: path.to_owned(),
                source,
            }
        })?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(Self {
            path: path.to_owned(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.root.get(name).is_some_and(Value::is_object)
    }

    /// Raw field lookup by section and key.
    pub fn field(&self, section: &str, key: &str) -> Option<&Value> {
        self.root.get(section)?.as_object()?.get(key)
    }

    /// Field lookup rendered as a string; objects, arrays, and null are
    /// treated as absent.
    pub fn string_field(&self, section: &str, key: &str) -> Option<String> {
        value_to_string(self.field(section, key)?)
    }

    pub fn bool_field(&self, section: &str, key: &str) -> Option<bool> {
        self.field(section, key)?.as_bool()
    }

    pub fn default_profile(&self) -> Option<&str> {
        self.root.get("default_profile")?.as_str()
    }

    /// Pick the profile section: explicit selector first, then the
    /// configured default.
    pub fn select_profile<'a>(&'a self, selector: Option<&'a str>) -> Result<&'a str, ConfigError> {
        let name = selector
            .or_else(|| self.default_profile())
            .ok_or(ConfigError::NoProfileSelected)?;
        if !self.has_section(name) {
            return Err(ConfigError::UnknownProfile {
                name: name.to_owned(),
            });
        }
        Ok(name)
    }

    /// The in-memory contact book from the `contacts` section.
    pub fn contacts(&self) -> Result<ContactBook, ConfigError> {
        let Some(value) = self.root.get("contacts") else {
            return Ok(ContactBook::new());
        };
        let entries = value.as_object().ok_or_else(|| ConfigError::InvalidSection {
            section: "contacts".to_owned(),
            reason: "expected an object of name/number pairs".to_owned(),
        })?;

        let mut book = ContactBook::new();
        for (name, number) in entries {
            let number = value_to_string(number).ok_or_else(|| ConfigError::InvalidSection {
                section: "contacts".to_owned(),
                reason: format!("contact '{name}' must map to a string"),
            })?;
            book.insert(name.clone(), number);
        }
        Ok(book)
    }

    /// The CSV contact source from the `contacts_csv` section, if any.
    pub fn csv_contacts(&self) -> Result<Option<CsvContacts>, ConfigError> {
        let Some(value) = self.root.get("contacts_csv") else {
            return Ok(None);
        };
        let section: CsvSection =
            serde_json::from_value(value.clone()).map_err(|err| ConfigError::InvalidSection {
                section: "contacts_csv".to_owned(),
                reason: err.to_string(),
            })?;
        Ok(Some(CsvContacts::new(
            expand_home(section.file.trim()),
            section.colreceiver.trim().to_owned(),
            section.colreceiver2.map(|col| col.trim().to_owned()),
            section.colnumber.trim().to_owned(),
        )))
    }
}

/// Drop everything from the first `#` on each line.
pub fn strip_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        if path == "~" {
            return home;
        }
        if let Some(rest) = path.strip_prefix("~/") {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_from(content: &str) -> ConfigStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smsl.json");
        std::fs::write(&path, content).unwrap();
        ConfigStore::load(&path).unwrap()
    }

    #[test]
    fn strip_comments_keeps_json_intact() {
        let content = "{\n\"a\": 1, # trailing\n# whole line\n\"b\": \"x\"\n}";
        let stripped = strip_comments(content);
        let value: Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], "x");
    }

    #[test]
    fn example_config_parses_after_comment_stripping() {
        let value: Value = serde_json::from_str(&strip_comments(EXAMPLE_CONFIG)).unwrap();
        assert_eq!(value["default_profile"], "example");
        assert!(value["example"]["url"].as_str().unwrap().contains("{to}"));
    }

    #[test]
    fn bootstrap_writes_loadable_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("smsl.json");
        ConfigStore::bootstrap(&path).unwrap();
        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.default_profile(), Some("example"));
        assert!(store.has_section("example"));
    }

    #[test]
    fn field_lookup_by_section_and_key() {
        let store = store_from(
            r#"{"default_profile": "p", "p": {"url": "https://x/?to={to}&text={text}", "port": 8080, "flag": true}}"#,
        );
        assert!(store.has_section("p"));
        assert!(!store.has_section("default_profile"));
        assert_eq!(
            store.string_field("p", "url").as_deref(),
            Some("https://x/?to={to}&text={text}")
        );
        assert_eq!(store.string_field("p", "port").as_deref(), Some("8080"));
        assert_eq!(store.string_field("p", "flag").as_deref(), Some("true"));
        assert_eq!(store.bool_field("p", "flag"), Some(true));
        assert_eq!(store.string_field("p", "missing"), None);
        assert_eq!(store.string_field("q", "url"), None);
    }

    #[test]
    fn select_profile_falls_back_to_default() {
        let store = store_from(r#"{"default_profile": "p", "p": {}, "q": {}}"#);
        assert_eq!(store.select_profile(None).unwrap(), "p");
        assert_eq!(store.select_profile(Some("q")).unwrap(), "q");
        assert!(matches!(
            store.select_profile(Some("r")),
            Err(ConfigError::UnknownProfile { name }) if name == "r"
        ));
    }

    #[test]
    fn select_profile_without_any_candidate_fails() {
        let store = store_from(r#"{"p": {}}"#);
        assert!(matches!(
            store.select_profile(None),
            Err(ConfigError::NoProfileSelected)
        ));
    }

    #[test]
    fn contacts_section_builds_a_book() {
        let store = store_from(r#"{"contacts": {"dude": "+1234567890"}}"#);
        let book = store.contacts().unwrap();
        assert_eq!(book.get("dude"), Some("+1234567890"));

        let empty = store_from(r#"{}"#).contacts().unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn malformed_contacts_section_is_rejected() {
        let store = store_from(r#"{"contacts": {"dude": ["+1"]}}"#);
        assert!(matches!(
            store.contacts(),
            Err(ConfigError::InvalidSection { section, .. }) if section == "contacts"
        ));
    }

    #[test]
    fn csv_section_builds_a_source() {
        let store = store_from(
            r#"{"contacts_csv": {"file": "contacts.csv", "colreceiver": "name", "colnumber": "mobile"}}"#,
        );
        let csv = store.csv_contacts().unwrap().unwrap();
        assert_eq!(csv.path(), Path::new("contacts.csv"));

        assert!(store_from(r#"{}"#).csv_contacts().unwrap().is_none());
    }

    #[test]
    fn csv_section_missing_column_config_is_rejected() {
        let store = store_from(r#"{"contacts_csv": {"file": "contacts.csv"}}"#);
        assert!(matches!(
            store.csv_contacts(),
            Err(ConfigError::InvalidSection { section, .. }) if section == "contacts_csv"
        ));
    }
}
