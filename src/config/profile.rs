//! Profile resolution: merge a profile section with shared settings and
//! command-line overrides into one concrete, read-only parameter set.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, ConfigStore, expand_home};
use crate::domain::CountryCode;
use crate::transport::UrlTemplate;

/// Shared fallback section consulted after the profile's own section.
pub const GLOBAL_SECTION: &str = "settings";

/// Field names that trigger an interactive prompt instead of a
/// missing-field error.
const SECRET_FIELDS: [&str; 2] = ["pw", "password"];

/// Capability for asking the user for a secret value.
///
/// The CLI passes [`StdinPrompt`]; tests substitute a fake.
pub trait SecretPrompt {
    fn read_secret(&self, field: &str) -> std::io::Result<String>;
}

/// Prompt on stderr, read the value from stdin.
pub struct StdinPrompt;

impl SecretPrompt for StdinPrompt {
    fn read_secret(&self, field: &str) -> std::io::Result<String> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{field}: ")?;
        stderr.flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}

#[derive(Debug, Clone)]
/// A profile with every template parameter resolved.
///
/// Read-only once constructed; one instance belongs to one invocation.
pub struct ResolvedProfile {
    name: String,
    template: UrlTemplate,
    params: BTreeMap<String, String>,
    country_code: Option<CountryCode>,
    print_answer: bool,
    history: Option<PathBuf>,
}

impl ResolvedProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    /// Resolved values for every placeholder except `to` and `text`.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn country_code(&self) -> Option<&CountryCode> {
        self.country_code.as_ref()
    }

    pub fn print_answer(&self) -> bool {
        self.print_answer
    }

    pub fn history(&self) -> Option<&Path> {
        self.history.as_deref()
    }
}

/// Two-level field lookup: profile section first, then [`GLOBAL_SECTION`].
pub fn lookup_field(store: &ConfigStore, profile: &str, field: &str) -> Option<String> {
    store
        .string_field(profile, field)
        .or_else(|| store.string_field(GLOBAL_SECTION, field))
}

fn lookup_bool(store: &ConfigStore, profile: &str, field: &str) -> Option<bool> {
    store
        .bool_field(profile, field)
        .or_else(|| store.bool_field(GLOBAL_SECTION, field))
}

/// Parse the selected profile's url template.
pub fn profile_template(store: &ConfigStore, name: &str) -> Result<UrlTemplate, ConfigError> {
    let url = lookup_field(store, name, "url").ok_or_else(|| ConfigError::MissingField {
        profile: name.to_owned(),
        field: "url".to_owned(),
    })?;
    UrlTemplate::parse(&url).map_err(|err| ConfigError::InvalidUrlTemplate {
        reason: err.to_string(),
    })
}

/// Resolve a profile into a concrete parameter set.
///
/// Every placeholder the template requires (except `to` and `text`) is
/// filled from, in order: command-line overrides, the profile's own
/// section, the shared settings section. A placeholder missing everywhere
/// is [`ConfigError::MissingField`] unless it is a password field, which
/// is read interactively through `prompt` instead.
pub fn resolve_profile(
    store: &ConfigStore,
    selector: Option<&str>,
    overrides: &BTreeMap<String, String>,
    prompt: &dyn SecretPrompt,
) -> Result<ResolvedProfile, ConfigError> {
    let name = store.select_profile(selector)?;
    let template = profile_template(store, name)?;

    let mut params = BTreeMap::new();
    for placeholder in template.placeholders() {
        if placeholder == UrlTemplate::TO || placeholder == UrlTemplate::TEXT {
            continue;
        }
        let value = overrides
            .get(placeholder)
            .cloned()
            .or_else(|| lookup_field(store, name, placeholder));
        let value = match value {
            Some(value) => value,
            None if SECRET_FIELDS.contains(&placeholder) => {
                prompt
                    .read_secret(placeholder)
                    .map_err(|source| ConfigError::Prompt {
                        field: placeholder.to_owned(),
                        source,
                    })?
            }
            None => {
                return Err(ConfigError::MissingField {
                    profile: name.to_owned(),
                    field: placeholder.to_owned(),
                });
            }
        };
        params.insert(placeholder.to_owned(), value);
    }

    let country_code = lookup_field(store, name, CountryCode::FIELD)
        .map(CountryCode::new)
        .transpose()
        .map_err(|err| ConfigError::InvalidField {
            profile: name.to_owned(),
            field: CountryCode::FIELD.to_owned(),
            reason: err.to_string(),
        })?;

    let history = lookup_field(store, name, "history").map(|path| expand_home(path.trim()));

    Ok(ResolvedProfile {
        name: name.to_owned(),
        template,
        params,
        country_code,
        print_answer: lookup_bool(store, name, "print_answer").unwrap_or(true),
        history,
    })
}
