use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("template has no '?' query marker: {template}")]
    MissingQueryMarker { template: String },

    #[error("template is missing the mandatory {{{name}}} placeholder")]
    MissingMandatory { name: &'static str },

    #[error("no value for placeholder {{{name}}}")]
    MissingPlaceholder { name: String },
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Provider url template with `{name}` placeholders.
///
/// Invariants: contains a `?` query marker and both mandatory placeholders
/// (`{to}`, `{text}`).
pub struct UrlTemplate {
    raw: String,
    placeholders: Vec<String>,
}

impl UrlTemplate {
    /// Mandatory recipient placeholder.
    pub const TO: &'static str = "to";
    /// Mandatory message placeholder.
    pub const TEXT: &'static str = "text";

    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        if !raw.contains('?') {
            return Err(RequestError::MissingQueryMarker {
                template: raw.to_owned(),
            });
        }

        let mut placeholders = Vec::new();
        for caps in placeholder_regex().captures_iter(raw) {
            let name = caps[1].to_owned();
            if !placeholders.contains(&name) {
                placeholders.push(name);
            }
        }
        for mandatory in [Self::TO, Self::TEXT] {
            if !placeholders.iter().any(|name| name == mandatory) {
                return Err(RequestError::MissingMandatory { name: mandatory });
            }
        }

        Ok(Self {
            raw: raw.to_owned(),
            placeholders,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(String::as_str)
    }

    /// Substitute every placeholder and return the finished request string.
    ///
    /// `to` and `text` are supplied by the caller; everything else must be
    /// present in `params` or the build fails before producing any output.
    /// Values are substituted verbatim; url escaping happens at the
    /// transport boundary.
    pub fn build(
        &self,
        to: &str,
        text: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String, RequestError> {
        for name in &self.placeholders {
            if name != Self::TO && name != Self::TEXT && !params.contains_key(name) {
                return Err(RequestError::MissingPlaceholder { name: name.clone() });
            }
        }

        let substituted = placeholder_regex().replace_all(&self.raw, |caps: &Captures<'_>| {
            let name = &caps[1];
            if name == Self::TO {
                to.to_owned()
            } else if name == Self::TEXT {
                text.to_owned()
            } else {
                params[name].clone()
            }
        });
        Ok(substituted.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_placeholders_in_order() {
        let template =
            UrlTemplate::parse("https://x/?user={user}&pw={pw}&to={to}&text={text}&u2={user}")
                .unwrap();
        let names: Vec<&str> = template.placeholders().collect();
        assert_eq!(names, vec!["user", "pw", "to", "text"]);
    }

    #[test]
    fn parse_rejects_template_without_query_marker() {
        assert!(matches!(
            UrlTemplate::parse("https://x/sendsms"),
            Err(RequestError::MissingQueryMarker { .. })
        ));
    }

    #[test]
    fn parse_rejects_template_without_mandatory_placeholders() {
        assert!(matches!(
            UrlTemplate::parse("https://x/?text={text}"),
            Err(RequestError::MissingMandatory { name: "to" })
        ));
        assert!(matches!(
            UrlTemplate::parse("https://x/?to={to}"),
            Err(RequestError::MissingMandatory { name: "text" })
        ));
    }

    #[test]
    fn build_substitutes_values_verbatim() {
        let template =
            UrlTemplate::parse("https://x/?to={to}&text={text}&user={user}").unwrap();
        let params = BTreeMap::from([("user".to_owned(), "u".to_owned())]);
        let request = template.build("+1234567890", "Hi there", &params).unwrap();
        assert_eq!(request, "https://x/?to=+1234567890&text=Hi there&user=u");
    }

    #[test]
    fn build_fails_on_missing_placeholder_value() {
        let template =
            UrlTemplate::parse("https://x/?to={to}&text={text}&user={user}").unwrap();
        let err = template.build("+1", "hi", &BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            RequestError::MissingPlaceholder { name } if name == "user"
        ));
    }

    #[test]
    fn build_repeats_duplicate_placeholders() {
        let template =
            UrlTemplate::parse("https://x/?to={to}&text={text}&sig={user}-{user}").unwrap();
        let params = BTreeMap::from([("user".to_owned(), "u".to_owned())]);
        let request = template.build("+1", "hi", &params).unwrap();
        assert!(request.ends_with("sig=u-u"));
    }
}
