use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// The reply carries no `<result>` tag; this is a parse failure, never
    /// a silent failure verdict.
    #[error("provider response carries no <result> tag")]
    MissingResultTag,

    #[error("provider response is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

/// `result` value that means success; everything else is a failure.
pub const SUCCESS_CODE: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Success/failure classification of a provider reply.
///
/// Constructed once per request by [`interpret`], never mutated afterward.
pub struct Verdict {
    pub success: bool,
    pub result_code: String,
    pub result_string: Option<String>,
    pub description: Option<String>,
}

impl Verdict {
    /// Best human-readable account of the verdict.
    pub fn summary(&self) -> &str {
        self.description
            .as_deref()
            .or(self.result_string.as_deref())
            .unwrap_or(&self.result_code)
    }
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<\s*([A-Za-z][A-Za-z0-9_-]*)\s*>([^<]*)").expect("tag regex is valid")
    })
}

/// Interpret a provider reply.
///
/// The reply is tag-delimited markup, not necessarily well-formed XML: a
/// known tag's value is the text between its opening tag and the next `<`.
/// Unknown tags are ignored, closing tags are optional, and surrounding
/// whitespace is insignificant. The first occurrence of a known tag wins.
pub fn interpret(body: &[u8]) -> Result<Verdict, ResponseError> {
    let text = std::str::from_utf8(body)?;

    let mut result_code = None;
    let mut result_string = None;
    let mut description = None;
    for caps in tag_regex().captures_iter(text) {
        let tag = caps[1].to_lowercase();
        let value = caps[2].trim();
        let slot = match tag.as_str() {
            "result" => &mut result_code,
            "resultstring" => &mut result_string,
            "description" => &mut description,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_owned());
        }
    }

    let result_code = result_code.ok_or(ResponseError::MissingResultTag)?;
    Ok(Verdict {
        success: result_code == SUCCESS_CODE,
        result_code,
        result_string,
        description,
    })
}
