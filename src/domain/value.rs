use crate::domain::validation::ValidationError;

/// Characters per single SMS segment.
pub const SEGMENT_FIRST: usize = 160;
/// Characters available in each follow-up segment of a concatenated message.
pub const SEGMENT_NEXT: usize = 145;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Country calling code used to replace a leading zero, e.g. `+49`.
///
/// Invariant: `+` followed by at least one decimal digit, nothing else.
pub struct CountryCode(String);

impl CountryCode {
    /// Config field name (`country_code`).
    pub const FIELD: &'static str = "country_code";

    /// Create a validated [`CountryCode`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or("");
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidCountryCode {
                input: value.clone(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated code, including the leading `+`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Phone number accepted for sending.
///
/// Invariant: either `+<digits>` (canonical international form) or bare
/// `<digits>` (local form, kept only for permissive call sites). Formatting
/// noise is removed during [`PhoneNumber::normalize`].
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Url template placeholder name (`to`).
    pub const FIELD: &'static str = "to";

    /// Normalize a phone-number-like string.
    ///
    /// Spaces, hyphens, and parentheses are stripped first. A `+<digits>`
    /// result is returned as-is. A `0<digits>` result has its leading zero
    /// replaced with `country_code` when `accept_leading_zero` is set and a
    /// code is available; without a code the bare digits pass through
    /// unchanged. Anything else is [`ValidationError::NotAPhoneNumber`]
    /// carrying the original input.
    pub fn normalize(
        raw: &str,
        country_code: Option<&CountryCode>,
        accept_leading_zero: bool,
    ) -> Result<Self, ValidationError> {
        let stripped: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();

        if let Some(rest) = stripped.strip_prefix('+') {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(Self(stripped));
            }
            return Err(ValidationError::NotAPhoneNumber {
                input: raw.to_owned(),
            });
        }

        if stripped.is_empty() || !stripped.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NotAPhoneNumber {
                input: raw.to_owned(),
            });
        }

        if accept_leading_zero && stripped.starts_with('0') {
            if let Some(code) = country_code {
                return Ok(Self(format!("{}{}", code.as_str(), &stripped[1..])));
            }
        }

        Ok(Self(stripped))
    }

    /// Borrow the normalized number.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the number is in canonical `+<digits>` form.
    pub fn is_international(&self) -> bool {
        self.0.starts_with('+')
    }
}

/// Estimated SMS segment count for a message of `chars` characters.
///
/// Up to [`SEGMENT_FIRST`] characters fit into one sms; every further
/// [`SEGMENT_NEXT`] characters add another.
pub fn segment_count(chars: usize) -> usize {
    if chars <= SEGMENT_FIRST {
        1
    } else {
        (chars - SEGMENT_FIRST - 1) / SEGMENT_NEXT + 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Message text to send.
///
/// Invariant: non-empty after trimming. The original value (including
/// whitespace) is preserved.
pub struct MessageText(String);

impl MessageText {
    /// Url template placeholder name (`text`).
    pub const FIELD: &'static str = "text";

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Borrow the message text as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the message.
    pub fn chars(&self) -> usize {
        self.0.chars().count()
    }

    /// Estimated number of SMS segments needed for this message.
    pub fn segments(&self) -> usize {
        segment_count(self.chars())
    }
}
