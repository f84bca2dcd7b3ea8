use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    NotAPhoneNumber { input: String },
    InvalidCountryCode { input: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::NotAPhoneNumber { input } => {
                write!(f, "{input} is not a valid phone number")
            }
            Self::InvalidCountryCode { input } => {
                write!(f, "invalid country code: {input} (expected '+' followed by digits)")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
