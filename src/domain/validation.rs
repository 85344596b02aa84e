use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    NoRecipients,
    InvalidPhoneNumber { input: String },
    ZeroDuration { field: &'static str },
    UnknownVariant { field: &'static str, value: String },
    SenderNotConfigured { variant: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::NoRecipients => write!(f, "at least one recipient is required"),
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
            Self::ZeroDuration { field } => write!(f, "{field} must be greater than zero"),
            Self::UnknownVariant { field, value } => {
                write!(f, "unknown {field} value: {value:?}")
            }
            Self::SenderNotConfigured { variant } => {
                write!(f, "no sender id configured for variant {variant}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
