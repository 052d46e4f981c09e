//! Input rules for login, registration and profile updates.

pub mod email;
pub mod name;
pub mod password;

pub use email::validate_email;
pub use name::validate_name;
pub use password::{PasswordPolicy, validate_password_confirmation};

use crate::AuthError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required(&'static str),
    TooLong { field: &'static str, max: usize },
    TooShort { field: &'static str, min: usize },
    EmailInvalidFormat,
    PasswordMissingLowercase,
    PasswordMissingUppercase,
    PasswordMissingDigit,
    PasswordMissingSpecial,
    PasswordConfirmationMismatch,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "The {field} field is required."),
            Self::TooLong { field, max } => {
                write!(f, "The {field} field must not be greater than {max} characters.")
            }
            Self::TooShort { field, min } => {
                write!(f, "The {field} field must be at least {min} characters.")
            }
            Self::EmailInvalidFormat => write!(f, "The email field must be a valid email address."),
            Self::PasswordMissingLowercase => {
                write!(f, "The password must contain at least one lowercase letter.")
            }
            Self::PasswordMissingUppercase => {
                write!(f, "The password must contain at least one uppercase letter.")
            }
            Self::PasswordMissingDigit => write!(f, "The password must contain at least one digit."),
            Self::PasswordMissingSpecial => write!(
                f,
                "The password must contain at least one special character (@$!%*?&#)."
            ),
            Self::PasswordConfirmationMismatch => {
                write!(f, "The password field confirmation does not match.")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for AuthError {
    fn from(e: ValidationError) -> Self {
        AuthError::Validation(e.to_string())
    }
}

/// `field` must be present and not blank.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}
