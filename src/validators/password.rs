use regex::Regex;
use std::sync::LazyLock;

use super::ValidationError;

static SPECIAL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[@$!%*?&#]").unwrap());

/// Password rules.
///
/// ```
/// use turnstile::validators::PasswordPolicy;
///
/// let policy = PasswordPolicy::registration();
/// assert!(policy.validate("Passw0rd!").is_ok());
/// assert!(policy.validate("password").is_err());
/// ```
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digit: bool,
    /// One of `@$!%*?&#`.
    pub require_special: bool,
}

impl PasswordPolicy {
    /// Rules for new accounts: 8+ characters with lowercase, uppercase,
    /// digit and special character.
    #[must_use]
    pub fn registration() -> Self {
        Self {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_digit: true,
            require_special: true,
        }
    }

    /// Length-only rule, used for profile updates.
    #[must_use]
    pub fn min_length(min_length: usize) -> Self {
        Self {
            min_length,
            require_lowercase: false,
            require_uppercase: false,
            require_digit: false,
            require_special: false,
        }
    }

    pub fn validate(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        if password.chars().count() < self.min_length {
            return Err(ValidationError::TooShort {
                field: "password",
                min: self.min_length,
            });
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            return Err(ValidationError::PasswordMissingLowercase);
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(ValidationError::PasswordMissingUppercase);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::PasswordMissingDigit);
        }
        if self.require_special && !SPECIAL_REGEX.is_match(password) {
            return Err(ValidationError::PasswordMissingSpecial);
        }

        Ok(())
    }
}

pub fn validate_password_confirmation(
    password: &str,
    confirmation: &str,
) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::PasswordConfirmationMismatch);
    }
    Ok(())
}
