use std::collections::HashMap;

/// Field-level validation failures, keyed by the JSON field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field` unless `valid` holds. The first failure per field wins.
    pub fn check(&mut self, valid: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !valid {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.into());
        }
        self
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.check(false, field, message)
    }

    pub fn merge(&mut self, other: FieldErrors) -> &mut Self {
        for (field, message) in other.errors {
            self.errors.entry(field).or_insert(message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.errors
    }
}

/// Resource and user identifiers: lowercase letters, digits, and hyphens
pub fn is_slug(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub fn length_between(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    len >= min && len <= max
}

pub fn validate_username(errors: &mut FieldErrors, value: &str) {
    errors
        .check(length_between(value, 1, 32), "username", "Username must be between 1 and 32 characters.")
        .check(
            value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "username",
            "Username must contain only letters, numbers, underscores, and hyphens.",
        );
}

pub fn validate_email(errors: &mut FieldErrors, value: &str) {
    let (local, domain) = value.split_once('@').unwrap_or(("", ""));
    errors
        .check(length_between(value, 3, 254), "email", "Email must be between 3 and 254 characters.")
        .check(
            !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
            "email",
            "Email must be a valid email address.",
        );
}

pub fn validate_password(errors: &mut FieldErrors, field: &str, value: &str) {
    errors.check(
        length_between(value, 8, 256),
        field,
        "Password must be between 8 and 256 characters.",
    );
}

pub fn validate_verification_code(errors: &mut FieldErrors, value: &str) {
    errors.check(
        value.len() == 6 && value.chars().all(|c| c.is_ascii_digit()),
        "verificationCode",
        "Verification code must be 6 digits.",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_per_field_is_kept() {
        let mut errors = FieldErrors::new();
        errors
            .check(false, "name", "Name must be present.")
            .check(false, "name", "Name is too long.")
            .check(true, "description", "unused");

        assert_eq!(errors.get("name"), Some("Name must be present."));
        assert_eq!(errors.get("description"), None);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn slug_rules() {
        assert!(is_slug("red-rocks-2"));
        assert!(!is_slug("Red-Rocks"));
        assert!(!is_slug("red_rocks"));
        assert!(is_slug(""));
        assert!(length_between("abc", 1, 3));
        assert!(!length_between("", 1, 3));
    }

    #[test]
    fn user_field_rules() {
        let mut errors = FieldErrors::new();
        validate_username(&mut errors, "captain_america-1");
        validate_email(&mut errors, "cap@shield.com");
        validate_password(&mut errors, "password", "fascinating");
        validate_verification_code(&mut errors, "123456");
        assert!(errors.is_empty());

        let mut errors = FieldErrors::new();
        validate_username(&mut errors, "captain america");
        validate_email(&mut errors, "cap@@shield.com");
        validate_password(&mut errors, "newPassword", "short");
        validate_verification_code(&mut errors, "12345a");
        assert!(errors.get("username").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("newPassword").is_some());
        assert!(errors.get("verificationCode").is_some());
    }
}
