//! Input checks run before any network call.

use crate::error::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn email(email: &str) -> Result<(), AuthError> {
    let invalid = || AuthError::Validation(format!("'{}' is not a valid email address", email));

    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

/// Login only needs something to send; the server judges it
pub fn password_present(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("Password is required".to_string()));
    }
    Ok(())
}

pub fn new_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }
    Ok(())
}

pub fn token(what: &str, token: &str) -> Result<(), AuthError> {
    if token.trim().is_empty() {
        return Err(AuthError::Validation(format!("{} token is required", what)));
    }
    Ok(())
}
