use crate::error::{AppError, Result};
use crate::models::user::{NewUser, UpdateUser};

/// Shape checks applied before anything is forwarded to the spreadsheet.
/// A failure here short-circuits the request locally.
///
/// # Arguments
///
/// * `user` - The creation payload to validate.
pub fn validate_new_user(user: &NewUser) -> Result<()> {
    if user.username.is_empty()
        || user.email.is_empty()
        || user.password.is_empty()
        || user.role.is_empty()
    {
        return Err(AppError::Validation("All fields are required".to_string()));
    }

    validate_username(&user.username)?;
    validate_password(&user.password)?;
    validate_role(&user.role)
}

/// Shape checks for an update payload. The password is optional; a blank
/// one means the stored password is kept.
pub fn validate_update_user(user: &UpdateUser) -> Result<()> {
    if user.username.is_empty() || user.email.is_empty() || user.role.is_empty() {
        return Err(AppError::Validation(
            "Username, email, and role are required".to_string(),
        ));
    }

    validate_username(&user.username)?;
    if !user.password.is_empty() {
        validate_password(&user.password)?;
    }
    validate_role(&user.role)
}

/// Validates a username.
pub fn validate_username(username: &str) -> Result<()> {
    if username.len() < 3 {
        return Err(AppError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    Ok(())
}

/// Validates a password.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    Ok(())
}

/// Validates a role name.
pub fn validate_role(role: &str) -> Result<()> {
    if role != "user" && role != "admin" {
        return Err(AppError::Validation(
            "Role must be either \"user\" or \"admin\"".to_string(),
        ));
    }

    Ok(())
}
