use crate::error::{AppError, Res};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Accepts `local@domain.tld` with no whitespace and a dot after the `@`.
pub fn email(email: &str) -> Res<()> {
    let invalid = || AppError::BadRequest("Invalid email format".to_string());

    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

pub fn password(password: &str) -> Res<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn required(value: &str, field: &str) -> Res<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// Rejects anything that could leave the downloads directory.
pub fn filename(filename: &str) -> Res<()> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0')
    {
        return Err(AppError::BadRequest("Invalid filename".to_string()));
    }
    Ok(())
}
