//! Nickname rules. A nickname becomes a file name, so it is checked
//! before any path is built from it.

use crate::RepositoryError;

/// Longest nickname accepted, in characters.
pub const MAX_NICKNAME_LEN: usize = 32;

/// Checks that `nickname` is safe to use as a record key.
///
/// Allowed: 1..=32 ASCII letters, digits, `_` and `-`.
pub fn validate_nickname(nickname: &str) -> Result<(), RepositoryError> {
    if nickname.trim().is_empty() {
        return Err(RepositoryError::InvalidInput("nickname is blank".into()));
    }
    if nickname.len() > MAX_NICKNAME_LEN {
        return Err(RepositoryError::InvalidInput(format!(
            "nickname longer than {MAX_NICKNAME_LEN} characters"
        )));
    }
    if let Some(bad) = nickname
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(RepositoryError::InvalidInput(format!(
            "nickname contains {bad:?}"
        )));
    }
    Ok(())
}
