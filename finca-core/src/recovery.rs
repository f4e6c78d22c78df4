//! Password recovery against the locally stored users
//!
//! There is no mail delivery: a reset produces a one-off token that the
//! caller shows or hands on.

use uuid::Uuid;

use crate::error::FincaError;
use crate::models::User;

/// A password reset that was granted for a registered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryTicket {
    /// The email as stored on the user, not as typed
    pub email: String,
    pub token: String,
}

/// Looks up `email` among `users`, ignoring case and surrounding whitespace,
/// and issues a reset token for the match
pub fn request_password_reset(users: &[User], email: &str) -> Result<RecoveryTicket, FincaError> {
    let wanted = email.trim().to_lowercase();
    if wanted.is_empty() {
        return Err(FincaError::NotRegistered(email.to_string()));
    }

    let user = users
        .iter()
        .find(|u| u.email.trim().to_lowercase() == wanted)
        .ok_or_else(|| FincaError::NotRegistered(email.trim().to_string()))?;

    tracing::info!(email = %user.email, "password reset requested");

    Ok(RecoveryTicket {
        email: user.email.clone(),
        token: Uuid::new_v4().simple().to_string(),
    })
}
