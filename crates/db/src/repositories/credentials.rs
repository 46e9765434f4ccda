use sha2::{Digest, Sha256};

use teleassist_core::domain::identity::Role;

use super::{normalized_email, RepositoryError};
use crate::SqlCustomerStore;

/// Hex-encoded SHA-256 of a password, matching the `users.password_hash` column.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

impl SqlCustomerStore {
    /// Returns the caller's role when the email and password match an active user.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Role>, RepositoryError> {
        let label: Option<String> = sqlx::query_scalar(
            "SELECT role FROM users \
             WHERE LOWER(TRIM(email)) = ?1 AND password_hash = ?2 AND is_active = 1",
        )
        .bind(normalized_email(email))
        .bind(hash_password(password))
        .fetch_optional(self.pool())
        .await?;

        Ok(label.map(|label| Role::from_store_label(&label)))
    }
}
