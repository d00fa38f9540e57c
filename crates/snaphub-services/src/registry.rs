//! Token Registry
//!
//! Resolves the opaque secret a submitter presents to the token it names.
//! Category permissions are global, so an active token may use every category.

use std::sync::Arc;

use rand::Rng;
use snaphub_core::models::{Token, TokenIdentity};
use snaphub_core::AppError;
use snaphub_db::TokenStore;

const SECRET_PREFIX: &str = "tok_";
const SECRET_LENGTH: usize = 16;
const SECRET_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// `tok_` followed by 16 random characters from `[a-z0-9]`
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SECRET_LENGTH)
        .map(|_| SECRET_CHARSET[rng.random_range(0..SECRET_CHARSET.len())] as char)
        .collect();
    format!("{}{}", SECRET_PREFIX, suffix)
}

#[derive(Clone)]
pub struct TokenRegistry {
    tokens: Arc<dyn TokenStore>,
}

impl TokenRegistry {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self { tokens }
    }

    /// Resolve a secret to its active token.
    ///
    /// Unknown and inactive secrets fail the same way so callers cannot tell them apart.
    #[tracing::instrument(skip(self, secret))]
    pub async fn resolve(&self, secret: &str) -> Result<Token, AppError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(AppError::Validation("token is required".to_string()));
        }

        match self.tokens.find_by_secret(secret).await? {
            Some(token) if token.active => Ok(token),
            _ => {
                tracing::debug!("Rejected unknown or inactive token");
                Err(AppError::Authorization(
                    "invalid or inactive token".to_string(),
                ))
            }
        }
    }

    /// Resolve a secret together with the token's department memberships
    pub async fn resolve_with_departments(&self, secret: &str) -> Result<TokenIdentity, AppError> {
        let token = self.resolve(secret).await?;
        let department_ids = self.tokens.department_ids_for(token.id).await?;
        Ok(TokenIdentity {
            token,
            department_ids,
        })
    }
}
