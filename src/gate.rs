//! Request authentication and role checks.
//!
//! Tokens cannot be revoked, so every authenticated request re-reads the
//! account: a deleted or deactivated account is rejected even while its token
//! still verifies, and the role used for authorization is the stored one.

use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{AuthUser, Role};
use crate::store::UserStore;
use crate::token::TokenIssuer;

pub struct Gate {
    tokens: Arc<TokenIssuer>,
    users: Arc<dyn UserStore>,
}

impl Gate {
    pub fn new(tokens: Arc<TokenIssuer>, users: Arc<dyn UserStore>) -> Self {
        Gate { tokens, users }
    }

    /// Extracts the credential from an `Authorization: Bearer <token>` value.
    pub fn bearer(header: Option<&str>) -> ApiResult<&str> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .unwrap_or_default();
        if token.is_empty() {
            return Err(ApiError::Unauthenticated("Access denied. No token provided."));
        }
        Ok(token)
    }

    pub async fn authenticate(&self, header: Option<&str>) -> ApiResult<AuthUser> {
        let token = Self::bearer(header)?;
        let claims = self.tokens.verify(token).map_err(|e| {
            log::debug!("rejected bearer token: {}", e);
            ApiError::Unauthenticated("Invalid token.")
        })?;

        match self.users.find_by_id(&claims.sub).await? {
            Some(user) if user.is_active => Ok(AuthUser {
                id: user.id,
                name: user.name,
                role: user.role,
            }),
            _ => Err(ApiError::Unauthenticated("Invalid token or user inactive.")),
        }
    }

    pub fn authorize(user: &AuthUser, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&user.role) {
            Ok(())
        } else {
            log::warn!("user {} ({}) denied: requires one of {:?}", user.id, user.role, allowed);
            Err(ApiError::Forbidden)
        }
    }

    /// Both stages in order.
    pub async fn check(&self, header: Option<&str>, allowed: &[Role]) -> ApiResult<AuthUser> {
        let user = self.authenticate(header).await?;
        Self::authorize(&user, allowed)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::store::memory::MemoryUserStore;
    use chrono::{Duration, Utc};

    async fn setup(role: Role, active: bool) -> (Gate, Arc<MemoryUserStore>, String) {
        let tokens = Arc::new(TokenIssuer::new("gate-secret", Duration::hours(1)));
        let users = Arc::new(MemoryUserStore::default());
        let now = Utc::now();
        users
            .insert(&User {
                id: "u1".into(),
                name: "Ann".into(),
                email: "ann@example.com".into(),
                password: String::new(),
                role,
                is_active: active,
                phone: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let token = tokens.issue("u1", role).unwrap();
        (Gate::new(tokens, users.clone()), users, token)
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(Gate::bearer(Some("Bearer abc")).unwrap(), "abc");
        assert!(Gate::bearer(None).is_err());
        assert!(Gate::bearer(Some("Basic abc")).is_err());
        assert!(Gate::bearer(Some("Bearer ")).is_err());
    }

    #[actix_web::test]
    async fn admin_passes_both_sets() {
        let (gate, _, token) = setup(Role::Admin, true).await;
        let header = format!("Bearer {}", token);
        assert!(gate.check(Some(&header), Role::ADMIN_ONLY).await.is_ok());
        assert!(gate.check(Some(&header), Role::ANY_ACCOUNT).await.is_ok());
    }

    #[actix_web::test]
    async fn user_is_forbidden_from_admin_endpoints() {
        let (gate, _, token) = setup(Role::User, true).await;
        let header = format!("Bearer {}", token);
        assert!(matches!(
            gate.check(Some(&header), Role::ADMIN_ONLY).await,
            Err(ApiError::Forbidden)
        ));
        assert!(gate.check(Some(&header), Role::ANY_ACCOUNT).await.is_ok());
    }

    #[actix_web::test]
    async fn inactive_or_missing_accounts_are_unauthenticated() {
        let (gate, users, token) = setup(Role::User, false).await;
        let header = format!("Bearer {}", token);
        assert!(matches!(
            gate.authenticate(Some(&header)).await,
            Err(ApiError::Unauthenticated(_))
        ));

        users.delete("u1").await.unwrap();
        assert!(matches!(
            gate.authenticate(Some(&header)).await,
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[actix_web::test]
    async fn stored_role_wins_over_token_claim() {
        let (gate, users, token) = setup(Role::Admin, true).await;
        let mut user = users.find_by_id("u1").await.unwrap().unwrap();
        user.role = Role::User;
        users.replace(&user).await.unwrap();

        let header = format!("Bearer {}", token);
        assert!(matches!(
            gate.check(Some(&header), Role::ADMIN_ONLY).await,
            Err(ApiError::Forbidden)
        ));
    }
}
