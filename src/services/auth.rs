use std::sync::Arc;

use chrono::Utc;

use crate::error::{ApiError, ApiResult};
use crate::models::{AuthResponse, ProfilePatch, RegisterInput, Role, User, UserView};
use crate::password;
use crate::store::UserStore;
use crate::token::TokenIssuer;

use super::{new_id, normalize_email};

/// Registration, login and self-service account operations.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenIssuer>) -> Self {
        AuthService { users, tokens }
    }

    fn issue(&self, user: &User) -> ApiResult<AuthResponse> {
        let token = self
            .tokens
            .issue(&user.id, user.role)
            .map_err(|e| ApiError::internal(format!("failed to encode token: {}", e)))?;
        Ok(AuthResponse {
            user: UserView::from(user),
            token,
        })
    }

    /// Creates an active account with `role`. Deciding whether the caller may
    /// ask for that role is the caller's job.
    pub async fn register(&self, input: RegisterInput, role: Role) -> ApiResult<AuthResponse> {
        let email = normalize_email(&input.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            name: input.name.trim().to_string(),
            email,
            password: password::hash(&input.password)?,
            role,
            is_active: true,
            phone: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(&user).await?;
        log::info!("registered user {} with role {}", user.id, user.role);

        self.issue(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let user = match self.users.find_by_email(&normalize_email(email)).await? {
            Some(user) if password::verify(&user.password, password) => user,
            _ => {
                log::warn!("failed login attempt");
                return Err(ApiError::InvalidCredentials);
            }
        };
        if !user.is_active {
            return Err(ApiError::AccountDeactivated);
        }
        log::info!("user {} logged in", user.id);
        self.issue(&user)
    }

    pub async fn profile(&self, user_id: &str) -> ApiResult<UserView> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        Ok(UserView::from(&user))
    }

    /// Only name and phone can change here; role, email and password never do.
    pub async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> ApiResult<UserView> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if let Some(name) = patch.name {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            user.phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());
        }
        user.updated_at = Utc::now();

        if !self.users.replace(&user).await? {
            return Err(ApiError::UserNotFound);
        }
        Ok(UserView::from(&user))
    }

    pub async fn change_password(&self, user_id: &str, current: &str, new: &str) -> ApiResult<()> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if !password::verify(&user.password, current) {
            return Err(ApiError::InvalidCredentials);
        }
        user.password = password::hash(new)?;
        user.updated_at = Utc::now();

        if !self.users.replace(&user).await? {
            return Err(ApiError::UserNotFound);
        }
        log::info!("user {} changed their password", user.id);
        Ok(())
    }
}
