use std::sync::Arc;

use chrono::Utc;

use crate::error::{ApiError, ApiResult};
use crate::models::{Role, User, UserPatch, UserQuery, UserView};
use crate::response::{Page, PageRequest, Pagination};
use crate::store::{UserFilter, UserStore};

use super::normalize_email;

/// Admin-side account management.
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        UserService { users }
    }

    async fn load(&self, id: &str) -> ApiResult<User> {
        self.users.find_by_id(id).await?.ok_or(ApiError::UserNotFound)
    }

    async fn save(&self, user: &mut User) -> ApiResult<UserView> {
        user.updated_at = Utc::now();
        if !self.users.replace(user).await? {
            return Err(ApiError::UserNotFound);
        }
        Ok(UserView::from(&*user))
    }

    pub async fn list(&self, query: UserQuery) -> ApiResult<Page<UserView>> {
        let page = PageRequest::new(query.page, query.limit);
        let filter = UserFilter {
            role: query.role,
            is_active: query.is_active,
            search: query.search.filter(|s| !s.trim().is_empty()),
        };
        let (users, total) = self.users.list(&filter, page).await?;
        Ok(Page {
            items: users.iter().map(UserView::from).collect(),
            pagination: Pagination::new(page, total),
        })
    }

    /// The newest `limit` accounts.
    pub async fn recent(&self, limit: u64) -> ApiResult<Vec<UserView>> {
        let (users, _) = self
            .users
            .list(&UserFilter::default(), PageRequest::first(limit))
            .await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    pub async fn get(&self, id: &str) -> ApiResult<UserView> {
        Ok(UserView::from(&self.load(id).await?))
    }

    /// Admin edit: may change role, active flag and email, never the password.
    pub async fn update(&self, id: &str, patch: UserPatch) -> ApiResult<UserView> {
        let mut user = self.load(id).await?;

        if let Some(role) = patch.role {
            user.role = role.parse()?;
        }
        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if email != user.email {
                if let Some(other) = self.users.find_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(ApiError::DuplicateEmail);
                    }
                }
                user.email = email;
            }
        }
        if let Some(name) = patch.name {
            user.name = name.trim().to_string();
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        if let Some(phone) = patch.phone {
            user.phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());
        }

        let view = self.save(&mut user).await?;
        log::info!("admin updated user {}", view.id);
        Ok(view)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        if !self.users.delete(id).await? {
            return Err(ApiError::UserNotFound);
        }
        log::info!("deleted user {}", id);
        Ok(())
    }

    pub async fn set_active(&self, id: &str, active: bool) -> ApiResult<UserView> {
        let mut user = self.load(id).await?;
        user.is_active = active;
        let view = self.save(&mut user).await?;
        log::info!("user {} is_active={}", id, active);
        Ok(view)
    }

    pub async fn change_role(&self, id: &str, role: &str) -> ApiResult<UserView> {
        let role: Role = role.parse()?;
        let mut user = self.load(id).await?;
        user.role = role;
        let view = self.save(&mut user).await?;
        log::info!("user {} role changed to {}", id, role);
        Ok(view)
    }
}
