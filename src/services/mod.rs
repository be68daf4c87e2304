//! Business rules on top of the stores, one service per entity family.

use uuid::Uuid;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod products;
pub mod users;

pub use admin::AdminService;
pub use auth::AuthService;
pub use categories::CategoryService;
pub use products::ProductService;
pub use users::UserService;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
