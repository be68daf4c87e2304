//! Persistence seam.
//!
//! Services only see these traits. `mongo` backs them with MongoDB
//! collections, `memory` with process-local maps (tests and local runs
//! without a database).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Category, Product, Role, User};
use crate::response::PageRequest;

pub mod memory;
pub mod mongo;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate value for '{field}': {value}")]
    Duplicate { field: String, value: String },

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn duplicate(field: &str, value: &str) -> Self {
        StoreError::Duplicate {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub active_only: bool,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub featured: Option<bool>,
    /// Full-text terms over name, description and tags.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    Newest,
    TopRated,
    /// Text relevance; only meaningful together with `ProductFilter::search`.
    Relevance,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> StoreResult<()>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<User>>;

    /// Returns false when no user has `user.id`.
    async fn replace(&self, user: &User) -> StoreResult<bool>;

    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Newest first, with the total number of matches.
    async fn list(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<User>, u64)>;

    async fn count(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert(&self, category: &Category) -> StoreResult<()>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Category>>;

    async fn find_by_slug(&self, slug: &str, active_only: bool) -> StoreResult<Option<Category>>;

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<Category>>;

    /// Any category other than `exclude` whose name or slug is taken.
    async fn find_conflicting(
        &self,
        name: &str,
        slug: &str,
        exclude: Option<&str>,
    ) -> StoreResult<Option<Category>>;

    /// Sorted by name.
    async fn list(&self, active_only: bool) -> StoreResult<Vec<Category>>;

    async fn replace(&self, category: &Category) -> StoreResult<bool>;

    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn count(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: &Product) -> StoreResult<()>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Product>>;

    async fn find_by_slug(&self, slug: &str, active_only: bool) -> StoreResult<Option<Product>>;

    async fn slug_taken(&self, slug: &str, exclude: Option<&str>) -> StoreResult<bool>;

    /// Writes `product` only if the stored copy is still at `expected_version`.
    /// Returns false when the product is gone or has moved on.
    async fn replace_versioned(&self, product: &Product, expected_version: i64) -> StoreResult<bool>;

    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> StoreResult<(Vec<Product>, u64)>;

    async fn count_by_category(&self, category_id: &str, active_only: bool) -> StoreResult<u64>;

    async fn count(&self) -> StoreResult<u64>;
}

/// The three collections the services run against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub products: Arc<dyn ProductStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Stores {
            users: Arc::new(memory::MemoryUserStore::default()),
            categories: Arc::new(memory::MemoryCategoryStore::default()),
            products: Arc::new(memory::MemoryProductStore::default()),
        }
    }

    pub fn mongo(db: &mongodb::Database) -> Self {
        Stores {
            users: Arc::new(mongo::MongoUserStore::new(db)),
            categories: Arc::new(mongo::MongoCategoryStore::new(db)),
            products: Arc::new(mongo::MongoProductStore::new(db)),
        }
    }
}
