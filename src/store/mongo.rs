use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::models::{Category, Product, User};
use crate::response::PageRequest;

use super::{
    CategoryStore, ProductFilter, ProductSort, ProductStore, StoreError, StoreResult, UserFilter,
    UserStore,
};

pub const USERS: &str = "users";
pub const CATEGORIES: &str = "categories";
pub const PRODUCTS: &str = "products";

const DUPLICATE_KEY_CODE: i32 = 11000;

fn classify(err: MongoError) -> StoreError {
    let duplicate = match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE => {
            parse_duplicate_key(&e.message)
        }
        _ => None,
    };
    match duplicate {
        Some((field, value)) => StoreError::Duplicate { field, value },
        None => StoreError::Backend(err.to_string()),
    }
}

/// Pulls `(field, value)` out of an E11000 message such as
/// `... index: sku_1 dup key: { sku: "SKU-1" }`.
fn parse_duplicate_key(message: &str) -> Option<(String, String)> {
    let re = Regex::new(r#"dup key: \{ ?(\w+): "?(.*?)"? ?\}"#).ok()?;
    let caps = re.captures(message)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

async fn collect<T>(cursor: mongodb::Cursor<T>) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    cursor.try_collect().await.map_err(classify)
}

fn page_options(page: PageRequest, sort: Document) -> FindOptions {
    FindOptions::builder()
        .sort(sort)
        .skip(page.skip())
        .limit(page.limit as i64)
        .build()
}

pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        MongoUserStore {
            users: db.collection(USERS),
        }
    }
}

fn user_query(filter: &UserFilter) -> Document {
    let mut query = Document::new();
    if let Some(role) = filter.role {
        query.insert("role", role.as_str());
    }
    if let Some(active) = filter.is_active {
        query.insert("isActive", active);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = regex::escape(search);
        query.insert(
            "$or",
            vec![
                doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                doc! { "email": { "$regex": pattern.as_str(), "$options": "i" } },
            ],
        );
    }
    query
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        self.users.insert_one(user, None).await.map_err(classify)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.users.find_one(doc! { "_id": id }, None).await.map_err(classify)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users.find_one(doc! { "email": email }, None).await.map_err(classify)
    }

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        let cursor = self
            .users
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
            .map_err(classify)?;
        collect(cursor).await
    }

    async fn replace(&self, user: &User) -> StoreResult<bool> {
        let result = self
            .users
            .replace_one(doc! { "_id": user.id.as_str() }, user, None)
            .await
            .map_err(classify)?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = self.users.delete_one(doc! { "_id": id }, None).await.map_err(classify)?;
        Ok(result.deleted_count == 1)
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<User>, u64)> {
        let query = user_query(filter);
        let total = self
            .users
            .count_documents(query.clone(), None)
            .await
            .map_err(classify)?;
        let cursor = self
            .users
            .find(query, page_options(page, doc! { "createdAt": -1 }))
            .await
            .map_err(classify)?;
        Ok((collect(cursor).await?, total))
    }

    async fn count(&self) -> StoreResult<u64> {
        self.users.count_documents(doc! {}, None).await.map_err(classify)
    }
}

pub struct MongoCategoryStore {
    categories: Collection<Category>,
}

impl MongoCategoryStore {
    pub fn new(db: &Database) -> Self {
        MongoCategoryStore {
            categories: db.collection(CATEGORIES),
        }
    }
}

#[async_trait]
impl CategoryStore for MongoCategoryStore {
    async fn insert(&self, category: &Category) -> StoreResult<()> {
        self.categories.insert_one(category, None).await.map_err(classify)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Category>> {
        self.categories.find_one(doc! { "_id": id }, None).await.map_err(classify)
    }

    async fn find_by_slug(&self, slug: &str, active_only: bool) -> StoreResult<Option<Category>> {
        let mut query = doc! { "slug": slug };
        if active_only {
            query.insert("isActive", true);
        }
        self.categories.find_one(query, None).await.map_err(classify)
    }

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<Category>> {
        let cursor = self
            .categories
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
            .map_err(classify)?;
        collect(cursor).await
    }

    async fn find_conflicting(
        &self,
        name: &str,
        slug: &str,
        exclude: Option<&str>,
    ) -> StoreResult<Option<Category>> {
        let mut query = doc! { "$or": [ { "name": name }, { "slug": slug } ] };
        if let Some(id) = exclude {
            query.insert("_id", doc! { "$ne": id });
        }
        self.categories.find_one(query, None).await.map_err(classify)
    }

    async fn list(&self, active_only: bool) -> StoreResult<Vec<Category>> {
        let query = if active_only { doc! { "isActive": true } } else { doc! {} };
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self.categories.find(query, options).await.map_err(classify)?;
        collect(cursor).await
    }

    async fn replace(&self, category: &Category) -> StoreResult<bool> {
        let result = self
            .categories
            .replace_one(doc! { "_id": category.id.as_str() }, category, None)
            .await
            .map_err(classify)?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = self
            .categories
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(classify)?;
        Ok(result.deleted_count == 1)
    }

    async fn count(&self) -> StoreResult<u64> {
        self.categories.count_documents(doc! {}, None).await.map_err(classify)
    }
}

pub struct MongoProductStore {
    products: Collection<Product>,
}

impl MongoProductStore {
    pub fn new(db: &Database) -> Self {
        MongoProductStore {
            products: db.collection(PRODUCTS),
        }
    }
}

fn product_query(filter: &ProductFilter) -> Document {
    let mut query = Document::new();
    if filter.active_only {
        query.insert("isActive", true);
    }
    if let Some(category) = &filter.category {
        query.insert("category", category.as_str());
    }
    let mut price = Document::new();
    if let Some(min) = filter.min_price {
        price.insert("$gte", min);
    }
    if let Some(max) = filter.max_price {
        price.insert("$lte", max);
    }
    if !price.is_empty() {
        query.insert("price", price);
    }
    if let Some(featured) = filter.featured {
        query.insert("isFeatured", featured);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query.insert("$text", doc! { "$search": search });
    }
    query
}

#[async_trait]
impl ProductStore for MongoProductStore {
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        self.products.insert_one(product, None).await.map_err(classify)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        self.products.find_one(doc! { "_id": id }, None).await.map_err(classify)
    }

    async fn find_by_slug(&self, slug: &str, active_only: bool) -> StoreResult<Option<Product>> {
        let mut query = doc! { "slug": slug };
        if active_only {
            query.insert("isActive", true);
        }
        self.products.find_one(query, None).await.map_err(classify)
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<&str>) -> StoreResult<bool> {
        let mut query = doc! { "slug": slug };
        if let Some(id) = exclude {
            query.insert("_id", doc! { "$ne": id });
        }
        let n = self.products.count_documents(query, None).await.map_err(classify)?;
        Ok(n > 0)
    }

    async fn replace_versioned(&self, product: &Product, expected_version: i64) -> StoreResult<bool> {
        let result = self
            .products
            .replace_one(
                doc! { "_id": product.id.as_str(), "version": expected_version },
                product,
                None,
            )
            .await
            .map_err(classify)?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = self
            .products
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(classify)?;
        Ok(result.deleted_count == 1)
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> StoreResult<(Vec<Product>, u64)> {
        let query = product_query(filter);
        let total = self
            .products
            .count_documents(query.clone(), None)
            .await
            .map_err(classify)?;

        let options = match sort {
            ProductSort::Newest => page_options(page, doc! { "createdAt": -1 }),
            ProductSort::TopRated => page_options(page, doc! { "averageRating": -1, "createdAt": -1 }),
            ProductSort::Relevance => {
                let mut options = page_options(page, doc! { "score": { "$meta": "textScore" } });
                options.projection = Some(doc! { "score": { "$meta": "textScore" } });
                options
            }
        };
        let cursor = self.products.find(query, options).await.map_err(classify)?;
        Ok((collect(cursor).await?, total))
    }

    async fn count_by_category(&self, category_id: &str, active_only: bool) -> StoreResult<u64> {
        let mut query = doc! { "category": category_id };
        if active_only {
            query.insert("isActive", true);
        }
        self.products.count_documents(query, None).await.map_err(classify)
    }

    async fn count(&self) -> StoreResult<u64> {
        self.products.count_documents(doc! {}, None).await.map_err(classify)
    }
}
