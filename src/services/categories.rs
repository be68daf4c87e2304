use std::sync::Arc;

use chrono::Utc;

use crate::error::{ApiError, ApiResult};
use crate::models::{Category, CategoryInput, CategoryPatch, CategoryWithCount};
use crate::slug::slugify;
use crate::store::{CategoryStore, ProductStore, StoreError};

use super::new_id;

pub struct CategoryService {
    categories: Arc<dyn CategoryStore>,
    products: Arc<dyn ProductStore>,
}

fn translate(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate { ref field, .. } if field == "name" || field == "slug" => {
            ApiError::DuplicateCategory
        }
        other => other.into(),
    }
}

/// Slug for a category name. A name with no letters or digits has none.
fn category_slug(name: &str) -> ApiResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ApiError::validation("Category name must contain letters or numbers"));
    }
    Ok(slug)
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryStore>, products: Arc<dyn ProductStore>) -> Self {
        CategoryService {
            categories,
            products,
        }
    }

    async fn ensure_unique(&self, category: &Category, exclude: Option<&str>) -> ApiResult<()> {
        let conflict = self
            .categories
            .find_conflicting(&category.name, &category.slug, exclude)
            .await?;
        match conflict {
            Some(_) => Err(ApiError::DuplicateCategory),
            None => Ok(()),
        }
    }

    /// Active categories by name.
    pub async fn list(&self) -> ApiResult<Vec<Category>> {
        Ok(self.categories.list(true).await?)
    }

    /// Active categories, each with its live count of active products.
    pub async fn list_with_counts(&self) -> ApiResult<Vec<CategoryWithCount>> {
        let categories = self.categories.list(true).await?;
        let mut out = Vec::with_capacity(categories.len());
        for category in categories {
            let product_count = self.products.count_by_category(&category.id, true).await?;
            out.push(CategoryWithCount {
                category,
                product_count,
            });
        }
        Ok(out)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or(ApiError::CategoryNotFound)
    }

    pub async fn get_by_slug(&self, slug: &str) -> ApiResult<Category> {
        self.categories
            .find_by_slug(slug, true)
            .await?
            .ok_or(ApiError::CategoryNotFound)
    }

    pub async fn create(&self, input: CategoryInput) -> ApiResult<Category> {
        let now = Utc::now();
        let name = input.name.trim().to_string();
        let category = Category {
            id: new_id(),
            slug: category_slug(&name)?,
            name,
            description: input.description.map(|d| d.trim().to_string()),
            is_active: input.is_active.unwrap_or(true),
            image: input.image.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()),
            created_at: now,
            updated_at: now,
        };
        self.ensure_unique(&category, None).await?;
        self.categories.insert(&category).await.map_err(translate)?;
        log::info!("created category {} ({})", category.id, category.slug);
        Ok(category)
    }

    /// A new name re-derives the slug.
    pub async fn update(&self, id: &str, patch: CategoryPatch) -> ApiResult<Category> {
        let mut category = self.get(id).await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name != category.name {
                category.slug = category_slug(&name)?;
                category.name = name;
            }
        }
        if let Some(description) = patch.description {
            category.description = Some(description.trim().to_string());
        }
        if let Some(image) = patch.image {
            category.image = Some(image.trim().to_string()).filter(|i| !i.is_empty());
        }
        if let Some(active) = patch.is_active {
            category.is_active = active;
        }
        category.updated_at = Utc::now();

        self.ensure_unique(&category, Some(id)).await?;
        if !self.categories.replace(&category).await.map_err(translate)? {
            return Err(ApiError::CategoryNotFound);
        }
        Ok(category)
    }

    /// Refuses while any product, active or not, still points here.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.get(id).await?;
        let in_use = self.products.count_by_category(id, false).await?;
        if in_use > 0 {
            log::debug!("category {} still referenced by {} products", id, in_use);
            return Err(ApiError::CategoryInUse);
        }
        if !self.categories.delete(id).await? {
            return Err(ApiError::CategoryNotFound);
        }
        log::info!("deleted category {}", id);
        Ok(())
    }
}
