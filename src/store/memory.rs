use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::models::{Category, Product, User};
use crate::response::PageRequest;

use super::{
    CategoryStore, ProductFilter, ProductSort, ProductStore, StoreError, StoreResult, UserFilter,
    UserStore,
};

fn paginate<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let page_items = items
        .into_iter()
        .skip(usize::try_from(page.skip()).unwrap_or(usize::MAX))
        .take(page.limit as usize)
        .collect();
    (page_items, total)
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    fn check_email(users: &HashMap<String, User>, user: &User) -> StoreResult<()> {
        let taken = users
            .values()
            .any(|u| u.id != user.id && u.email == user.email);
        if taken {
            return Err(StoreError::duplicate("email", &user.email));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(StoreError::duplicate("_id", &user.id));
        }
        Self::check_email(&users, user)?;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().values().find(|u| u.email == email).cloned())
    }

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        let users = self.users.read();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn replace(&self, user: &User) -> StoreResult<bool> {
        let mut users = self.users.write();
        if !users.contains_key(&user.id) {
            return Ok(false);
        }
        Self::check_email(&users, user)?;
        users.insert(user.id.clone(), user.clone());
        Ok(true)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.users.write().remove(id).is_some())
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<User>, u64)> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut matches: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| filter.role.map_or(true, |r| u.role == r))
            .filter(|u| filter.is_active.map_or(true, |a| u.is_active == a))
            .filter(|u| {
                needle.as_deref().map_or(true, |n| {
                    u.name.to_lowercase().contains(n) || u.email.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(matches, page))
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.users.read().len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryCategoryStore {
    categories: RwLock<HashMap<String, Category>>,
}

impl MemoryCategoryStore {
    fn check_unique(categories: &HashMap<String, Category>, category: &Category) -> StoreResult<()> {
        for other in categories.values().filter(|c| c.id != category.id) {
            if other.name == category.name {
                return Err(StoreError::duplicate("name", &category.name));
            }
            if other.slug == category.slug {
                return Err(StoreError::duplicate("slug", &category.slug));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn insert(&self, category: &Category) -> StoreResult<()> {
        let mut categories = self.categories.write();
        if categories.contains_key(&category.id) {
            return Err(StoreError::duplicate("_id", &category.id));
        }
        Self::check_unique(&categories, category)?;
        categories.insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Category>> {
        Ok(self.categories.read().get(id).cloned())
    }

    async fn find_by_slug(&self, slug: &str, active_only: bool) -> StoreResult<Option<Category>> {
        Ok(self
            .categories
            .read()
            .values()
            .find(|c| c.slug == slug && (!active_only || c.is_active))
            .cloned())
    }

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<Category>> {
        let categories = self.categories.read();
        Ok(ids.iter().filter_map(|id| categories.get(id).cloned()).collect())
    }

    async fn find_conflicting(
        &self,
        name: &str,
        slug: &str,
        exclude: Option<&str>,
    ) -> StoreResult<Option<Category>> {
        Ok(self
            .categories
            .read()
            .values()
            .filter(|c| exclude != Some(c.id.as_str()))
            .find(|c| c.name == name || c.slug == slug)
            .cloned())
    }

    async fn list(&self, active_only: bool) -> StoreResult<Vec<Category>> {
        let mut out: Vec<Category> = self
            .categories
            .read()
            .values()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn replace(&self, category: &Category) -> StoreResult<bool> {
        let mut categories = self.categories.write();
        if !categories.contains_key(&category.id) {
            return Ok(false);
        }
        Self::check_unique(&categories, category)?;
        categories.insert(category.id.clone(), category.clone());
        Ok(true)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.categories.write().remove(id).is_some())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.categories.read().len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<HashMap<String, Product>>,
}

impl MemoryProductStore {
    fn check_unique(products: &HashMap<String, Product>, product: &Product) -> StoreResult<()> {
        for other in products.values().filter(|p| p.id != product.id) {
            if other.sku == product.sku {
                return Err(StoreError::duplicate("sku", &product.sku));
            }
            if other.slug == product.slug {
                return Err(StoreError::duplicate("slug", &product.slug));
            }
        }
        Ok(())
    }

    fn matches(product: &Product, filter: &ProductFilter) -> bool {
        (!filter.active_only || product.is_active)
            && filter.category.as_deref().map_or(true, |c| product.category == c)
            && filter.min_price.map_or(true, |min| product.price >= min)
            && filter.max_price.map_or(true, |max| product.price <= max)
            && filter.featured.map_or(true, |f| product.is_featured == f)
    }
}

/// Lowercased words of `text` with a trailing plural `s` dropped, so `lamps`
/// and `lamp` meet the way they do under the MongoDB text index.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut w = w.to_lowercase();
            let plural = w.ends_with('s') && !w.ends_with("ss") && w.chars().count() > 3;
            if plural {
                w.pop();
            }
            w
        })
}

/// Number of whole-word occurrences of the search terms in name, description
/// and tags. Zero means no match.
fn text_score(product: &Product, terms: &[String]) -> usize {
    let haystack: Vec<String> = words(&product.name)
        .chain(words(&product.description))
        .chain(product.tags.iter().flat_map(|t| words(t)))
        .collect();
    terms
        .iter()
        .map(|term| haystack.iter().filter(|w| *w == term).count())
        .sum()
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        let mut products = self.products.write();
        if products.contains_key(&product.id) {
            return Err(StoreError::duplicate("_id", &product.id));
        }
        Self::check_unique(&products, product)?;
        products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products.read().get(id).cloned())
    }

    async fn find_by_slug(&self, slug: &str, active_only: bool) -> StoreResult<Option<Product>> {
        Ok(self
            .products
            .read()
            .values()
            .find(|p| p.slug == slug && (!active_only || p.is_active))
            .cloned())
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<&str>) -> StoreResult<bool> {
        Ok(self
            .products
            .read()
            .values()
            .any(|p| p.slug == slug && exclude != Some(p.id.as_str())))
    }

    async fn replace_versioned(&self, product: &Product, expected_version: i64) -> StoreResult<bool> {
        let mut products = self.products.write();
        match products.get(&product.id) {
            Some(current) if current.version == expected_version => {}
            _ => return Ok(false),
        }
        Self::check_unique(&products, product)?;
        products.insert(product.id.clone(), product.clone());
        Ok(true)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.products.write().remove(id).is_some())
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> StoreResult<(Vec<Product>, u64)> {
        let terms: Vec<String> = filter
            .search
            .as_deref()
            .map(|s| words(s).collect())
            .unwrap_or_default();

        let mut scored: Vec<(usize, Product)> = self
            .products
            .read()
            .values()
            .filter(|p| Self::matches(p, filter))
            .filter_map(|p| {
                if terms.is_empty() {
                    return Some((0, p.clone()));
                }
                match text_score(p, &terms) {
                    0 => None,
                    score => Some((score, p.clone())),
                }
            })
            .collect();

        match sort {
            ProductSort::Newest => scored.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at)),
            ProductSort::TopRated => scored.sort_by(|a, b| {
                b.1.average_rating
                    .total_cmp(&a.1.average_rating)
                    .then_with(|| b.1.created_at.cmp(&a.1.created_at))
            }),
            ProductSort::Relevance => scored.sort_by(|a, b| {
                b.0.cmp(&a.0)
                    .then_with(|| b.1.created_at.cmp(&a.1.created_at))
            }),
        }

        Ok(paginate(scored.into_iter().map(|(_, p)| p).collect(), page))
    }

    async fn count_by_category(&self, category_id: &str, active_only: bool) -> StoreResult<u64> {
        Ok(self
            .products
            .read()
            .values()
            .filter(|p| p.category == category_id && (!active_only || p.is_active))
            .count() as u64)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.products.read().len() as u64)
    }
}
