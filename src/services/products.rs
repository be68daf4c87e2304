use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    dedup_tags, CategoryRef, Product, ProductInput, ProductPatch, ProductQuery, ProductSummary,
    ProductView, RatingInput,
};
use crate::response::{Page, PageRequest, Pagination};
use crate::slug::{candidate, slugify};
use crate::store::{CategoryStore, ProductFilter, ProductSort, ProductStore, StoreError, UserStore};

use super::new_id;

pub const DEFAULT_FEATURED_LIMIT: u64 = 8;

/// How many times a create re-resolves its slug after losing a race on the
/// unique slug index.
const SLUG_ATTEMPTS: usize = 3;

/// Slug used when a name has no `[a-z0-9]` characters at all.
const FALLBACK_SLUG: &str = "product";

/// `SKU-<unix millis>-<0..1000>`. Best effort, the unique index has the last word.
pub fn generate_sku() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("SKU-{}-{}", millis, suffix)
}

pub struct ProductService {
    products: Arc<dyn ProductStore>,
    categories: Arc<dyn CategoryStore>,
    users: Arc<dyn UserStore>,
}

impl ProductService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        categories: Arc<dyn CategoryStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        ProductService {
            products,
            categories,
            users,
        }
    }

    async fn load(&self, id: &str) -> ApiResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or(ApiError::ProductNotFound)
    }

    async fn require_category(&self, id: &str) -> ApiResult<CategoryRef> {
        match self.categories.find_by_id(id).await? {
            Some(category) => Ok(CategoryRef::from(&category)),
            None => Err(ApiError::InvalidCategory),
        }
    }

    /// Lowest free slug for `name`: the bare slug, else the first free `-N`.
    pub async fn unique_slug(&self, name: &str, exclude: Option<&str>) -> ApiResult<String> {
        let mut base = slugify(name);
        if base.is_empty() {
            base = FALLBACK_SLUG.to_string();
        }
        let mut attempt = 0;
        loop {
            let slug = candidate(&base, attempt);
            if !self.products.slug_taken(&slug, exclude).await? {
                return Ok(slug);
            }
            attempt += 1;
        }
    }

    /// Persists `product` on top of `expected_version`.
    async fn save(&self, product: &mut Product, expected_version: i64) -> ApiResult<()> {
        product.version = expected_version + 1;
        product.updated_at = Utc::now();
        match self.products.replace_versioned(product, expected_version).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                if self.products.find_by_id(&product.id).await?.is_none() {
                    Err(ApiError::ProductNotFound)
                } else {
                    log::warn!("lost write race on product {}", product.id);
                    Err(ApiError::Conflict)
                }
            }
            Err(StoreError::Duplicate { ref field, .. }) if field == "slug" => Err(ApiError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn populate(&self, products: Vec<Product>) -> ApiResult<Vec<ProductView>> {
        let ids: Vec<String> = products
            .iter()
            .map(|p| p.category.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let categories: HashMap<String, CategoryRef> = self
            .categories
            .find_many(&ids)
            .await?
            .iter()
            .map(|c| (c.id.clone(), CategoryRef::from(c)))
            .collect();

        Ok(products
            .into_iter()
            .map(|p| {
                let category = categories.get(&p.category).cloned();
                ProductView::new(p, category, |_| None)
            })
            .collect())
    }

    /// Category plus the name of every rating's author.
    async fn populate_full(&self, product: Product) -> ApiResult<ProductView> {
        let category = self
            .categories
            .find_by_id(&product.category)
            .await?
            .map(|c| CategoryRef::from(&c));
        let author_ids: Vec<String> = product.ratings.iter().map(|r| r.user.clone()).collect();
        let authors: HashMap<String, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            self.users
                .find_many(&author_ids)
                .await?
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect()
        };
        Ok(ProductView::new(product, category, |id| authors.get(id).cloned()))
    }

    async fn page(
        &self,
        filter: ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> ApiResult<Page<ProductView>> {
        let (products, total) = self.products.list(&filter, sort, page).await?;
        Ok(Page {
            items: self.populate(products).await?,
            pagination: Pagination::new(page, total),
        })
    }

    /// Public listing: active products, newest first.
    pub async fn list(&self, query: ProductQuery) -> ApiResult<Page<ProductView>> {
        let filter = ProductFilter {
            active_only: true,
            category: query.category.filter(|c| !c.is_empty()),
            min_price: query.min_price,
            max_price: query.max_price,
            featured: query.is_featured,
            search: query.search.filter(|s| !s.trim().is_empty()),
        };
        self.page(filter, ProductSort::Newest, PageRequest::new(query.page, query.limit))
            .await
    }

    /// Every product, inactive ones included.
    pub async fn list_all(&self, page: PageRequest) -> ApiResult<Page<ProductView>> {
        self.page(ProductFilter::default(), ProductSort::Newest, page).await
    }

    pub async fn featured(&self, limit: Option<u64>) -> ApiResult<Vec<ProductView>> {
        let filter = ProductFilter {
            active_only: true,
            featured: Some(true),
            ..ProductFilter::default()
        };
        let page = PageRequest::first(limit.unwrap_or(DEFAULT_FEATURED_LIMIT));
        Ok(self.page(filter, ProductSort::TopRated, page).await?.items)
    }

    pub async fn by_category(&self, category_id: &str, page: PageRequest) -> ApiResult<Page<ProductView>> {
        let filter = ProductFilter {
            active_only: true,
            category: Some(category_id.to_string()),
            ..ProductFilter::default()
        };
        self.page(filter, ProductSort::Newest, page).await
    }

    /// Text search ranked by relevance.
    pub async fn search(&self, term: &str, page: PageRequest) -> ApiResult<Page<ProductView>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ApiError::validation("Search term is required"));
        }
        let filter = ProductFilter {
            active_only: true,
            search: Some(term.to_string()),
            ..ProductFilter::default()
        };
        self.page(filter, ProductSort::Relevance, page).await
    }

    pub async fn recent(&self, limit: u64) -> ApiResult<Vec<ProductSummary>> {
        let (products, _) = self
            .products
            .list(&ProductFilter::default(), ProductSort::Newest, PageRequest::first(limit))
            .await?;
        Ok(self
            .populate(products)
            .await?
            .into_iter()
            .map(|p| ProductSummary {
                id: p.id,
                name: p.name,
                price: p.price,
                stock: p.stock,
                category: p.category,
                images: p.images,
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> ApiResult<ProductView> {
        let product = self.load(id).await?;
        self.populate_full(product).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> ApiResult<ProductView> {
        let product = self
            .products
            .find_by_slug(slug, true)
            .await?
            .ok_or(ApiError::ProductNotFound)?;
        self.populate_full(product).await
    }

    pub async fn create(&self, input: ProductInput) -> ApiResult<ProductView> {
        let category = self.require_category(&input.category).await?;
        let now = Utc::now();
        let name = input.name.trim().to_string();
        let sku = input
            .sku
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(generate_sku);

        let mut product = Product {
            id: new_id(),
            slug: String::new(),
            description: input.description.trim().to_string(),
            price: input.price,
            compare_price: input.compare_price,
            category: input.category,
            images: input.images,
            stock: input.stock,
            sku,
            is_active: input.is_active.unwrap_or(true),
            is_featured: input.is_featured.unwrap_or(false),
            weight: input.weight,
            dimensions: input.dimensions,
            tags: dedup_tags(input.tags),
            ratings: Vec::new(),
            average_rating: 0.0,
            total_ratings: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            name,
        };

        for _ in 0..SLUG_ATTEMPTS {
            product.slug = self.unique_slug(&product.name, None).await?;
            match self.products.insert(&product).await {
                Ok(()) => {
                    log::info!("created product {} ({})", product.id, product.slug);
                    return Ok(ProductView::new(product, Some(category), |_| None));
                }
                Err(StoreError::Duplicate { ref field, .. }) if field == "slug" => {
                    log::debug!("slug {} taken concurrently, resolving again", product.slug);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ApiError::Conflict)
    }

    pub async fn update(&self, id: &str, patch: ProductPatch) -> ApiResult<ProductView> {
        let mut product = self.load(id).await?;
        let expected = product.version;

        if let Some(category) = patch.category {
            self.require_category(&category).await?;
            product.category = category;
        }
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name != product.name {
                product.slug = self.unique_slug(&name, Some(id)).await?;
                product.name = name;
            }
        }
        if let Some(description) = patch.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(compare_price) = patch.compare_price {
            product.compare_price = Some(compare_price);
        }
        if let Some(images) = patch.images {
            product.images = images;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(sku) = patch.sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            product.sku = sku;
        }
        if let Some(active) = patch.is_active {
            product.is_active = active;
        }
        if let Some(featured) = patch.is_featured {
            product.is_featured = featured;
        }
        if let Some(weight) = patch.weight {
            product.weight = Some(weight);
        }
        if let Some(dimensions) = patch.dimensions {
            product.dimensions = Some(dimensions);
        }
        if let Some(tags) = patch.tags {
            product.set_tags(tags);
        }

        self.save(&mut product, expected).await?;
        log::info!("updated product {}", product.id);
        self.populate_full(product).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        if !self.products.delete(id).await? {
            return Err(ApiError::ProductNotFound);
        }
        log::info!("deleted product {}", id);
        Ok(())
    }

    pub async fn add_rating(&self, product_id: &str, user_id: &str, input: RatingInput) -> ApiResult<ProductView> {
        let mut product = self.load(product_id).await?;
        let expected = product.version;
        product.add_rating(user_id, input.rating, input.review, Utc::now())?;
        self.save(&mut product, expected).await?;
        self.populate_full(product).await
    }

    pub async fn update_rating(&self, product_id: &str, user_id: &str, input: RatingInput) -> ApiResult<ProductView> {
        let mut product = self.load(product_id).await?;
        let expected = product.version;
        product.update_rating(user_id, input.rating, input.review, Utc::now())?;
        self.save(&mut product, expected).await?;
        self.populate_full(product).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::store::memory::{MemoryCategoryStore, MemoryProductStore, MemoryUserStore};

    struct Fixture {
        service: ProductService,
        categories: Arc<MemoryCategoryStore>,
        products: Arc<MemoryProductStore>,
    }

    async fn fixture() -> Fixture {
        let categories = Arc::new(MemoryCategoryStore::default());
        let products = Arc::new(MemoryProductStore::default());
        let now = Utc::now();
        categories
            .insert(&Category {
                id: "shoes".into(),
                name: "Shoes".into(),
                description: None,
                slug: "shoes".into(),
                is_active: true,
                image: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let service = ProductService::new(
            products.clone(),
            categories.clone(),
            Arc::new(MemoryUserStore::default()),
        );
        Fixture {
            service,
            categories,
            products,
        }
    }

    fn input(name: &str) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: "Comfortable".into(),
            price: 49.5,
            compare_price: None,
            category: "shoes".into(),
            images: vec![],
            stock: 5,
            sku: None,
            is_active: None,
            is_featured: None,
            weight: None,
            dimensions: None,
            tags: vec![],
        }
    }

    fn rating(value: i32) -> RatingInput {
        RatingInput {
            rating: value,
            review: None,
        }
    }

    #[actix_web::test]
    async fn colliding_names_get_numbered_slugs() {
        let f = fixture().await;
        let a = f.service.create(input("Nice Shoes!")).await.unwrap();
        let b = f.service.create(input("nice_shoes")).await.unwrap();
        let c = f.service.create(input("NICE shoes")).await.unwrap();
        assert_eq!(a.slug, "nice-shoes");
        assert_eq!(b.slug, "nice-shoes-1");
        assert_eq!(c.slug, "nice-shoes-2");

        assert_eq!(f.service.get_by_slug("nice-shoes").await.unwrap().id, a.id);
        assert_eq!(f.service.get_by_slug("nice-shoes-1").await.unwrap().id, b.id);
    }

    #[actix_web::test]
    async fn lowest_free_suffix_is_reused() {
        let f = fixture().await;
        f.service.create(input("Boot")).await.unwrap();
        let second = f.service.create(input("Boot")).await.unwrap();
        f.service.create(input("Boot")).await.unwrap();
        f.service.delete(&second.id).await.unwrap();
        assert_eq!(f.service.create(input("Boot")).await.unwrap().slug, "boot-1");
    }

    #[actix_web::test]
    async fn rename_recomputes_slug_without_colliding_with_itself() {
        let f = fixture().await;
        let a = f.service.create(input("Runner")).await.unwrap();
        f.service.create(input("Trail Runner")).await.unwrap();

        let patch = ProductPatch {
            name: Some("Trail Runner".into()),
            ..ProductPatch::default()
        };
        let renamed = f.service.update(&a.id, patch).await.unwrap();
        assert_eq!(renamed.slug, "trail-runner-1");

        let patch = ProductPatch {
            name: Some("Trail Runner".into()),
            price: Some(10.0),
            ..ProductPatch::default()
        };
        assert_eq!(f.service.update(&a.id, patch).await.unwrap().slug, "trail-runner-1");
    }

    #[actix_web::test]
    async fn unknown_category_is_rejected() {
        let f = fixture().await;
        let mut bad = input("Hat");
        bad.category = "nope".into();
        assert!(matches!(f.service.create(bad).await, Err(ApiError::InvalidCategory)));

        let hat = f.service.create(input("Hat")).await.unwrap();
        let patch = ProductPatch {
            category: Some("nope".into()),
            ..ProductPatch::default()
        };
        assert!(matches!(f.service.update(&hat.id, patch).await, Err(ApiError::InvalidCategory)));
    }

    #[actix_web::test]
    async fn sku_is_generated_or_checked() {
        let f = fixture().await;
        let generated = f.service.create(input("Sock")).await.unwrap();
        assert!(generated.sku.starts_with("SKU-"));

        let mut first = input("Sandal");
        first.sku = Some("SAN-1".into());
        f.service.create(first).await.unwrap();
        let mut second = input("Slipper");
        second.sku = Some("SAN-1".into());
        match f.service.create(second).await {
            Err(ApiError::DuplicateSku(value)) => assert_eq!(value, "SAN-1"),
            other => panic!("expected DuplicateSku, got {:?}", other.map(|p| p.id)),
        }
    }

    #[actix_web::test]
    async fn ratings_keep_aggregates_in_sync() {
        let f = fixture().await;
        let p = f.service.create(input("Loafer")).await.unwrap();

        let view = f.service.add_rating(&p.id, "u1", rating(4)).await.unwrap();
        assert_eq!(view.total_ratings, 1);
        let view = f.service.add_rating(&p.id, "u2", rating(1)).await.unwrap();
        assert_eq!(view.total_ratings, 2);
        assert!((view.average_rating - 2.5).abs() < f64::EPSILON);

        assert!(matches!(
            f.service.add_rating(&p.id, "u1", rating(5)).await,
            Err(ApiError::AlreadyRated)
        ));
        let view = f.service.update_rating(&p.id, "u1", rating(5)).await.unwrap();
        assert_eq!(view.ratings.len(), 2);
        assert!((view.average_rating - 3.0).abs() < f64::EPSILON);

        assert!(matches!(
            f.service.update_rating(&p.id, "u3", rating(2)).await,
            Err(ApiError::RatingNotFound)
        ));
        assert!(matches!(
            f.service.add_rating("missing", "u1", rating(2)).await,
            Err(ApiError::ProductNotFound)
        ));
    }

    #[actix_web::test]
    async fn stale_writes_surface_as_conflict() {
        let f = fixture().await;
        let p = f.service.create(input("Clog")).await.unwrap();
        let mut stale = f.products.find_by_id(&p.id).await.unwrap().unwrap();

        f.service.add_rating(&p.id, "u1", rating(3)).await.unwrap();

        // a writer that read before the rating landed
        stale.add_rating("u1", 5, None, Utc::now()).unwrap();
        let expected = stale.version;
        assert!(matches!(
            f.service.save(&mut stale, expected).await,
            Err(ApiError::Conflict)
        ));
        let stored = f.products.find_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stored.ratings.len(), 1);
        assert_eq!(stored.ratings[0].rating, 3);
    }

    #[actix_web::test]
    async fn listings_filter_and_populate() {
        let f = fixture().await;
        let mut cheap = input("Flip Flop");
        cheap.price = 5.0;
        f.service.create(cheap).await.unwrap();
        let mut hidden = input("Old Boot");
        hidden.is_active = Some(false);
        f.service.create(hidden).await.unwrap();
        let mut featured = input("Gold Sneaker");
        featured.price = 500.0;
        featured.is_featured = Some(true);
        f.service.create(featured).await.unwrap();

        let page = f
            .service
            .list(ProductQuery {
                min_price: Some(10.0),
                ..ProductQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].name, "Gold Sneaker");
        assert_eq!(page.items[0].category.as_ref().unwrap().slug, "shoes");

        let all = f.service.list_all(PageRequest::default()).await.unwrap();
        assert_eq!(all.pagination.total, 3);

        let featured = f.service.featured(None).await.unwrap();
        assert_eq!(featured.len(), 1);

        assert!(matches!(
            f.service.search("   ", PageRequest::default()).await,
            Err(ApiError::Validation(_))
        ));
        let found = f.service.search("flip", PageRequest::default()).await.unwrap();
        assert_eq!(found.items.len(), 1);
        assert_eq!(f.categories.count().await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn unnameable_products_still_get_a_slug() {
        let f = fixture().await;
        assert_eq!(f.service.create(input("!!!")).await.unwrap().slug, "product");
        assert_eq!(f.service.create(input("???")).await.unwrap().slug, "product-1");
    }
}
