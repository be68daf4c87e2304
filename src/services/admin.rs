use std::sync::Arc;

use crate::error::ApiResult;
use crate::models::{DashboardStats, ProductSummary, UserView};
use crate::store::Stores;

use super::{ProductService, UserService};

pub const RECENT_LIMIT: u64 = 5;

/// Dashboard aggregates. Orders do not exist in this system, so revenue and
/// order totals are always zero.
pub struct AdminService {
    stores: Stores,
    products: Arc<ProductService>,
    users: Arc<UserService>,
}

impl AdminService {
    pub fn new(stores: Stores, products: Arc<ProductService>, users: Arc<UserService>) -> Self {
        AdminService {
            stores,
            products,
            users,
        }
    }

    pub async fn stats(&self) -> ApiResult<DashboardStats> {
        Ok(DashboardStats {
            total_users: self.stores.users.count().await?,
            total_products: self.stores.products.count().await?,
            total_categories: self.stores.categories.count().await?,
            total_revenue: 0.0,
            total_orders: 0,
        })
    }

    pub async fn recent_products(&self) -> ApiResult<Vec<ProductSummary>> {
        self.products.recent(RECENT_LIMIT).await
    }

    pub async fn recent_users(&self) -> ApiResult<Vec<UserView>> {
        self.users.recent(RECENT_LIMIT).await
    }
}
