use std::sync::Arc;

use crate::gate::Gate;
use crate::services::{AdminService, AuthService, CategoryService, ProductService, UserService};
use crate::store::Stores;
use crate::token::TokenIssuer;

/// Everything a handler can reach, built once and shared via `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(stores: Stores, tokens: TokenIssuer) -> Self {
        let tokens = Arc::new(tokens);
        let users = Arc::new(UserService::new(stores.users.clone()));
        let products = Arc::new(ProductService::new(
            stores.products.clone(),
            stores.categories.clone(),
            stores.users.clone(),
        ));
        AppState {
            gate: Arc::new(Gate::new(tokens.clone(), stores.users.clone())),
            auth: Arc::new(AuthService::new(stores.users.clone(), tokens)),
            categories: Arc::new(CategoryService::new(
                stores.categories.clone(),
                stores.products.clone(),
            )),
            admin: Arc::new(AdminService::new(stores, products.clone(), users.clone())),
            users,
            products,
        }
    }
}
