use actix_web::{web, HttpResponse};

use crate::error::ApiResult;
use crate::models::{PageQuery, ProductInput, ProductPatch, UserQuery};
use crate::response::{self, PageRequest};
use crate::state::AppState;
use crate::validate::Validate;

pub async fn stats(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.admin.stats().await?))
}

pub async fn recent_products(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.admin.recent_products().await?))
}

pub async fn recent_users(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.admin.recent_users().await?))
}

pub async fn users(state: web::Data<AppState>, query: web::Query<PageQuery>) -> ApiResult<HttpResponse> {
    let query = UserQuery {
        page: query.page,
        limit: query.limit,
        ..UserQuery::default()
    };
    let page = state.users.list(query).await?;
    Ok(response::ok(page.into_json("users")))
}

pub async fn products(state: web::Data<AppState>, query: web::Query<PageQuery>) -> ApiResult<HttpResponse> {
    let page = state
        .products
        .list_all(PageRequest::new(query.page, query.limit))
        .await?;
    Ok(response::ok(page.into_json("products")))
}

pub async fn create_product(state: web::Data<AppState>, body: web::Json<ProductInput>) -> ApiResult<HttpResponse> {
    body.validate()?;
    let product = state.products.create(body.into_inner()).await?;
    Ok(response::created("Product created successfully", product))
}

pub async fn get_product(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.products.get(&id).await?))
}

pub async fn update_product(
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<ProductPatch>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let product = state.products.update(&id, body.into_inner()).await?;
    Ok(response::ok_with_message("Product updated successfully", product))
}

pub async fn delete_product(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    state.products.delete(&id).await?;
    Ok(response::message("Product deleted successfully"))
}
