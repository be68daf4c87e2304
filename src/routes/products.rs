use actix_web::{web, HttpResponse};

use crate::error::ApiResult;
use crate::models::{
    AuthUser, LimitQuery, PageQuery, ProductInput, ProductPatch, ProductQuery, RatingInput,
    SearchQuery,
};
use crate::response::{self, PageRequest};
use crate::state::AppState;
use crate::validate::Validate;

pub async fn list(state: web::Data<AppState>, query: web::Query<ProductQuery>) -> ApiResult<HttpResponse> {
    let page = state.products.list(query.into_inner()).await?;
    Ok(response::ok(page.into_json("products")))
}

pub async fn featured(state: web::Data<AppState>, query: web::Query<LimitQuery>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.products.featured(query.limit).await?))
}

pub async fn search(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> ApiResult<HttpResponse> {
    let term = query.q.clone().unwrap_or_default();
    let page = state
        .products
        .search(&term, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(response::ok(page.into_json("products")))
}

pub async fn by_category(
    state: web::Data<AppState>,
    category_id: web::Path<String>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = state
        .products
        .by_category(&category_id, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(response::ok(page.into_json("products")))
}

pub async fn by_slug(state: web::Data<AppState>, slug: web::Path<String>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.products.get_by_slug(&slug).await?))
}

pub async fn get(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.products.get(&id).await?))
}

pub async fn create(state: web::Data<AppState>, body: web::Json<ProductInput>) -> ApiResult<HttpResponse> {
    body.validate()?;
    let product = state.products.create(body.into_inner()).await?;
    Ok(response::created("Product created successfully", product))
}

pub async fn update(
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<ProductPatch>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let product = state.products.update(&id, body.into_inner()).await?;
    Ok(response::ok_with_message("Product updated successfully", product))
}

pub async fn delete(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    state.products.delete(&id).await?;
    Ok(response::message("Product deleted successfully"))
}

pub async fn add_rating(
    state: web::Data<AppState>,
    id: web::Path<String>,
    user: web::ReqData<AuthUser>,
    body: web::Json<RatingInput>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let product = state.products.add_rating(&id, &user.id, body.into_inner()).await?;
    Ok(response::ok_with_message("Rating added successfully", product))
}

pub async fn update_rating(
    state: web::Data<AppState>,
    id: web::Path<String>,
    user: web::ReqData<AuthUser>,
    body: web::Json<RatingInput>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let product = state.products.update_rating(&id, &user.id, body.into_inner()).await?;
    Ok(response::ok_with_message("Rating updated successfully", product))
}
