use actix_web::{web, HttpResponse};

use crate::error::ApiResult;
use crate::models::{CategoryInput, CategoryPatch};
use crate::response;
use crate::state::AppState;
use crate::validate::Validate;

pub async fn list(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.categories.list().await?))
}

pub async fn with_count(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.categories.list_with_counts().await?))
}

pub async fn by_slug(state: web::Data<AppState>, slug: web::Path<String>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.categories.get_by_slug(&slug).await?))
}

pub async fn get(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.categories.get(&id).await?))
}

pub async fn create(state: web::Data<AppState>, body: web::Json<CategoryInput>) -> ApiResult<HttpResponse> {
    body.validate()?;
    let category = state.categories.create(body.into_inner()).await?;
    Ok(response::created("Category created successfully", category))
}

pub async fn update(
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<CategoryPatch>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let category = state.categories.update(&id, body.into_inner()).await?;
    Ok(response::ok_with_message("Category updated successfully", category))
}

pub async fn delete(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    state.categories.delete(&id).await?;
    Ok(response::message("Category deleted successfully"))
}
