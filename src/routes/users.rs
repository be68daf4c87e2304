use actix_web::{web, HttpResponse};

use crate::error::ApiResult;
use crate::models::{RoleInput, UserPatch, UserQuery};
use crate::response;
use crate::state::AppState;
use crate::validate::Validate;

pub async fn list(state: web::Data<AppState>, query: web::Query<UserQuery>) -> ApiResult<HttpResponse> {
    let page = state.users.list(query.into_inner()).await?;
    Ok(response::ok(page.into_json("users")))
}

pub async fn get(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    Ok(response::ok(state.users.get(&id).await?))
}

pub async fn update(
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<UserPatch>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let view = state.users.update(&id, body.into_inner()).await?;
    Ok(response::ok_with_message("User updated successfully", view))
}

pub async fn delete(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    state.users.delete(&id).await?;
    Ok(response::message("User deleted successfully"))
}

pub async fn deactivate(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let view = state.users.set_active(&id, false).await?;
    Ok(response::ok_with_message("User deactivated successfully", view))
}

pub async fn activate(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let view = state.users.set_active(&id, true).await?;
    Ok(response::ok_with_message("User activated successfully", view))
}

pub async fn change_role(
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<RoleInput>,
) -> ApiResult<HttpResponse> {
    let view = state.users.change_role(&id, &body.role).await?;
    Ok(response::ok_with_message("User role updated successfully", view))
}
