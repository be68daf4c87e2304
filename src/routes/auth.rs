use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::{ApiError, ApiResult};
use crate::models::{AuthUser, ChangePasswordInput, LoginInput, ProfilePatch, RegisterInput, Role};
use crate::response;
use crate::state::AppState;
use crate::validate::Validate;

use super::auth_header;

/// Public sign-up. Asking for `admin` needs an admin's bearer token.
pub async fn register(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<RegisterInput>,
) -> ApiResult<HttpResponse> {
    let input = body.into_inner();
    input.validate()?;

    let role = match input.role.as_deref() {
        Some(role) => role.parse::<Role>()?,
        None => Role::User,
    };
    if role == Role::Admin {
        state
            .gate
            .check(auth_header(&req), Role::ADMIN_ONLY)
            .await
            .map_err(|_| {
                log::warn!("refused self-registration with admin role");
                ApiError::Forbidden
            })?;
    }

    let result = state.auth.register(input, role).await?;
    Ok(response::created("User registered successfully", result))
}

pub async fn login(state: web::Data<AppState>, body: web::Json<LoginInput>) -> ApiResult<HttpResponse> {
    body.validate()?;
    let result = state.auth.login(&body.email, &body.password).await?;
    Ok(response::ok_with_message("Login successful", result))
}

pub async fn profile(state: web::Data<AppState>, user: web::ReqData<AuthUser>) -> ApiResult<HttpResponse> {
    let view = state.auth.profile(&user.id).await?;
    Ok(response::ok(view))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
    body: web::Json<ProfilePatch>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let view = state.auth.update_profile(&user.id, body.into_inner()).await?;
    Ok(response::ok_with_message("Profile updated successfully", view))
}

pub async fn change_password(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
    body: web::Json<ChangePasswordInput>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    state
        .auth
        .change_password(&user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(response::message("Password updated successfully"))
}
